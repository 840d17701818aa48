//! 关闭信号处理
//!
//! Ctrl+C / SIGTERM 触发取消 token；Socket Mode 连接与事件循环随之退出。
//! 不做在途请求的排空：正在执行的外部调用直接随任务丢弃。

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// 安装系统信号处理器 (Ctrl+C, SIGTERM)，收到任一信号即取消 `token`
pub fn install_signal_handlers(token: &CancellationToken) {
    let on_ctrl_c = token.clone();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            tracing::info!("Received Ctrl+C, shutting down");
            on_ctrl_c.cancel();
        }
    });

    #[cfg(unix)]
    {
        let on_sigterm = token.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM, shutting down");
                on_sigterm.cancel();
            }
        });
    }
}

/// 运行主应用直到其自行结束或 `token` 被取消
///
/// 取消时 app future 被直接丢弃，返回 `None`；否则返回 app 的输出。
pub async fn run_with_graceful_shutdown<F, T>(token: CancellationToken, app: F) -> Option<T>
where
    F: Future<Output = T>,
{
    install_signal_handlers(&token);

    tokio::select! {
        out = app => {
            tracing::info!("Bot finished");
            Some(out)
        }
        _ = token.cancelled() => {
            tracing::info!("Shutdown signal received, stopping event loop");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_finishing_returns_output() {
        let out = run_with_graceful_shutdown(CancellationToken::new(), async { 42 }).await;
        assert_eq!(out, Some(42));
    }

    #[tokio::test]
    async fn test_cancelled_token_drops_app() {
        let token = CancellationToken::new();
        token.cancel();
        let out = run_with_graceful_shutdown(token, std::future::pending::<()>()).await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_cancel_while_running() {
        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                token.cancel();
            }
        };
        let (out, _) = tokio::join!(
            run_with_graceful_shutdown(token.clone(), std::future::pending::<()>()),
            canceller
        );
        assert!(out.is_none());
        assert!(token.is_cancelled());
    }
}
