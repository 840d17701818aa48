//! Socket Mode 连接
//!
//! 1. 用 app token 调 `apps.connections.open` 拿到 wss 地址
//! 2. 建立 WebSocket，读文本帧 → 解码为 [`Event`] → 送入事件队列
//! 3. 事件循环产生的应答帧经 [`SocketAcker`] 回到这里写出
//! 4. 断线后按线性退避重连，连续失败超过上限则返回错误

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event::{recover_ack_token, AckToken, Event, Lifecycle};
use crate::config::SlackSection;
use crate::core::BotError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 退避倍数上限
const MAX_BACKOFF_FACTOR: u32 = 6;

/// 事件应答：信封必须被应答，可选携带响应载荷（斜杠命令的回复即在此）
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self, token: &AckToken, payload: Option<Value>) -> Result<(), BotError>;
}

#[derive(Debug, Serialize)]
struct AckFrame<'a> {
    envelope_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

fn ack_frame(token: &AckToken, payload: Option<Value>) -> Result<String, BotError> {
    Ok(serde_json::to_string(&AckFrame {
        envelope_id: token.as_str(),
        payload,
    })?)
}

/// 把应答帧交给连接任务写出
#[derive(Debug, Clone)]
pub struct SocketAcker {
    tx: mpsc::UnboundedSender<String>,
}

impl SocketAcker {
    /// 创建应答通道：发送端给事件循环，接收端给 [`SocketModeClient::run`]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Acknowledger for SocketAcker {
    async fn ack(&self, token: &AckToken, payload: Option<Value>) -> Result<(), BotError> {
        let frame = ack_frame(token, payload)?;
        self.tx
            .send(frame)
            .map_err(|_| BotError::Transport("socket connection is gone, ack dropped".into()))
    }
}

/// 一次连接的结束方式
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// 收到关闭信号或事件队列已关闭
    Shutdown,
    /// 服务端 disconnect 帧：立即重连，不计失败
    Refresh,
    /// 异常断开：计一次失败后退避重连
    Dropped,
}

/// Socket Mode 客户端
pub struct SocketModeClient {
    http: Client,
    api_base: String,
    app_token: String,
    reconnect_delay: Duration,
    max_reconnect_attempts: u32,
}

impl SocketModeClient {
    pub fn new(app_token: &str, slack: &SlackSection) -> Result<Self, BotError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(slack.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: slack.api_base.trim_end_matches('/').to_string(),
            app_token: app_token.to_string(),
            reconnect_delay: Duration::from_secs(slack.reconnect_delay_secs),
            max_reconnect_attempts: slack.max_reconnect_attempts,
        })
    }

    /// 调 `apps.connections.open` 获取 WebSocket 地址
    async fn open_connection(&self) -> Result<String, BotError> {
        let body: Value = self
            .http
            .post(format!("{}/apps.connections.open", self.api_base))
            .bearer_auth(&self.app_token)
            .send()
            .await?
            .json()
            .await?;

        if body["ok"].as_bool() != Some(true) {
            let err = body["error"].as_str().unwrap_or("unknown");
            return Err(BotError::slack_api("apps.connections.open", err));
        }

        body["url"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| BotError::slack_api("apps.connections.open", "no url in response"))
    }

    /// 线性退避，倍数封顶；超大的配置值饱和而不是溢出
    fn backoff(&self, attempt: u32) -> Duration {
        self.reconnect_delay.saturating_mul(attempt.min(MAX_BACKOFF_FACTOR))
    }

    /// 主循环：连接、收帧、写应答、断线重连
    ///
    /// 正常关闭（取消 token 或事件队列关闭）返回 `Ok(())`。
    pub async fn run(
        &self,
        events: mpsc::Sender<Event>,
        mut acks: mpsc::UnboundedReceiver<String>,
        shutdown: CancellationToken,
    ) -> Result<(), BotError> {
        let mut attempts: u32 = 0;

        loop {
            if attempts > 0 {
                if attempts >= self.max_reconnect_attempts {
                    return Err(BotError::Transport(format!(
                        "exceeded max reconnect attempts ({})",
                        self.max_reconnect_attempts
                    )));
                }
                let delay = self.backoff(attempts);
                info!(
                    attempt = attempts,
                    delay_secs = delay.as_secs(),
                    "Reconnecting to Slack Socket Mode"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.cancelled() => return Ok(()),
                }
            }

            if !emit(&events, Lifecycle::Connecting).await {
                return Ok(());
            }

            let ws_url = match self.open_connection().await {
                Ok(url) => url,
                Err(e) => {
                    emit(&events, Lifecycle::ConnectionError(e.to_string())).await;
                    attempts += 1;
                    continue;
                }
            };

            let ws = match connect_async(ws_url.as_str()).await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    emit(&events, Lifecycle::ConnectionError(e.to_string())).await;
                    attempts += 1;
                    continue;
                }
            };

            attempts = 0;
            if !emit(&events, Lifecycle::Connected).await {
                return Ok(());
            }

            match pump(ws, &events, &mut acks, &shutdown).await {
                SessionEnd::Shutdown => return Ok(()),
                SessionEnd::Refresh => {}
                SessionEnd::Dropped => attempts += 1,
            }
        }
    }
}

/// 发送生命周期通知；队列已关闭时返回 false
async fn emit(events: &mpsc::Sender<Event>, lifecycle: Lifecycle) -> bool {
    events.send(Event::Lifecycle(lifecycle)).await.is_ok()
}

/// 单个连接上的读写循环
async fn pump(
    ws: WsStream,
    events: &mpsc::Sender<Event>,
    acks: &mut mpsc::UnboundedReceiver<String>,
    shutdown: &CancellationToken,
) -> SessionEnd {
    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = write.close().await;
                return SessionEnd::Shutdown;
            }
            Some(frame) = acks.recv() => {
                if let Err(e) = write.send(WsMessage::Text(frame)).await {
                    warn!(error = %e, "Failed to send ack frame");
                    return SessionEnd::Dropped;
                }
            }
            msg = read.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => match Event::decode(&text) {
                    Ok(Event::Lifecycle(Lifecycle::Disconnect { reason })) => {
                        emit(events, Lifecycle::Disconnect { reason }).await;
                        let _ = write.close().await;
                        return SessionEnd::Refresh;
                    }
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            return SessionEnd::Shutdown;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Undecodable Socket Mode frame, skipping");
                        if let Some(token) = recover_ack_token(&text) {
                            if let Ok(frame) = ack_frame(&token, None) {
                                let _ = write.send(WsMessage::Text(frame)).await;
                            }
                        }
                    }
                },
                Some(Ok(WsMessage::Ping(data))) => {
                    let _ = write.send(WsMessage::Pong(data)).await;
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    info!(?frame, "Slack WebSocket closed by server");
                    return SessionEnd::Dropped;
                }
                Some(Ok(_)) => {
                    debug!("Ignoring non-text WebSocket frame");
                }
                Some(Err(e)) => {
                    emit(events, Lifecycle::ConnectionError(e.to_string())).await;
                    return SessionEnd::Dropped;
                }
                None => {
                    info!("Slack WebSocket stream ended");
                    return SessionEnd::Dropped;
                }
            },
        }
    }
}
