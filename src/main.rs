//! Dadbot 入口：初始化日志、读取凭据与配置、连接 Slack 并运行到收到关闭信号。

use anyhow::Context;
use dadbot::bot::BotBuilder;
use dadbot::config::{load_config, Credentials};
use dadbot::core::run_with_graceful_shutdown;
use dadbot::observability;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let credentials = Credentials::from_env().context("Missing or malformed Slack/OpenAI credentials")?;
    let config = load_config().context("Failed to load config")?;

    let bot = BotBuilder::new(config, credentials)
        .build()
        .context("Failed to build bot")?;

    let shutdown = CancellationToken::new();
    match run_with_graceful_shutdown(shutdown.clone(), bot.run(shutdown)).await {
        Some(Err(e)) => Err(e).context("Slack connection lost"),
        _ => Ok(()),
    }
}
