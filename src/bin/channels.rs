//! 列出工作区的公开频道（名称 + ID）及分页游标，用于查找频道 ID。
//!
//! 只需要 SLACK_BOT_TOKEN；API 地址沿用机器人配置。

use dadbot::config::{load_config, BOT_TOKEN_VAR};
use dadbot::integrations::slack::SlackWebClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let token = match std::env::var(BOT_TOKEN_VAR) {
        Ok(token) if !token.is_empty() => token,
        _ => {
            println!("{BOT_TOKEN_VAR}=None");
            std::process::exit(1);
        }
    };

    let config = load_config()?;
    let client = SlackWebClient::new(&token, &config.slack)?;

    match client.list_channels(&["public_channel"]).await {
        Ok(page) => {
            for channel in &page.channels {
                println!("Channel Name: {}, Channel ID: {}", channel.name, channel.id);
            }
            println!("Cursor: {}", page.next_cursor.unwrap_or_default());
        }
        Err(e) => println!("Error listing channels: {e}"),
    }

    Ok(())
}
