//! Slack Web API（REST）
//!
//! 只用到少数几个方法：chat.postMessage、conversations.open、conversations.list、auth.test。
//! Slack 即使出错也返回 200，失败以 `{"ok": false, "error": "..."}` 表示。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::SlackSection;
use crate::core::BotError;

pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// 机器人用到的消息接口
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// 向频道 / 会话发送纯文本消息
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), BotError>;

    /// 打开（或复用）与用户的一对一会话，返回会话 ID
    async fn open_conversation(&self, users: &[&str]) -> Result<String, BotError>;
}

/// auth.test 返回的机器人身份
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub user_id: String,
    #[serde(default)]
    pub team: Option<String>,
}

/// conversations.list 中的一项
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// 一页频道列表及下一页游标
#[derive(Debug, Clone)]
pub struct ChannelPage {
    pub channels: Vec<ChannelSummary>,
    pub next_cursor: Option<String>,
}

/// 基于 reqwest 的 Web API 客户端（bot token 鉴权，带请求超时）
pub struct SlackWebClient {
    http: Client,
    api_base: String,
    bot_token: String,
}

impl SlackWebClient {
    pub fn new(bot_token: &str, slack: &SlackSection) -> Result<Self, BotError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(slack.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: slack.api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    /// POST JSON 并检查 `ok` 字段
    async fn call(&self, method: &'static str, body: Value) -> Result<Value, BotError> {
        let resp: Value = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        check_ok(method, resp)
    }

    /// 校验 bot token 并取得机器人自身的用户 ID
    pub async fn auth_test(&self) -> Result<BotIdentity, BotError> {
        let resp = self.call("auth.test", json!({})).await?;
        Ok(serde_json::from_value(resp)?)
    }

    /// 列出指定类型的频道（单页）
    pub async fn list_channels(&self, types: &[&str]) -> Result<ChannelPage, BotError> {
        let resp: Value = self
            .http
            .get(self.url("conversations.list"))
            .bearer_auth(&self.bot_token)
            .query(&[("types", types.join(","))])
            .send()
            .await?
            .json()
            .await?;
        let resp = check_ok("conversations.list", resp)?;

        let channels: Vec<ChannelSummary> =
            serde_json::from_value(resp.get("channels").cloned().unwrap_or(Value::Array(vec![])))?;
        let next_cursor = resp["response_metadata"]["next_cursor"]
            .as_str()
            .filter(|c| !c.is_empty())
            .map(String::from);

        Ok(ChannelPage {
            channels,
            next_cursor,
        })
    }
}

#[async_trait]
impl SlackApi for SlackWebClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), BotError> {
        self.call(
            "chat.postMessage",
            json!({
                "channel": channel,
                "text": text,
            }),
        )
        .await?;
        Ok(())
    }

    async fn open_conversation(&self, users: &[&str]) -> Result<String, BotError> {
        let resp = self
            .call("conversations.open", json!({ "users": users.join(",") }))
            .await?;
        resp["channel"]["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| BotError::slack_api("conversations.open", "no channel id in response"))
    }
}

fn check_ok(method: &'static str, resp: Value) -> Result<Value, BotError> {
    if resp["ok"].as_bool() != Some(true) {
        let err = resp["error"].as_str().unwrap_or("unknown");
        return Err(BotError::slack_api(method, err));
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;

    /// 在随机端口启动假 Web API，返回其根地址
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_check_ok_passes_through() {
        let resp = json!({"ok": true, "channel": {"id": "D1"}});
        assert_eq!(check_ok("conversations.open", resp).unwrap()["channel"]["id"], "D1");
    }

    #[test]
    fn test_check_ok_maps_error() {
        let err = check_ok("chat.postMessage", json!({"ok": false, "error": "channel_not_found"}))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Slack API chat.postMessage failed: channel_not_found"
        );
    }

    fn section(api_base: &str, request_timeout_secs: u64) -> SlackSection {
        SlackSection {
            api_base: api_base.to_string(),
            request_timeout_secs,
            ..SlackSection::default()
        }
    }

    #[test]
    fn test_url_strips_trailing_slash() {
        let client = SlackWebClient::new("xoxb-1", &section("http://localhost:9/api/", 10)).unwrap();
        assert_eq!(client.url("auth.test"), "http://localhost:9/api/auth.test");
    }

    #[tokio::test]
    async fn test_post_message_ok() {
        let app = Router::new().route(
            "/chat.postMessage",
            post(|| async { Json(json!({"ok": true, "ts": "1.0"})) }),
        );
        let client = SlackWebClient::new("xoxb-1", &section(&serve(app).await, 10)).unwrap();
        client.post_message("D1", "hi").await.unwrap();
    }

    #[tokio::test]
    async fn test_hanging_request_times_out() {
        let app = Router::new().route(
            "/chat.postMessage",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({"ok": true}))
            }),
        );
        let client = SlackWebClient::new("xoxb-1", &section(&serve(app).await, 1)).unwrap();

        let started = std::time::Instant::now();
        let err = client.post_message("D1", "hi").await.unwrap_err();
        assert!(matches!(err, BotError::Http(ref e) if e.is_timeout()), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
