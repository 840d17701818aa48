//! icanhazdadjoke.com 客户端
//!
//! `GET /`，`Accept: application/json`，默认 5 秒超时；非 2xx 或 JSON 不含 `joke` 视为失败。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_JOKE_URL: &str = "https://icanhazdadjoke.com/";

/// 取笑话失败
#[derive(Error, Debug)]
pub enum JokeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("malformed joke payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// 笑话来源
#[async_trait]
pub trait JokeSource: Send + Sync {
    async fn fetch_joke(&self) -> Result<String, JokeError>;
}

#[derive(Debug, Deserialize)]
struct JokeResponse {
    joke: String,
}

/// HTTP 笑话客户端
pub struct DadJokeClient {
    client: Client,
    url: String,
}

impl DadJokeClient {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, JokeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("dadbot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl JokeSource for DadJokeClient {
    async fn fetch_joke(&self) -> Result<String, JokeError> {
        let resp = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(JokeError::Status(status));
        }

        let body = resp.text().await?;
        let parsed: JokeResponse = serde_json::from_str(&body)?;
        Ok(parsed.joke)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{header, StatusCode as AxumStatus};
    use axum::routing::get;
    use axum::Router;

    use super::*;

    /// 在随机端口启动一个本地服务，返回其 URL
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_fetch_joke_ok() {
        let app = Router::new().route(
            "/",
            get(|headers: axum::http::HeaderMap| async move {
                let accept = headers
                    .get(header::ACCEPT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if accept == "application/json" {
                    (AxumStatus::OK, r#"{"id":"x","joke":"I'm afraid for the calendar.","status":200}"#)
                } else {
                    (AxumStatus::NOT_ACCEPTABLE, "text please")
                }
            }),
        );
        let url = serve(app).await;

        let client = DadJokeClient::new(&url, 5).unwrap();
        assert_eq!(
            client.fetch_joke().await.unwrap(),
            "I'm afraid for the calendar."
        );
    }

    #[tokio::test]
    async fn test_fetch_joke_non_2xx() {
        let app = Router::new().route(
            "/",
            get(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "down") }),
        );
        let url = serve(app).await;

        let client = DadJokeClient::new(&url, 5).unwrap();
        let err = client.fetch_joke().await.unwrap_err();
        assert!(matches!(err, JokeError::Status(s) if s.as_u16() == 503));
    }

    #[tokio::test]
    async fn test_fetch_joke_malformed_json() {
        let app = Router::new().route("/", get(|| async { r#"{"punchline": 3}"# }));
        let url = serve(app).await;

        let client = DadJokeClient::new(&url, 5).unwrap();
        let err = client.fetch_joke().await.unwrap_err();
        assert!(matches!(err, JokeError::Payload(_)));
    }
}
