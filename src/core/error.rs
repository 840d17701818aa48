//! 机器人错误类型
//!
//! 分类：启动配置错误（致命）、帧解码错误（跳过）、外部调用错误（记录并以文字回复）、事件处理 panic（边界捕获）。

use thiserror::Error;

use crate::integrations::joke::JokeError;
use crate::llm::LlmError;

/// 机器人运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum BotError {
    /// 启动配置错误：缺少或格式不正确的凭据等，连接前直接退出
    #[error("Config error: {0}")]
    Config(String),

    /// Slack Web API 返回 `ok: false`
    #[error("Slack API {method} failed: {message}")]
    SlackApi {
        method: &'static str,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Socket Mode 连接层错误（握手、收发帧、重连耗尽）
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Joke error: {0}")]
    Joke(#[from] JokeError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

impl BotError {
    pub fn slack_api(method: &'static str, message: impl Into<String>) -> Self {
        Self::SlackApi {
            method,
            message: message.into(),
        }
    }
}
