//! LLM 客户端抽象
//!
//! 机器人只做单轮补全：一条 user 消息进，首个 choice 的文本出。

use async_trait::async_trait;
use thiserror::Error;

/// 补全调用失败（网络、鉴权、请求构造）
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{0}")]
    Api(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 单轮补全：prompt 作为唯一的 user 消息，返回首个 choice 的文本
    async fn ask(&self, prompt: &str) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
