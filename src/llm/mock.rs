//! Mock LLM 客户端（用于测试，无需 API）

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};

/// Mock 客户端：回显 prompt；`failing` 时返回固定错误
#[derive(Debug, Default)]
pub struct MockLlmClient {
    failing: Option<String>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用都失败，错误文本为 `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failing: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failing {
            return Err(LlmError::Api(message.clone()));
        }
        Ok(format!("Echo from Mock: {}", prompt))
    }
}
