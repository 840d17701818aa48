//! Dadbot - Slack Socket Mode 聊天机器人
//!
//! 模块划分：
//! - **bot**: 意图识别、去重、事件路由与回复
//! - **config**: 应用配置（TOML + 环境变量）与凭据
//! - **core**: 错误类型、优雅关闭
//! - **integrations**: Slack（Socket Mode / Web API）与笑话 API
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: 日志初始化

pub mod bot;
pub mod config;
pub mod core;
pub mod integrations;
pub mod llm;
pub mod observability;
