//! 机器人本体
//!
//! - **intent**: 私信文本 → 意图（纯字符串规则）
//! - **dedup**: 按 `client_msg_id` 去重
//! - **handlers**: 意图的执行（取笑话、调 LLM、发消息）
//! - **router**: 事件循环，先应答再分发
//! - **builder**: 由配置组装并运行整个机器人

pub mod builder;
pub mod dedup;
pub mod handlers;
pub mod intent;
pub mod router;

#[cfg(test)]
mod fakes;

pub use builder::{BotBuilder, DadBot};
pub use dedup::{DedupStore, MemoryDedupStore};
pub use handlers::{time_reply, ActionHandlers, Responder, SlashAction};
pub use intent::{classify, Intent};
pub use router::EventRouter;
