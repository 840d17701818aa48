//! 外部集成：Slack（Socket Mode + Web API）与笑话 API

pub mod joke;
pub mod slack;

pub use joke::{DadJokeClient, JokeError, JokeSource};
