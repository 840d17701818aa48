//! 单元测试用的假实现

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::handlers::{Responder, SlashAction};
use super::intent::Intent;
use crate::core::BotError;
use crate::integrations::slack::{AckToken, Acknowledger, BlockPayload, SlackApi, SlashCommand};
use crate::integrations::{JokeError, JokeSource};

/// 记录所有发出的消息；`open_conversation` 返回 `DM-<user>`
#[derive(Default)]
pub struct RecordingSlack {
    posts: Mutex<Vec<(String, String)>>,
    opened: Mutex<Vec<String>>,
    rejected_channels: HashSet<String>,
    fail_open: bool,
}

impl RecordingSlack {
    pub fn rejecting_channel(channel: &str) -> Self {
        Self {
            rejected_channels: HashSet::from([channel.to_string()]),
            ..Self::default()
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl SlackApi for RecordingSlack {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), BotError> {
        if self.rejected_channels.contains(channel) {
            return Err(BotError::slack_api("chat.postMessage", "channel_not_found"));
        }
        self.posts
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }

    async fn open_conversation(&self, users: &[&str]) -> Result<String, BotError> {
        if self.fail_open {
            return Err(BotError::slack_api("conversations.open", "user_not_found"));
        }
        let users = users.join(",");
        self.opened.lock().unwrap().push(users.clone());
        Ok(format!("DM-{users}"))
    }
}

/// 固定笑话或固定失败
pub struct FakeJokes {
    joke: Option<String>,
}

impl FakeJokes {
    pub fn ok(joke: &str) -> Self {
        Self {
            joke: Some(joke.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self {
            joke: None,
        }
    }
}

#[async_trait]
impl JokeSource for FakeJokes {
    async fn fetch_joke(&self) -> Result<String, JokeError> {
        self.joke
            .clone()
            .ok_or(JokeError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
    }
}

/// 记录应答帧（信封 ID + 载荷）
#[derive(Default)]
pub struct RecordingAcker {
    acks: Mutex<Vec<(String, Option<Value>)>>,
}

impl RecordingAcker {
    pub fn acks(&self) -> Vec<(String, Option<Value>)> {
        self.acks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Acknowledger for RecordingAcker {
    async fn ack(&self, token: &AckToken, payload: Option<Value>) -> Result<(), BotError> {
        self.acks
            .lock()
            .unwrap()
            .push((token.as_str().to_string(), payload));
        Ok(())
    }
}

/// 记录调用顺序；意图等于 `panic_on` 时 panic
#[derive(Default)]
pub struct RecordingResponder {
    calls: Mutex<Vec<String>>,
    panic_on: Option<Intent>,
}

impl RecordingResponder {
    pub fn panicking_on(intent: Intent) -> Self {
        Self {
            panic_on: Some(intent),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn handle(&self, intent: Intent, reply_channel: &str) {
        if self.panic_on.as_ref() == Some(&intent) {
            panic!("handler blew up on {}", intent.name());
        }
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}@{}", intent.name(), reply_channel));
    }

    async fn greet_mention(&self, channel: &str) {
        self.calls.lock().unwrap().push(format!("mention@{channel}"));
    }

    async fn slash(&self, action: SlashAction, command: &SlashCommand) -> BlockPayload {
        self.calls
            .lock()
            .unwrap()
            .push(format!("slash:{}", command.command));
        BlockPayload::section_with_button(format!("reply to {}", command.text), action.button_label())
    }
}
