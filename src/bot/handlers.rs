//! 意图处理
//!
//! 每个意图至多一次外部调用（取笑话 / LLM 补全 / 打开私信会话），然后发一到两条消息。
//! 发送失败只记日志，不重试、不向上传播。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{error, info, warn};

use super::intent::Intent;
use crate::integrations::slack::{BlockPayload, SlackApi, SlashCommand};
use crate::integrations::JokeSource;
use crate::llm::LlmClient;

pub const JOKE_FAILURE_PREFIX: &str = "This is Not a Joke! ";
pub const COMPLETION_FAILURE_PREFIX: &str = "ResponseError: ";
pub const MENTION_GREETING: &str = "Oh, hello.";
pub const WEATHER_REPLY: &str = "I'm sorry, I can't provide weather information.";
pub const WEATHER_FORECAST: &str = "102 °F Temperatures are on the up!  the water is warm.";
pub const RELAY_MESSAGE: &str = "This is a direct message from the chat bot";
pub const TIME_PREFIX: &str = "At the tone the time will be...\n";

/// 支持的斜杠命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashAction {
    DadJoke,
    Weather,
    OpenAi,
}

impl SlashAction {
    /// 命令名精确匹配；未知命令返回 None
    pub fn parse(command: &str) -> Option<Self> {
        match command {
            "/dadjoke" => Some(Self::DadJoke),
            "/weather" => Some(Self::Weather),
            "/openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            Self::DadJoke => "bar",
            Self::Weather => "wet bar",
            Self::OpenAi => "openai",
        }
    }
}

/// 事件路由调用的回复接口
#[async_trait]
pub trait Responder: Send + Sync {
    /// 执行意图，回复发往 `reply_channel`（或意图里指定的目标）
    async fn handle(&self, intent: Intent, reply_channel: &str);

    /// 被 @ 时的固定问候
    async fn greet_mention(&self, channel: &str);

    /// 斜杠命令：回复随应答帧返回，不单独发消息
    async fn slash(&self, action: SlashAction, command: &SlashCommand) -> BlockPayload;
}

/// 默认实现：Slack Web API + 笑话 API + LLM
pub struct ActionHandlers {
    slack: Arc<dyn SlackApi>,
    jokes: Arc<dyn JokeSource>,
    llm: Arc<dyn LlmClient>,
    version: String,
    model: String,
}

impl ActionHandlers {
    pub fn new(
        slack: Arc<dyn SlackApi>,
        jokes: Arc<dyn JokeSource>,
        llm: Arc<dyn LlmClient>,
        version: &str,
        model: &str,
    ) -> Self {
        Self {
            slack,
            jokes,
            llm,
            version: version.to_string(),
            model: model.to_string(),
        }
    }

    /// 笑话原文，失败时为带前缀的错误说明
    async fn joke_text(&self) -> String {
        match self.jokes.fetch_joke().await {
            Ok(joke) => joke,
            Err(e) => {
                warn!(error = %e, "Joke fetch failed");
                format!("{JOKE_FAILURE_PREFIX}{e}")
            }
        }
    }

    async fn completion_text(&self, prompt: &str) -> String {
        match self.llm.ask(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Completion request failed");
                format!("{COMPLETION_FAILURE_PREFIX}{e}")
            }
        }
    }

    /// 发消息；失败记日志并返回 false
    async fn post(&self, channel: &str, text: &str) -> bool {
        match self.slack.post_message(channel, text).await {
            Ok(()) => true,
            Err(e) => {
                error!(channel = %channel, error = %e, "Failed posting message");
                false
            }
        }
    }

    /// 打开与用户的私信会话；失败记日志并返回 None
    async fn open_dm(&self, user: &str) -> Option<String> {
        match self.slack.open_conversation(&[user]).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(user = %user, error = %e, "Failed opening conversation");
                None
            }
        }
    }

    /// 私信用户 `body`，成功后在原频道回 `confirmation`
    async fn relay(&self, user: &str, body: &str, reply_channel: &str, confirmation: &str) {
        let Some(dm) = self.open_dm(user).await else {
            return;
        };
        if self.post(&dm, body).await {
            self.post(reply_channel, confirmation).await;
        }
    }

    fn version_reply(&self) -> String {
        format!(
            "I'm bot version {} using {} and an expert rules engine.",
            self.version, self.model
        )
    }
}

/// "At the tone..." 报时文本，时间格式 `YYYY-MM-DD HH:MM:SS`
pub fn time_reply(now: NaiveDateTime) -> String {
    format!("{TIME_PREFIX}{}", now.format("%Y-%m-%d %H:%M:%S"))
}

#[async_trait]
impl Responder for ActionHandlers {
    async fn handle(&self, intent: Intent, reply_channel: &str) {
        match intent {
            Intent::Joke => {
                let joke = self.joke_text().await;
                self.post(reply_channel, &joke).await;
            }
            Intent::JokeToChannel { channel } => {
                let joke = self.joke_text().await;
                if self.post(&channel, &joke).await {
                    self.post(reply_channel, &format!("Told joke: {joke}")).await;
                }
            }
            Intent::JokeToUser { user } => {
                let Some(dm) = self.open_dm(&user).await else {
                    return;
                };
                let joke = self.joke_text().await;
                if self.post(&dm, &joke).await {
                    self.post(reply_channel, &format!("Told the joke {joke}"))
                        .await;
                }
            }
            Intent::RelayToUser { user } => {
                self.relay(&user, RELAY_MESSAGE, reply_channel, "Message Sent!")
                    .await;
            }
            Intent::CustomRelay { user, body } => {
                self.relay(&user, &body, reply_channel, "Sent.").await;
            }
            Intent::Time => {
                let reply = time_reply(chrono::Local::now().naive_local());
                self.post(reply_channel, &reply).await;
            }
            Intent::Weather => {
                self.post(reply_channel, WEATHER_REPLY).await;
            }
            Intent::Version => {
                self.post(reply_channel, &self.version_reply()).await;
            }
            Intent::Completion { prompt, .. } => {
                let reply = self.completion_text(&prompt).await;
                self.post(reply_channel, &reply).await;
            }
        }
    }

    async fn greet_mention(&self, channel: &str) {
        info!(channel = %channel, "We have been mentioned");
        self.post(channel, MENTION_GREETING).await;
    }

    async fn slash(&self, action: SlashAction, command: &SlashCommand) -> BlockPayload {
        let text = match action {
            SlashAction::DadJoke => self.joke_text().await,
            SlashAction::Weather => WEATHER_FORECAST.to_string(),
            SlashAction::OpenAi => self.completion_text(&command.text).await,
        };
        BlockPayload::section_with_button(text, action.button_label())
    }
}
