//! Socket Mode 帧与事件类型
//!
//! 收到的文本帧在这里一次性解码为 [`Event`]，事件循环之后只做模式匹配。
//! 帧格式：`hello` / `disconnect` 为连接控制帧；其余为带 `envelope_id` 的信封，
//! `type` 取 `events_api`、`interactive`、`slash_commands`。

use serde::Deserialize;
use serde_json::Value;

use crate::core::BotError;

/// 应答令牌（信封 ID）：每个信封都必须在平台超时前应答，否则会被重投
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AckToken(String);

impl AckToken {
    pub fn new(envelope_id: impl Into<String>) -> Self {
        Self(envelope_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 连接生命周期通知（只记日志）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    Connecting,
    Connected,
    ConnectionError(String),
    /// 服务端 hello 帧
    Hello { num_connections: Option<u32> },
    /// 服务端要求断开（刷新连接或即将维护）
    Disconnect { reason: Option<String> },
}

/// 解码后的事件
#[derive(Debug, Clone)]
pub enum Event {
    Lifecycle(Lifecycle),
    EventsApi {
        ack: AckToken,
        payload: EventsApiPayload,
    },
    Interactive {
        ack: AckToken,
        interaction: Interaction,
    },
    SlashCommand {
        ack: AckToken,
        command: SlashCommand,
    },
}

impl Event {
    /// 解码一条 Socket Mode 文本帧
    pub fn decode(text: &str) -> Result<Self, BotError> {
        let frame: Frame = serde_json::from_str(text)?;
        Ok(match frame {
            Frame::Hello { num_connections } => Event::Lifecycle(Lifecycle::Hello { num_connections }),
            Frame::Disconnect { reason } => Event::Lifecycle(Lifecycle::Disconnect { reason }),
            Frame::EventsApi {
                envelope_id,
                payload,
            } => Event::EventsApi {
                ack: AckToken(envelope_id),
                payload,
            },
            Frame::Interactive {
                envelope_id,
                payload,
            } => Event::Interactive {
                ack: AckToken(envelope_id),
                interaction: payload,
            },
            Frame::SlashCommands {
                envelope_id,
                payload,
            } => Event::SlashCommand {
                ack: AckToken(envelope_id),
                command: payload,
            },
        })
    }

    /// 用于日志的事件类别
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Lifecycle(_) => "lifecycle",
            Event::EventsApi { .. } => "events_api",
            Event::Interactive { .. } => "interactive",
            Event::SlashCommand { .. } => "slash_commands",
        }
    }
}

/// 无法解码的帧里尽量取回信封 ID，以便空应答、避免平台重投
pub fn recover_ack_token(text: &str) -> Option<AckToken> {
    let value: Value = serde_json::from_str(text).ok()?;
    value
        .get("envelope_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(AckToken::new)
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Frame {
    Hello {
        #[serde(default)]
        num_connections: Option<u32>,
    },
    Disconnect {
        #[serde(default)]
        reason: Option<String>,
    },
    EventsApi {
        envelope_id: String,
        payload: EventsApiPayload,
    },
    Interactive {
        envelope_id: String,
        payload: Interaction,
    },
    SlashCommands {
        envelope_id: String,
        payload: SlashCommand,
    },
}

/// Events API 外层载荷
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventsApiPayload {
    EventCallback { event: InnerEvent },
    #[serde(other)]
    Unsupported,
}

/// Events API 内层事件
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InnerEvent {
    Message(MessageEvent),
    AppMention(AppMentionEvent),
    MemberJoinedChannel(MemberJoinedEvent),
    #[serde(other)]
    Other,
}

/// 仍由用户本人发出的 message subtype
const USER_SUBTYPES: &[&str] = &["file_share", "thread_broadcast", "me_message"];

/// `message` 事件
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageEvent {
    pub channel: String,
    pub user: Option<String>,
    pub text: String,
    /// 客户端生成的消息 ID，去重键
    pub client_msg_id: Option<String>,
    /// `im` 为私聊，`channel` / `group` / `mpim` 为其他
    pub channel_type: String,
    pub bot_id: Option<String>,
    pub subtype: Option<String>,
    pub ts: String,
}

impl MessageEvent {
    pub fn is_direct(&self) -> bool {
        self.channel_type == "im"
    }

    pub fn is_from_bot(&self) -> bool {
        self.bot_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// 用户本人发出的消息：无 subtype，或带附件 / 同时发到频道的线程回复 / `/me`。
    /// 编辑、删除、入群通知等系统 subtype 不算。
    pub fn is_user_authored(&self) -> bool {
        match self.subtype.as_deref() {
            None => true,
            Some(subtype) => USER_SUBTYPES.contains(&subtype),
        }
    }
}

/// `app_mention` 事件
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppMentionEvent {
    pub channel: String,
    pub user: Option<String>,
    pub text: String,
}

/// `member_joined_channel` 事件
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemberJoinedEvent {
    pub user: String,
    pub channel: String,
}

/// 交互载荷（按钮点击、快捷方式、弹窗提交等）
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    #[serde(default)]
    pub user: Option<InteractionUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    BlockActions,
    Shortcut,
    MessageAction,
    ViewSubmission,
    ViewClosed,
    DialogSubmission,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InteractionUser {
    pub id: String,
}

/// 斜杠命令
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlashCommand {
    /// 带斜杠，如 `/dadjoke`
    pub command: String,
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    pub response_url: String,
}
