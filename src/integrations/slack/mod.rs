//! Slack 集成：Socket Mode 长连接 + Web API
//!
//! - **event**: 帧解码，得到 [`Event`] 标签联合
//! - **socket**: 连接、收帧、写应答、断线重连
//! - **api**: chat.postMessage / conversations.open 等 REST 调用
//! - **block**: 斜杠命令回复用的 Block Kit 载荷

pub mod api;
pub mod block;
pub mod event;
pub mod socket;

pub use api::{BotIdentity, ChannelPage, ChannelSummary, SlackApi, SlackWebClient, SLACK_API_BASE};
pub use block::BlockPayload;
pub use event::{
    AckToken, AppMentionEvent, Event, EventsApiPayload, InnerEvent, Interaction, InteractionKind,
    Lifecycle, MemberJoinedEvent, MessageEvent, SlashCommand,
};
pub use socket::{Acknowledger, SocketAcker, SocketModeClient};
