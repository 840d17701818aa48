//! 事件路由
//!
//! 单一消费者循环：从队列取 [`Event`]，先应答再处理。每个事件都在恢复边界内执行，
//! 错误或 panic 只记日志，循环继续处理下一个事件。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::dedup::DedupStore;
use super::handlers::{Responder, SlashAction};
use super::intent::classify;
use crate::core::BotError;
use crate::integrations::slack::{
    AckToken, Acknowledger, Event, EventsApiPayload, InnerEvent, Interaction, InteractionKind,
    Lifecycle, MessageEvent, SlashCommand,
};

pub struct EventRouter {
    acker: Arc<dyn Acknowledger>,
    responder: Arc<dyn Responder>,
    dedup: Arc<dyn DedupStore>,
}

impl EventRouter {
    pub fn new(
        acker: Arc<dyn Acknowledger>,
        responder: Arc<dyn Responder>,
        dedup: Arc<dyn DedupStore>,
    ) -> Self {
        Self {
            acker,
            responder,
            dedup,
        }
    }

    /// 消费事件直到队列关闭
    pub async fn run(&self, mut events: mpsc::Receiver<Event>) {
        while let Some(event) = events.recv().await {
            let kind = event.kind();
            match AssertUnwindSafe(self.route(event)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(event = kind, error = %e, "Event handling failed"),
                Err(panic) => error!(
                    event = kind,
                    panic = %panic_message(panic.as_ref()),
                    "Recovered from panic while handling event"
                ),
            }
        }
        info!("Event queue closed, router stopped");
    }

    /// 处理单个事件
    ///
    /// 应答失败时返回错误且不再处理：未应答的信封会被平台重投。
    pub async fn route(&self, event: Event) -> Result<(), BotError> {
        match event {
            Event::Lifecycle(lifecycle) => {
                log_lifecycle(&lifecycle);
                Ok(())
            }
            Event::EventsApi { ack, payload } => {
                self.acker.ack(&ack, None).await?;
                self.on_events_api(payload).await;
                Ok(())
            }
            Event::Interactive { ack, interaction } => {
                self.acker.ack(&ack, None).await?;
                on_interaction(&interaction);
                Ok(())
            }
            Event::SlashCommand { ack, command } => self.on_slash_command(&ack, &command).await,
        }
    }

    async fn on_events_api(&self, payload: EventsApiPayload) {
        let EventsApiPayload::EventCallback { event } = payload else {
            debug!("Unsupported Events API payload");
            return;
        };

        match event {
            InnerEvent::Message(msg) => self.on_message(msg).await,
            InnerEvent::AppMention(mention) => self.responder.greet_mention(&mention.channel).await,
            InnerEvent::MemberJoinedChannel(joined) => {
                info!(user = %joined.user, channel = %joined.channel, "User joined channel");
            }
            InnerEvent::Other => debug!("Unsupported Events API event received"),
        }
    }

    async fn on_message(&self, msg: MessageEvent) {
        if !msg.is_direct() || msg.is_from_bot() {
            debug!(channel = %msg.channel, channel_type = %msg.channel_type, "Ignoring message");
            return;
        }
        if !msg.is_user_authored() {
            debug!(subtype = msg.subtype.as_deref().unwrap_or(""), "Ignoring message subtype");
            return;
        }

        // 没有 client_msg_id 的消息无法去重，直接处理
        if let Some(id) = msg.client_msg_id.as_deref().filter(|id| !id.is_empty()) {
            if !self.dedup.claim(id) {
                info!(client_msg_id = %id, "Duplicate message, skipping");
                return;
            }
        }

        let intent = classify(&msg.text);
        info!(
            channel = %msg.channel,
            user = msg.user.as_deref().unwrap_or(""),
            intent = intent.name(),
            "Direct message received"
        );
        self.responder.handle(intent, &msg.channel).await;
    }

    /// 斜杠命令的回复放在应答载荷里，所以先生成回复再应答
    async fn on_slash_command(&self, ack: &AckToken, command: &SlashCommand) -> Result<(), BotError> {
        let Some(action) = SlashAction::parse(&command.command) else {
            info!(command = %command.command, "Unknown slash command");
            return self.acker.ack(ack, None).await;
        };

        info!(command = %command.command, user = %command.user_id, "Slash command received");
        let reply = self.responder.slash(action, command).await;
        self.acker.ack(ack, Some(reply.to_value())).await
    }
}

fn on_interaction(interaction: &Interaction) {
    let user = interaction.user.as_ref().map(|u| u.id.as_str()).unwrap_or("");
    match interaction.kind {
        InteractionKind::BlockActions => info!(user = %user, "Button clicked"),
        kind => debug!(?kind, user = %user, "Interaction received"),
    }
}

fn log_lifecycle(lifecycle: &Lifecycle) {
    match lifecycle {
        Lifecycle::Connecting => info!("Connecting to Slack with Socket Mode..."),
        Lifecycle::Connected => info!("Connected to Slack with Socket Mode."),
        Lifecycle::ConnectionError(e) => warn!(error = %e, "Connection failed. Retrying later..."),
        Lifecycle::Hello { num_connections } => {
            debug!(?num_connections, "Socket Mode hello")
        }
        Lifecycle::Disconnect { reason } => info!(?reason, "Slack requested disconnect"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
