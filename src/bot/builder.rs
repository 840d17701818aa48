//! 机器人构建器：由配置与凭据组装 Socket Mode 连接、事件路由和各外部客户端
//!
//! 外部依赖（Slack Web API / 笑话 / LLM / 去重）都可以替换，便于测试。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::dedup::{DedupStore, MemoryDedupStore};
use super::handlers::ActionHandlers;
use super::router::EventRouter;
use crate::config::{AppConfig, Credentials};
use crate::core::BotError;
use crate::integrations::slack::{SlackApi, SlackWebClient, SocketAcker, SocketModeClient};
use crate::integrations::{DadJokeClient, JokeSource};
use crate::llm::{LlmClient, OpenAiClient};

pub struct BotBuilder {
    config: AppConfig,
    credentials: Credentials,
    slack: Option<Arc<dyn SlackApi>>,
    jokes: Option<Arc<dyn JokeSource>>,
    llm: Option<Arc<dyn LlmClient>>,
    dedup: Option<Arc<dyn DedupStore>>,
}

impl BotBuilder {
    pub fn new(config: AppConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            slack: None,
            jokes: None,
            llm: None,
            dedup: None,
        }
    }

    pub fn with_slack_api(mut self, slack: Arc<dyn SlackApi>) -> Self {
        self.slack = Some(slack);
        self
    }

    pub fn with_joke_source(mut self, jokes: Arc<dyn JokeSource>) -> Self {
        self.jokes = Some(jokes);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_dedup_store(mut self, dedup: Arc<dyn DedupStore>) -> Self {
        self.dedup = Some(dedup);
        self
    }

    /// 组装机器人；不发起任何网络请求
    pub fn build(self) -> Result<DadBot, BotError> {
        let config = self.config;
        let web = Arc::new(SlackWebClient::new(&self.credentials.bot_token, &config.slack)?);

        let slack: Arc<dyn SlackApi> = match self.slack {
            Some(slack) => slack,
            None => web.clone(),
        };
        let jokes: Arc<dyn JokeSource> = match self.jokes {
            Some(jokes) => jokes,
            None => Arc::new(DadJokeClient::new(&config.joke.url, config.joke.timeout_secs)?),
        };
        let llm: Arc<dyn LlmClient> = match self.llm {
            Some(llm) => llm,
            None => Arc::new(OpenAiClient::new(
                config.llm.base_url.as_deref(),
                &config.llm.model,
                &self.credentials.openai_api_key,
            )),
        };
        let dedup = self
            .dedup
            .unwrap_or_else(|| Arc::new(MemoryDedupStore::new(config.bot.dedup_capacity)));

        let handlers = ActionHandlers::new(
            slack,
            jokes,
            llm.clone(),
            &config.bot.version,
            &config.llm.model,
        );
        let (acker, acks) = SocketAcker::channel();
        let router = EventRouter::new(Arc::new(acker), Arc::new(handlers), dedup);
        let socket = SocketModeClient::new(&self.credentials.app_token, &config.slack)?;

        Ok(DadBot {
            web,
            socket,
            router,
            acks,
            llm,
            queue_size: config.bot.event_queue_size.max(1),
        })
    }
}

/// 组装好的机器人，[`DadBot::run`] 运行到关闭或连接彻底失败
pub struct DadBot {
    web: Arc<SlackWebClient>,
    socket: SocketModeClient,
    router: EventRouter,
    acks: mpsc::UnboundedReceiver<String>,
    llm: Arc<dyn LlmClient>,
    queue_size: usize,
}

impl DadBot {
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), BotError> {
        // 身份校验失败不阻止启动，连接层会再次暴露 token 问题
        match self.web.auth_test().await {
            Ok(identity) => info!(
                user_id = %identity.user_id,
                team = identity.team.as_deref().unwrap_or(""),
                "Authenticated with Slack"
            ),
            Err(e) => warn!(error = %e, "auth.test failed"),
        }

        let (events_tx, events_rx) = mpsc::channel(self.queue_size);
        let socket = self.socket;
        let acks = self.acks;
        let transport = tokio::spawn(async move { socket.run(events_tx, acks, shutdown).await });

        // 连接任务结束时丢弃发送端，路由循环随之退出
        self.router.run(events_rx).await;

        let (prompt, completion, total) = self.llm.token_usage();
        info!(prompt, completion, total, "LLM token usage for this session");

        match transport.await {
            Ok(result) => result,
            Err(e) => Err(BotError::Transport(format!("socket task failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bot::fakes::{FakeJokes, RecordingSlack};
    use crate::config::SlackSection;
    use crate::llm::MockLlmClient;

    fn credentials() -> Credentials {
        Credentials::from_lookup(|key| {
            Some(
                match key {
                    "SLACK_APP_TOKEN" => "xapp-1",
                    "SLACK_BOT_TOKEN" => "xoxb-1",
                    _ => "sk-1",
                }
                .to_string(),
            )
        })
        .unwrap()
    }

    #[test]
    fn test_build_with_defaults_makes_no_requests() {
        assert!(BotBuilder::new(AppConfig::default(), credentials()).build().is_ok());
    }

    #[test]
    fn test_zero_queue_size_is_clamped() {
        let mut config = AppConfig::default();
        config.bot.event_queue_size = 0;
        let bot = BotBuilder::new(config, credentials()).build().unwrap();
        assert_eq!(bot.queue_size, 1);
    }

    #[tokio::test]
    async fn test_run_returns_transport_error_when_slack_unreachable() {
        let config = AppConfig {
            slack: SlackSection {
                api_base: "http://127.0.0.1:1".to_string(),
                reconnect_delay_secs: 0,
                max_reconnect_attempts: 1,
                ..SlackSection::default()
            },
            ..AppConfig::default()
        };
        let bot = BotBuilder::new(config, credentials())
            .with_slack_api(Arc::new(RecordingSlack::default()))
            .with_joke_source(Arc::new(FakeJokes::ok("pun")))
            .with_llm(Arc::new(MockLlmClient::new()))
            .with_dedup_store(Arc::new(MemoryDedupStore::unbounded()))
            .build()
            .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(10), bot.run(CancellationToken::new()))
            .await
            .unwrap();
        assert!(matches!(result, Err(BotError::Transport(_))));
    }
}
