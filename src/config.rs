//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DADBOT__*` 覆盖（双下划线表示嵌套，如 `DADBOT__LLM__MODEL=gpt-4o-mini`）。
//! 三个凭据只从环境变量读取，见 [`Credentials`]。

use serde::Deserialize;

use crate::core::BotError;
use crate::integrations::joke::DEFAULT_JOKE_URL;
use crate::integrations::slack::SLACK_API_BASE;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bot: BotSection,
    pub slack: SlackSection,
    pub joke: JokeSection,
    pub llm: LlmSection,
}

/// [bot] 段：版本号、去重容量、事件队列长度
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotSection {
    /// "what version are you?" 的回复里使用
    pub version: String,
    /// 去重集合最多保留的消息 ID 数，0 表示不淘汰
    pub dedup_capacity: usize,
    /// Socket Mode 任务与事件循环之间的队列长度
    pub event_queue_size: usize,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            dedup_capacity: 10_000,
            event_queue_size: 64,
        }
    }
}

/// [slack] 段：Web API 地址、请求超时与重连策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlackSection {
    pub api_base: String,
    /// 单次 Web API 请求超时；事件循环是串行的，一个卡住的请求会拖住后续所有事件
    pub request_timeout_secs: u64,
    /// 第 n 次重连前等待 n * reconnect_delay_secs 秒（上限 6 倍）
    pub reconnect_delay_secs: u64,
    /// 连续失败多少次后放弃
    pub max_reconnect_attempts: u32,
}

impl Default for SlackSection {
    fn default() -> Self {
        Self {
            api_base: SLACK_API_BASE.to_string(),
            request_timeout_secs: 10,
            reconnect_delay_secs: 5,
            max_reconnect_attempts: 10,
        }
    }
}

/// [joke] 段：笑话 API 地址与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JokeSection {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for JokeSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_JOKE_URL.to_string(),
            timeout_secs: 5,
        }
    }
}

/// [llm] 段：模型与可选的 OpenAI 兼容端点
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            base_url: None,
        }
    }
}

/// 从 config 目录加载配置，环境变量 DADBOT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 再叠加环境变量 DADBOT__*
pub fn load_config() -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DADBOT")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

pub const APP_TOKEN_VAR: &str = "SLACK_APP_TOKEN";
pub const BOT_TOKEN_VAR: &str = "SLACK_BOT_TOKEN";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// 启动所需的三个凭据
#[derive(Clone)]
pub struct Credentials {
    /// App-level token（Socket Mode 握手用）
    pub app_token: String,
    /// Bot token（Web API 调用用）
    pub bot_token: String,
    pub openai_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_token", &"xapp-***")
            .field("bot_token", &"xoxb-***")
            .field("openai_api_key", &"sk-***")
            .finish()
    }
}

impl Credentials {
    /// 从进程环境变量读取并校验
    pub fn from_env() -> Result<Self, BotError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意查找函数读取并校验（缺失或前缀不符均为致命错误）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            app_token: required(&lookup, APP_TOKEN_VAR, "xapp-")?,
            bot_token: required(&lookup, BOT_TOKEN_VAR, "xoxb-")?,
            openai_api_key: required(&lookup, OPENAI_KEY_VAR, "sk-")?,
        })
    }
}

fn required<F>(lookup: &F, key: &str, prefix: &str) -> Result<String, BotError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BotError::Config(format!("{key} must be set.")))?;
    if !value.starts_with(prefix) {
        return Err(BotError::Config(format!(
            "{key} must have the prefix \"{prefix}\"."
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_credentials_valid() {
        let creds = Credentials::from_lookup(env(&[
            (APP_TOKEN_VAR, "xapp-1-abc"),
            (BOT_TOKEN_VAR, "xoxb-123"),
            (OPENAI_KEY_VAR, "sk-test"),
        ]))
        .unwrap();
        assert_eq!(creds.app_token, "xapp-1-abc");
        assert_eq!(creds.bot_token, "xoxb-123");
        assert_eq!(creds.openai_api_key, "sk-test");
    }

    #[test]
    fn test_credentials_missing_openai_key() {
        let err = Credentials::from_lookup(env(&[
            (APP_TOKEN_VAR, "xapp-1-abc"),
            (BOT_TOKEN_VAR, "xoxb-123"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY must be set"));
    }

    #[test]
    fn test_credentials_bad_prefix() {
        let err = Credentials::from_lookup(env(&[
            (APP_TOKEN_VAR, "xoxb-wrong"),
            (BOT_TOKEN_VAR, "xoxb-123"),
            (OPENAI_KEY_VAR, "sk-test"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SLACK_APP_TOKEN must have the prefix \"xapp-\""));
    }

    #[test]
    fn test_credentials_empty_counts_as_missing() {
        let err = Credentials::from_lookup(env(&[
            (APP_TOKEN_VAR, "xapp-1"),
            (BOT_TOKEN_VAR, ""),
            (OPENAI_KEY_VAR, "sk-test"),
        ]))
        .unwrap_err();
        assert!(matches!(err, BotError::Config(msg) if msg.contains("SLACK_BOT_TOKEN")));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials {
            app_token: "xapp-secret".into(),
            bot_token: "xoxb-secret".into(),
            openai_api_key: "sk-secret".into(),
        };
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_section_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.joke.timeout_secs, 5);
        assert_eq!(config.joke.url, "https://icanhazdadjoke.com/");
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.bot.dedup_capacity, 10_000);
        assert_eq!(config.slack.api_base, "https://slack.com/api");
        assert_eq!(config.slack.request_timeout_secs, 10);
    }

    #[test]
    fn test_load_config_reads_shipped_defaults() {
        // 测试在包根目录运行，找到的是 config/default.toml
        let config = load_config().unwrap();
        assert_eq!(config.slack.reconnect_delay_secs, 5);
        assert_eq!(config.slack.max_reconnect_attempts, 10);
        assert_eq!(config.bot.event_queue_size, 64);
        assert_eq!(config.bot.version, env!("CARGO_PKG_VERSION"));
    }
}
