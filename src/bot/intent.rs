//! 意图识别
//!
//! 纯字符串匹配，不调用 LLM：按固定顺序逐条尝试规则表，先命中者胜；
//! 全部不命中时落到 LLM 兜底。前缀与短语比较均忽略大小写，
//! 但提取出的 ID、正文保留原文大小写。

/// 识别出的意图
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// 讲个笑话（回到原频道）
    Joke,
    /// 把笑话发到指定频道，并在原频道确认
    JokeToChannel { channel: String },
    /// 私信某用户一个笑话
    JokeToUser { user: String },
    /// 私信某用户一句固定的话
    RelayToUser { user: String },
    /// 私信某用户自定义内容
    CustomRelay { user: String, body: String },
    Time,
    Weather,
    Version,
    /// 交给 LLM；`explicit` 表示用户明确输入了 "openai"
    Completion { prompt: String, explicit: bool },
}

impl Intent {
    /// 日志里用的短名
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Joke => "joke",
            Intent::JokeToChannel { .. } => "joke_to_channel",
            Intent::JokeToUser { .. } => "joke_to_user",
            Intent::RelayToUser { .. } => "relay_to_user",
            Intent::CustomRelay { .. } => "custom_relay",
            Intent::Time => "time",
            Intent::Weather => "weather",
            Intent::Version => "version",
            Intent::Completion { explicit: true, .. } => "openai",
            Intent::Completion { explicit: false, .. } => "openai_fallback",
        }
    }
}

enum Matcher {
    /// 以该前缀开头（小写比较），提取函数拿到前缀之后的剩余文本
    Prefix(&'static str),
    /// 整句等于其中之一（小写、去首尾空白后比较）
    Exact(&'static [&'static str]),
}

struct Rule {
    matcher: Matcher,
    /// (原文, 前缀后的剩余文本) -> 意图；Exact 规则的剩余文本为空
    build: fn(&str, &str) -> Intent,
}

const JOKE_PHRASES: &[&str] = &["dadjoke", "tell me a dadjoke", "tell me another dadjoke"];
const WEATHER_PHRASES: &[&str] = &["what is the weather like"];
const TIME_PHRASES: &[&str] = &[
    "time",
    "what time is it",
    "what time is it?",
    "do you know what time it is",
    "tell me the time",
];
const VERSION_PHRASES: &[&str] = &["what version are you?", "what version are you"];
const OPENAI_PHRASES: &[&str] = &["openai"];

static RULES: &[Rule] = &[
    Rule {
        matcher: Matcher::Prefix("tell a dad joke in channel "),
        build: build_joke_to_channel,
    },
    Rule {
        matcher: Matcher::Prefix("send a direct message to the slack user "),
        build: build_relay_to_user,
    },
    Rule {
        matcher: Matcher::Prefix("tell a dad joke in a direct message to the slack user "),
        build: build_joke_to_user,
    },
    Rule {
        matcher: Matcher::Prefix("direct message slack user "),
        build: build_custom_relay,
    },
    Rule {
        matcher: Matcher::Exact(JOKE_PHRASES),
        build: build_joke,
    },
    Rule {
        matcher: Matcher::Exact(WEATHER_PHRASES),
        build: build_weather,
    },
    Rule {
        matcher: Matcher::Exact(TIME_PHRASES),
        build: build_time,
    },
    Rule {
        matcher: Matcher::Exact(VERSION_PHRASES),
        build: build_version,
    },
    Rule {
        matcher: Matcher::Exact(OPENAI_PHRASES),
        build: build_explicit_completion,
    },
];

/// 把消息文本映射为意图（全函数：任何输入都有结果）
pub fn classify(text: &str) -> Intent {
    let normalized = text.trim().to_lowercase();

    for rule in RULES {
        match rule.matcher {
            Matcher::Prefix(prefix) => {
                if let Some(rest) = strip_prefix_ignore_case(text, prefix) {
                    return (rule.build)(text, rest);
                }
            }
            Matcher::Exact(phrases) => {
                if phrases.contains(&normalized.as_str()) {
                    return (rule.build)(text, "");
                }
            }
        }
    }

    Intent::Completion {
        prompt: text.to_string(),
        explicit: false,
    }
}

/// 忽略 ASCII 大小写去掉前缀
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

fn first_token(rest: &str) -> &str {
    rest.split_whitespace().next().unwrap_or("")
}

/// `<#C123|general>` -> `C123`
fn channel_from_mention(token: &str) -> String {
    let token = token.strip_prefix("<#").unwrap_or(token);
    token
        .split(|c: char| c == '|' || c == '>')
        .next()
        .unwrap_or("")
        .to_string()
}

/// `<@U999>` / `<@U999|name>` -> `U999`
fn user_from_mention(token: &str) -> String {
    let token = token.split('|').next().unwrap_or("");
    token
        .trim_matches(|c: char| matches!(c, '<' | '@' | '>'))
        .to_string()
}

fn build_joke(_text: &str, _rest: &str) -> Intent {
    Intent::Joke
}

fn build_weather(_text: &str, _rest: &str) -> Intent {
    Intent::Weather
}

fn build_time(_text: &str, _rest: &str) -> Intent {
    Intent::Time
}

fn build_version(_text: &str, _rest: &str) -> Intent {
    Intent::Version
}

fn build_explicit_completion(text: &str, _rest: &str) -> Intent {
    Intent::Completion {
        prompt: text.to_string(),
        explicit: true,
    }
}

fn build_joke_to_channel(_text: &str, rest: &str) -> Intent {
    Intent::JokeToChannel {
        channel: channel_from_mention(first_token(rest)),
    }
}

fn build_relay_to_user(_text: &str, rest: &str) -> Intent {
    Intent::RelayToUser {
        user: user_from_mention(first_token(rest)),
    }
}

fn build_joke_to_user(_text: &str, rest: &str) -> Intent {
    Intent::JokeToUser {
        user: user_from_mention(first_token(rest)),
    }
}

fn build_custom_relay(_text: &str, rest: &str) -> Intent {
    let rest = rest.trim_start();
    let (token, body) = match rest.split_once(char::is_whitespace) {
        Some((token, body)) => (token, body.trim_start()),
        None => (rest, ""),
    };
    Intent::CustomRelay {
        user: user_from_mention(token),
        body: body.to_string(),
    }
}
