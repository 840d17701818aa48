//! Block Kit 载荷：斜杠命令的回复通过应答帧携带

use serde::Serialize;
use serde_json::Value;

/// 按钮的固定 value（只做装饰，点击后仅记录日志）
pub const BUTTON_VALUE: &str = "somevalue";

/// `{"blocks": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockPayload {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Mrkdwn { text: String },
    PlainText { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    Button { text: TextObject, value: String },
}

impl BlockPayload {
    /// 一个 mrkdwn 段落 + 右侧装饰按钮
    pub fn section_with_button(text: impl Into<String>, button_label: impl Into<String>) -> Self {
        Self {
            blocks: vec![Block::Section {
                text: TextObject::Mrkdwn { text: text.into() },
                accessory: Some(Accessory::Button {
                    text: TextObject::PlainText {
                        text: button_label.into(),
                    },
                    value: BUTTON_VALUE.to_string(),
                }),
            }],
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_with_button_shape() {
        let payload = BlockPayload::section_with_button("*hi*", "wet bar");
        let value = payload.to_value();
        let section = &value["blocks"][0];
        assert_eq!(section["type"], "section");
        assert_eq!(section["text"]["type"], "mrkdwn");
        assert_eq!(section["text"]["text"], "*hi*");
        assert_eq!(section["accessory"]["type"], "button");
        assert_eq!(section["accessory"]["text"]["type"], "plain_text");
        assert_eq!(section["accessory"]["text"]["text"], "wet bar");
        assert_eq!(section["accessory"]["value"], BUTTON_VALUE);
    }
}
