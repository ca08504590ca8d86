//! # Platform Formatting
//!
//! Adapts a resolved response to the requesting channel. The adaptation is a
//! pure transform keyed by a closed channel tag, so every variant is handled
//! exhaustively at compile time.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The closed set of output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Default browser client: bare text object.
    #[default]
    Web,
    /// Chat-ops platforms (Slack-style): a markdown section block list.
    ChatopsBlock,
    /// Adaptive-card hosts (Teams-style).
    AdaptiveCard,
    /// Plain text transports (WhatsApp, email).
    Plain,
}

impl Channel {
    /// Maps a request's platform tag onto a channel. Unknown tags render as
    /// web.
    pub fn from_platform(platform: &str) -> Self {
        match platform.to_lowercase().as_str() {
            "slack" => Channel::ChatopsBlock,
            "teams" => Channel::AdaptiveCard,
            "whatsapp" | "email" => Channel::Plain,
            _ => Channel::Web,
        }
    }
}

/// Renders a response for one channel. Side-effect free.
pub fn format_for_channel(channel: Channel, response: &str) -> Value {
    match channel {
        Channel::Web => json!({ "text": response }),
        Channel::ChatopsBlock => json!({
            "blocks": [
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": response }
                }
            ]
        }),
        Channel::AdaptiveCard => json!({
            "type": "message",
            "attachments": [
                {
                    "contentType": "application/vnd.microsoft.card.adaptive",
                    "content": {
                        "type": "AdaptiveCard",
                        "body": [
                            { "type": "TextBlock", "text": response, "wrap": true }
                        ]
                    }
                }
            ]
        }),
        Channel::Plain => json!({ "text": response }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_tags_map_to_channels() {
        assert_eq!(Channel::from_platform("slack"), Channel::ChatopsBlock);
        assert_eq!(Channel::from_platform("Teams"), Channel::AdaptiveCard);
        assert_eq!(Channel::from_platform("whatsapp"), Channel::Plain);
        assert_eq!(Channel::from_platform("web"), Channel::Web);
        assert_eq!(Channel::from_platform("something-new"), Channel::Web);
    }

    #[test]
    fn chatops_format_wraps_text_in_blocks() {
        let rendered = format_for_channel(Channel::ChatopsBlock, "stock is low");
        assert_eq!(
            rendered["blocks"][0]["text"]["text"],
            Value::String("stock is low".to_string())
        );
    }

    #[test]
    fn adaptive_card_format_carries_text_block() {
        let rendered = format_for_channel(Channel::AdaptiveCard, "order shipped");
        let body = &rendered["attachments"][0]["content"]["body"][0];
        assert_eq!(body["type"], Value::String("TextBlock".to_string()));
        assert_eq!(body["text"], Value::String("order shipped".to_string()));
    }

    #[test]
    fn web_and_plain_formats_are_bare_text() {
        for channel in [Channel::Web, Channel::Plain] {
            let rendered = format_for_channel(channel, "hello");
            assert_eq!(rendered["text"], Value::String("hello".to_string()));
        }
    }
}
