//! Wire types of the LINE Messaging API used by the bot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod webhook {
    use super::*;

    /// Body of a webhook delivery.
    ///
    /// A delivery carries zero or more events; LINE sends an empty list
    /// when verifying the endpoint.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct WebhookBody {
        #[serde(default)]
        pub destination: Option<String>,
        pub events: Vec<Event>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Event {
        /// `message`, `follow`, `postback`, ...
        #[serde(rename = "type")]
        pub kind: String,
        #[serde(default)]
        pub reply_token: Option<String>,
        /// Milliseconds since the Unix epoch.
        #[serde(default)]
        pub timestamp: i64,
        #[serde(default)]
        pub webhook_event_id: Option<String>,
        #[serde(default)]
        pub source: Option<Source>,
        #[serde(default)]
        pub message: Option<EventMessage>,
    }

    impl Event {
        /// Text of a text-message event.
        #[must_use]
        pub fn text(&self) -> Option<&str> {
            if self.kind != "message" {
                return None;
            }
            let message = self.message.as_ref()?;
            if message.kind != "text" {
                return None;
            }
            message.text.as_deref()
        }

        /// When the user sent the event.
        #[must_use]
        pub fn sent_at(&self) -> Option<DateTime<Utc>> {
            if self.timestamp <= 0 {
                return None;
            }
            DateTime::from_timestamp_millis(self.timestamp)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Source {
        #[serde(rename = "type")]
        pub kind: String,
        #[serde(default)]
        pub user_id: Option<String>,
        #[serde(default)]
        pub group_id: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EventMessage {
        #[serde(rename = "type")]
        pub kind: String,
        #[serde(default)]
        pub id: Option<String>,
        #[serde(default)]
        pub text: Option<String>,
    }
}

pub mod reply {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReplyRequest {
        pub reply_token: String,
        pub messages: Vec<Message>,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "lowercase")]
    pub enum Message {
        Text { text: String },
    }

    /// Error body returned by the Messaging API.
    #[derive(Debug, Clone, Deserialize)]
    pub struct ErrorBody {
        pub message: String,
    }
}
