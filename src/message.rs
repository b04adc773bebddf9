//! Unified inbound message model.
//!
//! Mail readers, SMS gateways and other transports are external
//! collaborators; whatever they receive is parsed into this shape before
//! it reaches the matcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An inbound message from any source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Source transport: "mail", "sms", etc.
    pub source_type: String,
    /// Sender address (mail address, phone number, handle).
    pub from: String,
    /// Message body.
    pub message: String,
    /// Subject line, when the transport carries one.
    #[serde(default)]
    pub title: Option<String>,
    /// When the message was received.
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a message with the current timestamp and no title.
    pub fn new(
        source_type: impl Into<String>,
        from: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            from: from.into(),
            message: message.into(),
            title: None,
            received_at: Utc::now(),
        }
    }

    /// Attach a subject line.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
