//! Chat transport seam: inbound message shape and the outbound sink.
//!
//! - [`InboundMessage`] - One text message as delivered by the transport
//! - [`ChatSink`] - Async trait for text and file replies
//! - [`telegram`] - Telegram Bot API implementation

pub mod telegram;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// One inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Conversation the message arrived in.
    pub conversation_id: i64,
    /// Id of this message within the conversation.
    pub message_id: i32,
    /// Message this one replies to, if any.
    pub reply_to_message_id: Option<i32>,
    /// Display name or handle of the sender.
    pub sender_name: String,
    /// Message text.
    pub text: String,
}

impl InboundMessage {
    /// Address for replies to this message.
    #[must_use]
    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            conversation_id: self.conversation_id,
            message_id: self.message_id,
        }
    }
}

/// Conversation plus the message a reply is threaded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    /// Conversation to send into.
    pub conversation_id: i64,
    /// Message to reply to.
    pub message_id: i32,
}

/// Failure reported by the chat transport when sending.
#[derive(Debug, Error)]
#[error("chat delivery failed: {source}")]
pub struct DeliveryError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl DeliveryError {
    /// Wraps a transport error.
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Sends `text` as a reply to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the transport rejects the send.
    async fn send_text(&self, target: ReplyTarget, text: &str) -> Result<(), DeliveryError>;

    /// Sends the file at `path` as an audio reply to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the file cannot be uploaded.
    async fn send_file(&self, target: ReplyTarget, path: &Path) -> Result<(), DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_target_uses_message_id() {
        let message = InboundMessage {
            conversation_id: -100,
            message_id: 42,
            reply_to_message_id: Some(7),
            sender_name: "alice".to_string(),
            text: "hi".to_string(),
        };
        assert_eq!(
            message.reply_target(),
            ReplyTarget {
                conversation_id: -100,
                message_id: 42
            }
        );
    }

    #[test]
    fn test_delivery_error_wraps_message() {
        let error = DeliveryError::new("flood control");
        assert!(error.to_string().contains("flood control"));
    }
}
