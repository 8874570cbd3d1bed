//! Per-request state carried through one orchestration run.

use std::fmt;
use std::path::PathBuf;

use crate::chat::{InboundMessage, ReplyTarget};
use crate::failure::FailureKind;

/// Pipeline stage a request has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    Matched,
    Resolved,
    CacheChecked,
    PolicyChecked,
    Fetched,
    Delivered,
    Rejected,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Received => "received",
            Self::Matched => "matched",
            Self::Resolved => "resolved",
            Self::CacheChecked => "cache_checked",
            Self::PolicyChecked => "policy_checked",
            Self::Fetched => "fetched",
            Self::Delivered => "delivered",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Transient state of one request; dropped when its run ends.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub conversation_id: i64,
    /// Message the replies are threaded under.
    pub reply_target: ReplyTarget,
    pub sender_name: String,
    pub text: String,
    stage: Stage,
}

impl RequestContext {
    /// Starts a context for `message` at [`Stage::Received`].
    #[must_use]
    pub fn new(message: &InboundMessage) -> Self {
        Self {
            conversation_id: message.conversation_id,
            reply_target: message.reply_target(),
            sender_name: message.sender_name.clone(),
            text: message.text.clone(),
            stage: Stage::Received,
        }
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn advance(&mut self, stage: Stage) {
        tracing::debug!(
            conversation_id = self.conversation_id,
            from = %self.stage,
            to = %stage,
            "request stage"
        );
        self.stage = stage;
    }
}

/// Terminal state of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The artifact was sent back to the conversation.
    Delivered {
        /// Artifact that was sent.
        path: PathBuf,
        /// True when no fetch was needed.
        from_cache: bool,
    },
    /// The request ended in a reported failure.
    Rejected(FailureKind),
}
