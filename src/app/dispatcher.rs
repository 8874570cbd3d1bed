//! Sequential intake of inbound messages; one spawned task per accepted link.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::context::{Outcome, RequestContext};
use super::orchestrator::RequestOrchestrator;
use crate::chat::InboundMessage;
use crate::failure::{ACCEPTED_TEXT, Failure};
use crate::parser::match_reference;

/// Accepts messages in arrival order and spawns a run per supported link.
///
/// Unsupported messages are rejected inline and never reach the resolver.
#[derive(Clone)]
pub struct Dispatcher {
    orchestrator: Arc<RequestOrchestrator>,
}

impl Dispatcher {
    /// Creates a dispatcher over a shared orchestrator.
    #[must_use]
    pub fn new(orchestrator: Arc<RequestOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Handles one inbound message.
    ///
    /// Returns the spawned task's handle when the message holds a supported
    /// link, `None` when it was rejected inline.
    pub async fn dispatch(&self, message: InboundMessage) -> Option<JoinHandle<Outcome>> {
        info!(sender = %message.sender_name, text = %message.text.trim(), "inbound message");
        let mut ctx = RequestContext::new(&message);

        let Some(reference) = match_reference(&message.text) else {
            self.orchestrator.reject(&mut ctx, &Failure::Unsupported).await;
            return None;
        };

        if let Err(e) = self
            .orchestrator
            .sink()
            .send_text(ctx.reply_target, ACCEPTED_TEXT)
            .await
        {
            warn!(
                conversation_id = ctx.conversation_id,
                error = %e,
                "failed to acknowledge request"
            );
        }
        info!(reference = %reference, "Download music");

        let orchestrator = Arc::clone(&self.orchestrator);
        Some(tokio::spawn(async move { orchestrator.run(ctx, reference).await }))
    }
}
