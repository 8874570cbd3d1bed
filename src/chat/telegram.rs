//! Telegram Bot API transport (long polling) built on teloxide.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use teloxide::Bot;
use teloxide::payloads::{GetUpdatesSetters, SendAudioSetters, SendMessageSetters};
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, InputFile, MessageId, ReplyParameters, UpdateKind};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{ChatSink, DeliveryError, InboundMessage, ReplyTarget};
use crate::app::{Dispatcher, Outcome};

/// Long-poll timeout passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u32 = 30;

/// Pause after a failed `getUpdates` call before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Connects to the Bot API, verifies the token, and clears any webhook.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be built or the Bot API
/// rejects the token.
pub async fn connect(token: &SecretString) -> anyhow::Result<Bot> {
    // Client timeout must exceed the long-poll timeout or polls abort early.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 15))
        .build()?;
    let bot = Bot::with_client(token.expose_secret(), client);

    let me = bot.get_me().await?;
    info!(username = ?me.username, "Authorized on bot account");

    bot.delete_webhook().await?;
    Ok(bot)
}

/// [`ChatSink`] sending replies through a Telegram bot.
#[derive(Debug, Clone)]
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    /// Wraps a connected bot.
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn reply_parameters(target: ReplyTarget) -> ReplyParameters {
    ReplyParameters::new(MessageId(target.message_id)).allow_sending_without_reply()
}

#[async_trait]
impl ChatSink for TelegramSink {
    async fn send_text(&self, target: ReplyTarget, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(target.conversation_id), text)
            .reply_parameters(reply_parameters(target))
            .await
            .map_err(DeliveryError::new)?;
        Ok(())
    }

    async fn send_file(&self, target: ReplyTarget, path: &Path) -> Result<(), DeliveryError> {
        self.bot
            .send_audio(
                ChatId(target.conversation_id),
                InputFile::file(path.to_path_buf()),
            )
            .reply_parameters(reply_parameters(target))
            .await
            .map_err(DeliveryError::new)?;
        Ok(())
    }
}

/// Converts a Telegram message into an [`InboundMessage`].
///
/// Messages without text (stickers, media, service messages) yield `None`.
#[must_use]
pub fn inbound_from_message(msg: &Message) -> Option<InboundMessage> {
    let text = msg.text()?;
    let sender_name = msg
        .from
        .as_ref()
        .map(|user| user.username.clone().unwrap_or_else(|| user.full_name()))
        .unwrap_or_default();
    Some(InboundMessage {
        conversation_id: msg.chat.id.0,
        message_id: msg.id.0,
        reply_to_message_id: msg.reply_to_message().map(|reply| reply.id.0),
        sender_name,
        text: text.to_string(),
    })
}

/// Consumes updates in order and hands each text message to `dispatcher`.
///
/// Runs until Ctrl-C, then waits for in-flight runs to finish.
///
/// # Errors
///
/// Returns an error only if the shutdown signal cannot be installed.
pub async fn run_polling(bot: Bot, dispatcher: Dispatcher) -> anyhow::Result<()> {
    let mut offset: i32 = 0;
    let mut in_flight: Vec<JoinHandle<Outcome>> = Vec::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("starting telegram polling loop");
    loop {
        let poll = bot
            .get_updates()
            .offset(offset)
            .timeout(POLL_TIMEOUT_SECS)
            .allowed_updates(vec![AllowedUpdate::Message]);

        let result = tokio::select! {
            signal = &mut shutdown => {
                signal?;
                info!(in_flight = in_flight.len(), "shutdown requested");
                break;
            }
            result = poll.send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    let UpdateKind::Message(msg) = update.kind else {
                        continue;
                    };
                    let Some(inbound) = inbound_from_message(&msg) else {
                        continue;
                    };
                    if let Some(handle) = dispatcher.dispatch(inbound).await {
                        in_flight.push(handle);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "telegram getUpdates failed");
                tokio::time::sleep(POLL_ERROR_BACKOFF).await;
            }
        }
        in_flight.retain(|handle| !handle.is_finished());
    }

    for handle in in_flight {
        if let Err(e) = handle.await {
            error!(error = %e, "request task panicked");
        }
    }
    Ok(())
}
