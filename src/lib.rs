//! Audio Relay Library
//!
//! Core of a chat bot that turns a YouTube watch link into an audio file
//! reply: match the link, resolve it through an external resolver process,
//! reuse a cached artifact or fetch it over HTTP, and send it back.
//!
//! # Architecture
//!
//! - [`parser`] - Recognition of the single supported link shape
//! - [`resolver`] - Resolver subprocess client and typed descriptor decoding
//! - [`cache`] - Flat artifact directory with size-equality cache check
//! - [`download`] - Size policy, HTTP fetch, per-path fetch locks
//! - [`app`] - Per-request orchestration and concurrent dispatch
//! - [`failure`] - Failure taxonomy and chat/log reporting
//! - [`chat`] - Chat transport seam and Telegram implementation
//! - [`config`] - JSON configuration loaded once at startup

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod cache;
pub mod chat;
pub mod config;
pub mod download;
pub mod failure;
pub mod parser;
pub mod resolver;
mod user_agent;

// Re-export commonly used types
pub use app::{Dispatcher, Outcome, RequestContext, RequestOrchestrator, Stage};
pub use cache::{ArtifactStore, CacheLookup};
pub use chat::{ChatSink, DeliveryError, InboundMessage, ReplyTarget};
pub use config::{ConfigError, RelayConfig};
pub use download::{FetchError, Fetcher, PathLocks, check_size_policy};
pub use failure::{Failure, FailureKind, FailureReport, report};
pub use parser::{MediaReference, match_reference};
pub use resolver::{MediaDescriptor, MetadataResolver, ProcessResolver, ResolutionError};
