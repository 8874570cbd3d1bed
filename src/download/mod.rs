//! Conditional HTTP fetch of resolved media into the artifact store.
//!
//! # Features
//!
//! - Size ceiling enforced on the declared size before any request
//! - Resolver-supplied request headers (the origin may reject default clients)
//! - Streaming body to a staging file, atomically renamed on success
//! - Per-path locking so duplicate requests never fetch the same file concurrently
//! - No retries; a failed fetch is terminal for its request

mod client;
mod constants;
mod error;
mod locks;

pub use client::{Fetcher, check_size_policy};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::FetchError;
pub use locks::{PathGuard, PathLocks};
