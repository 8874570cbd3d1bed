//! Resolution of a matched reference into a typed [`MediaDescriptor`].
//!
//! - [`MetadataResolver`] - Async trait the orchestrator resolves through
//! - [`ProcessResolver`] - Implementation running an external resolver subprocess
//! - [`decode_record`] - Schema-checked decode of the resolver's JSON record

mod descriptor;
mod error;
mod process;

pub use descriptor::{MediaDescriptor, decode_record};
pub use error::ResolutionError;
pub use process::{ProcessResolver, RESOLVER_TIMEOUT_SECS};

use async_trait::async_trait;

use crate::parser::MediaReference;

/// Turns a reference into the metadata needed to fetch its media.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolves `reference` into a descriptor.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] variant describing why no descriptor
    /// could be produced.
    async fn resolve(&self, reference: &MediaReference)
    -> Result<MediaDescriptor, ResolutionError>;
}
