//! Per-request pipeline: resolve, cache-check, policy-check, fetch, deliver.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::context::{Outcome, RequestContext, Stage};
use crate::cache::{ArtifactStore, CacheLookup};
use crate::chat::ChatSink;
use crate::download::{Fetcher, PathLocks, check_size_policy};
use crate::failure::{self, Failure, FailureReport, Reporter};
use crate::parser::{MediaReference, match_reference};
use crate::resolver::{MediaDescriptor, MetadataResolver};

/// Drives one request from a matched reference to a terminal [`Outcome`].
///
/// Shared by all runs behind an `Arc`; holds no per-request mutable state.
pub struct RequestOrchestrator {
    resolver: Arc<dyn MetadataResolver>,
    store: ArtifactStore,
    fetcher: Fetcher,
    sink: Arc<dyn ChatSink>,
    locks: PathLocks,
    size_ceiling: u64,
    reporter: Reporter,
}

impl RequestOrchestrator {
    /// Creates an orchestrator using the default [`failure::report`] mapping.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        store: ArtifactStore,
        fetcher: Fetcher,
        sink: Arc<dyn ChatSink>,
        size_ceiling: u64,
    ) -> Self {
        Self {
            resolver,
            store,
            fetcher,
            sink,
            locks: PathLocks::new(),
            size_ceiling,
            reporter: failure::report,
        }
    }

    /// Replaces the failure reporting function.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Returns the chat sink replies are sent through.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn ChatSink> {
        &self.sink
    }

    /// Runs the whole pipeline for `ctx`, matching its text first.
    pub async fn handle(&self, mut ctx: RequestContext) -> Outcome {
        match match_reference(&ctx.text) {
            Some(reference) => self.run(ctx, reference).await,
            None => self.reject(&mut ctx, &Failure::Unsupported).await,
        }
    }

    /// Runs the pipeline for an already matched reference.
    #[instrument(
        skip(self, ctx),
        fields(conversation_id = ctx.conversation_id, sender = %ctx.sender_name)
    )]
    pub async fn run(&self, mut ctx: RequestContext, reference: MediaReference) -> Outcome {
        ctx.advance(Stage::Matched);

        let descriptor = match self.resolver.resolve(&reference).await {
            Ok(descriptor) => descriptor,
            Err(e) => return self.reject(&mut ctx, &Failure::from(e)).await,
        };
        ctx.advance(Stage::Resolved);

        match self.obtain_artifact(&mut ctx, &descriptor).await {
            Ok((path, from_cache)) => self.deliver(&mut ctx, path, from_cache).await,
            Err(failure) => self.reject(&mut ctx, &failure).await,
        }
    }

    /// Cache-checks and, on a miss, fetches while holding the artifact's path lock.
    async fn obtain_artifact(
        &self,
        ctx: &mut RequestContext,
        descriptor: &MediaDescriptor,
    ) -> Result<(PathBuf, bool), Failure> {
        let path = self.store.artifact_path(descriptor);
        let _guard = self.locks.acquire(&path).await;

        let lookup = self.store.lookup(descriptor).await;
        ctx.advance(Stage::CacheChecked);
        if let CacheLookup::Hit(path) = lookup {
            return Ok((path, true));
        }

        check_size_policy(descriptor, self.size_ceiling)?;
        ctx.advance(Stage::PolicyChecked);

        self.fetcher.fetch(descriptor, &path, self.size_ceiling).await?;
        ctx.advance(Stage::Fetched);
        Ok((path, false))
    }

    async fn deliver(
        &self,
        ctx: &mut RequestContext,
        path: PathBuf,
        from_cache: bool,
    ) -> Outcome {
        if let Err(e) = self.sink.send_file(ctx.reply_target, &path).await {
            error!(
                conversation_id = ctx.conversation_id,
                sender = %ctx.sender_name,
                path = %path.display(),
                error = %e,
                "failed to send artifact"
            );
            if let Err(e) = self
                .sink
                .send_text(ctx.reply_target, failure::DELIVERY_FAILED_TEXT)
                .await
            {
                warn!(
                    conversation_id = ctx.conversation_id,
                    error = %e,
                    "failed to send error reply"
                );
            }
        }
        ctx.advance(Stage::Delivered);
        info!(path = %path.display(), from_cache, "request delivered");
        Outcome::Delivered { path, from_cache }
    }

    /// Sends the failure's chat text and logs its detail.
    pub async fn reject(&self, ctx: &mut RequestContext, failure: &Failure) -> Outcome {
        let report = (self.reporter)(failure);
        log_failure(ctx, &report);
        if let Err(e) = self.sink.send_text(ctx.reply_target, &report.chat_text).await {
            warn!(
                conversation_id = ctx.conversation_id,
                error = %e,
                "failed to send error reply"
            );
        }
        ctx.advance(Stage::Rejected);
        Outcome::Rejected(report.log.kind)
    }
}

fn log_failure(ctx: &RequestContext, report: &FailureReport) {
    error!(
        conversation_id = ctx.conversation_id,
        sender = %ctx.sender_name,
        stage = %ctx.stage(),
        kind = %report.log.kind,
        category = ?report.log.category,
        cause = report.log.cause.as_deref().unwrap_or(""),
        "{}",
        report.chat_text
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;
    use url::Url;

    use super::*;
    use crate::chat::{DeliveryError, InboundMessage, ReplyTarget};
    use crate::failure::FailureKind;
    use crate::resolver::ResolutionError;

    struct StaticResolver {
        size: u64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataResolver for StaticResolver {
        async fn resolve(
            &self,
            _reference: &MediaReference,
        ) -> Result<MediaDescriptor, ResolutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(MediaDescriptor {
                id: "ABC123".to_string(),
                extension: "m4a".to_string(),
                // Unroutable: any fetch attempt fails as Transport.
                source_url: Url::parse("http://127.0.0.1:9/x").unwrap(),
                declared_size_bytes: self.size,
                fetch_headers: HashMap::new(),
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        texts: Mutex<Vec<String>>,
        files: Mutex<Vec<PathBuf>>,
        reject_uploads: bool,
    }

    #[async_trait]
    impl ChatSink for Recorder {
        async fn send_text(&self, _target: ReplyTarget, text: &str) -> Result<(), DeliveryError> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn send_file(&self, _target: ReplyTarget, path: &Path) -> Result<(), DeliveryError> {
            if self.reject_uploads {
                return Err(DeliveryError::new("upload rejected"));
            }
            self.files.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    fn context(text: &str) -> RequestContext {
        RequestContext::new(&InboundMessage {
            conversation_id: 1,
            message_id: 10,
            reply_to_message_id: None,
            sender_name: "alice".to_string(),
            text: text.to_string(),
        })
    }

    fn orchestrator(
        size: u64,
        root: &Path,
    ) -> (RequestOrchestrator, Arc<StaticResolver>, Arc<Recorder>) {
        let resolver = Arc::new(StaticResolver {
            size,
            calls: AtomicUsize::new(0),
        });
        let sink = Arc::new(Recorder::default());
        let orchestrator = RequestOrchestrator::new(
            resolver.clone(),
            ArtifactStore::new(root),
            Fetcher::new().unwrap(),
            sink.clone(),
            33_554_432,
        );
        (orchestrator, resolver, sink)
    }

    #[tokio::test]
    async fn test_unsupported_text_skips_resolver() {
        let temp = TempDir::new().unwrap();
        let (orchestrator, resolver, sink) = orchestrator(5, temp.path());

        let outcome = orchestrator.handle(context("hello there")).await;

        assert_eq!(outcome, Outcome::Rejected(FailureKind::UnsupportedRequest));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            sink.texts.lock().unwrap().as_slice(),
            ["Sorry, I can only handle single YouTube URL at a time"]
        );
    }

    #[tokio::test]
    async fn test_cache_hit_delivers_without_fetch() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("ABC123.m4a"), b"12345").unwrap();
        let (orchestrator, _resolver, sink) = orchestrator(5, temp.path());

        let outcome = orchestrator
            .handle(context("https://www.youtube.com/watch?v=ABC123"))
            .await;

        assert_eq!(
            outcome,
            Outcome::Delivered {
                path: temp.path().join("ABC123.m4a"),
                from_cache: true
            }
        );
        assert_eq!(sink.files.lock().unwrap().len(), 1);
        assert!(sink.texts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_tells_the_conversation() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("ABC123.m4a"), b"12345").unwrap();
        let sink = Arc::new(Recorder {
            reject_uploads: true,
            ..Recorder::default()
        });
        let orchestrator = RequestOrchestrator::new(
            Arc::new(StaticResolver {
                size: 5,
                calls: AtomicUsize::new(0),
            }),
            ArtifactStore::new(temp.path()),
            Fetcher::new().unwrap(),
            sink.clone(),
            33_554_432,
        );

        let outcome = orchestrator
            .handle(context("https://www.youtube.com/watch?v=ABC123"))
            .await;

        assert!(matches!(outcome, Outcome::Delivered { from_cache: true, .. }));
        assert!(sink.files.lock().unwrap().is_empty());
        assert_eq!(
            sink.texts.lock().unwrap().as_slice(),
            [failure::DELIVERY_FAILED_TEXT]
        );
    }

    #[tokio::test]
    async fn test_too_large_rejected_before_fetch() {
        let temp = TempDir::new().unwrap();
        let (orchestrator, _resolver, sink) = orchestrator(40_000_000, temp.path());

        let outcome = orchestrator
            .handle(context("www.youtube.com/watch?v=ABC123"))
            .await;

        assert_eq!(outcome, Outcome::Rejected(FailureKind::TooLarge));
        assert_eq!(
            sink.texts.lock().unwrap().as_slice(),
            ["Sorry, the audio file size is larger than 32MB."]
        );
    }

    #[tokio::test]
    async fn test_custom_reporter_is_used() {
        fn terse(failure: &Failure) -> FailureReport {
            let mut report = failure::report(failure);
            report.chat_text = format!("nope ({})", report.log.kind);
            report
        }

        let temp = TempDir::new().unwrap();
        let (orchestrator, _resolver, sink) = orchestrator(5, temp.path());
        let orchestrator = orchestrator.with_reporter(terse);

        orchestrator.handle(context("")).await;

        assert_eq!(
            sink.texts.lock().unwrap().as_slice(),
            ["nope (UnsupportedRequest)"]
        );
    }
}
