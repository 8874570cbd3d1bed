//! Shared helpers for integration tests: stub resolver scripts and a
//! recording chat sink.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use audio_relay::{
    ArtifactStore, ChatSink, DeliveryError, Fetcher, InboundMessage, ProcessResolver,
    ReplyTarget, RequestOrchestrator,
};
use tempfile::TempDir;

/// Default size ceiling (32 MiB).
pub const CEILING: u64 = 33_554_432;

/// Something the relay sent back to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text { target: ReplyTarget, text: String },
    File { target: ReplyTarget, path: PathBuf, bytes: Vec<u8> },
}

/// Chat sink that records every send, reading file contents at send time.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("sink lock").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                Sent::File { .. } => None,
            })
            .collect()
    }

    pub fn files(&self) -> Vec<(ReplyTarget, Vec<u8>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::File { target, bytes, .. } => Some((target, bytes)),
                Sent::Text { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatSink for RecordingSink {
    async fn send_text(&self, target: ReplyTarget, text: &str) -> Result<(), DeliveryError> {
        self.sent.lock().expect("sink lock").push(Sent::Text {
            target,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_file(&self, target: ReplyTarget, path: &Path) -> Result<(), DeliveryError> {
        let bytes = tokio::fs::read(path).await.map_err(DeliveryError::new)?;
        self.sent.lock().expect("sink lock").push(Sent::File {
            target,
            path: path.to_path_buf(),
            bytes,
        });
        Ok(())
    }
}

/// Writes a shell script standing in for the resolver and returns a resolver
/// running it through `/bin/sh` (no exec bit needed).
///
/// The script records its arguments to `args.txt` next to itself.
pub fn script_resolver(dir: &Path, body: &str) -> ProcessResolver {
    let script = dir.join("resolver.sh");
    let args_file = dir.join("args.txt");
    let contents = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\n{body}\n",
        args_file.display()
    );
    std::fs::write(&script, contents).expect("write resolver script");
    ProcessResolver::new("/bin/sh").with_leading_args(vec![script.display().to_string()])
}

/// Resolver script printing `json` and exiting 0.
pub fn json_resolver(dir: &Path, json: &str) -> ProcessResolver {
    script_resolver(dir, &format!("cat <<'JSON'\n{json}\nJSON"))
}

/// Resolver record as emitted for the `ABC123` video, pointing at `url`.
pub fn abc123_record(url: &str, filesize: u64) -> String {
    format!(
        r#"{{"id":"ABC123","ext":"m4a","url":"{url}","filesize":{filesize},"http_headers":{{"User-Agent":"UA"}}}}"#
    )
}

/// Inbound message carrying `text` from `alice` in conversation 77.
pub fn message(message_id: i32, text: &str) -> InboundMessage {
    InboundMessage {
        conversation_id: 77,
        message_id,
        reply_to_message_id: None,
        sender_name: "alice".to_string(),
        text: text.to_string(),
    }
}

/// Temp dirs kept alive for one test: resolver scripts and artifact storage.
pub struct Harness {
    pub scripts: TempDir,
    pub storage: TempDir,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            scripts: TempDir::new().expect("scripts dir"),
            storage: TempDir::new().expect("storage dir"),
            sink: Arc::new(RecordingSink::default()),
        }
    }

    pub fn orchestrator(&self, resolver: ProcessResolver) -> Arc<RequestOrchestrator> {
        Arc::new(RequestOrchestrator::new(
            Arc::new(resolver),
            ArtifactStore::new(self.storage.path()),
            Fetcher::new().expect("http client"),
            self.sink.clone(),
            CEILING,
        ))
    }

    pub fn artifact(&self, name: &str) -> PathBuf {
        self.storage.path().join(name)
    }
}
