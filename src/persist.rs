//! Pluggable persistence of raw message text.
//!
//! Persistence is best-effort: the pipeline logs a failed write and still
//! acknowledges the message, so implementations never need to retry.

use std::{io, path::PathBuf};

use async_trait::async_trait;
use tracing::debug;

/// Durable sink for raw messages, keyed by a caller-derived identifier.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Store `text` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] when the write fails. Callers treat failure
    /// as non-fatal.
    async fn persist(&self, key: &str, text: &str) -> io::Result<()>;
}

/// Writes each message to `<dir>/<key>.hl7`, creating the directory on
/// first use.
pub struct FileDump {
    dir: PathBuf,
}

impl FileDump {
    /// Dump messages under `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }
}

#[async_trait]
impl MessageSink for FileDump {
    async fn persist(&self, key: &str, text: &str) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{key}.hl7"));
        tokio::fs::write(&path, text).await?;
        debug!(path = %path.display(), "message dumped");
        Ok(())
    }
}

/// No-op sink used when no dump target is configured.
pub struct Discard;

#[async_trait]
impl MessageSink for Discard {
    async fn persist(&self, _key: &str, _text: &str) -> io::Result<()> { Ok(()) }
}
