//! Exported chat transcript source
//!
//! Reads a chat export (one message per header line, continuation lines
//! appended to the previous message) and reveals it newest-first, one window
//! per step, the way scrolling up through a group conversation does.
//!
//! Accepted header shapes:
//!
//! ```text
//! 12/03/2024, 10:15 - Pastor Luis: Prédica de hoy https://youtu.be/abc
//! [12/03/24, 10:15:02] Pastor Luis: https://youtu.be/abc
//! ```

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

use super::{HarvestSession, HarvestSource, RawCandidate};
use crate::utils::error::HarvestError;

fn header_pattern() -> &'static Regex {
    static HEADER_RE: OnceLock<Regex> = OnceLock::new();
    HEADER_RE.get_or_init(|| {
        Regex::new(
            r"^\[?(\d{1,2}/\d{1,2}/\d{2,4}),?\s+(\d{1,2}:\d{2}(?::\d{2})?(?:\s?[APap]\.?\s?[Mm]\.?)?)\]?\s*-?\s*([^:]+?):\s?(.*)$",
        )
        .expect("Invalid regex pattern")
    })
}

/// Parse a chat export into messages, oldest first
pub fn parse_transcript(raw: &str) -> Vec<RawCandidate> {
    let mut messages: Vec<RawCandidate> = Vec::new();

    for line in raw.lines() {
        let line = line.trim_start_matches('\u{feff}');

        if let Some(caps) = header_pattern().captures(line) {
            messages.push(RawCandidate {
                text: caps.get(4).map_or("", |m| m.as_str()).to_string(),
                author: caps.get(3).map(|m| m.as_str().trim().to_string()),
                sent_at: Some(format!(
                    "{} {}",
                    caps.get(1).map_or("", |m| m.as_str()),
                    caps.get(2).map_or("", |m| m.as_str())
                )),
            });
        } else if let Some(last) = messages.last_mut() {
            last.text.push('\n');
            last.text.push_str(line);
        } else if !line.trim().is_empty() {
            messages.push(RawCandidate::text(line));
        }
    }

    messages
}

/// Harvest source over an exported transcript
pub struct ChatExportSource {
    path: PathBuf,
    source_id: String,
    window: usize,
    author: Option<String>,
    /// Messages newest first, loaded on the first fetch
    messages: Option<Vec<RawCandidate>>,
    cursor: usize,
}

impl ChatExportSource {
    /// Create a source revealing `window` messages per step
    pub fn new(path: impl AsRef<Path>, source_id: impl Into<String>, window: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            source_id: source_id.into(),
            window: window.max(1),
            author: None,
            messages: None,
            cursor: 0,
        }
    }

    /// Only keep messages sent by `author`
    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author.map(|a| a.trim().to_lowercase());
        self
    }

    async fn ensure_loaded(&mut self) -> Result<&[RawCandidate], HarvestError> {
        if self.messages.is_none() {
            let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
                HarvestError::SourceUnavailable(format!("{}: {e}", self.path.display()))
            })?;

            let mut messages = parse_transcript(&raw);
            if let Some(author) = &self.author {
                messages.retain(|m| {
                    m.author
                        .as_deref()
                        .is_some_and(|a| a.to_lowercase() == *author)
                });
            }
            messages.reverse();

            debug!(path = %self.path.display(), messages = messages.len(), "Transcript loaded");
            self.messages = Some(messages);
        }

        Ok(self.messages.as_deref().unwrap_or(&[]))
    }
}

#[async_trait]
impl HarvestSource for ChatExportSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch_next_batch(
        &mut self,
        session: &HarvestSession,
    ) -> Result<Vec<RawCandidate>, HarvestError> {
        let window = self.window;
        let cursor = self.cursor;
        let messages = self.ensure_loaded().await?;

        let end = (cursor + window).min(messages.len());
        let batch = messages[cursor.min(end)..end].to_vec();
        self.cursor = end;

        debug!(session = %session.id, revealed = batch.len(), "Revealed transcript window");
        Ok(batch)
    }
}
