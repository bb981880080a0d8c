//! Content folders
//!
//! Primary items are plain `.txt` files in one folder. Secondary items live in
//! a pending folder as `<prefix>-NNN.txt` until they are published and moved
//! to the consumed folder. A secondary file holds caption lines plus one
//! `http(s)://` line with the media reference.

use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ContentConfig;
use crate::models::ContentItem;
use crate::utils::error::SourceError;

/// Result of relocating a secondary item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The file was moved now
    Moved,
    /// The file had already been moved earlier
    AlreadyConsumed,
}

/// Access to primary and secondary content
pub trait ContentSource: Send + Sync {
    /// Ids of all primary items
    fn list_primary(&self) -> Result<Vec<String>, SourceError>;

    /// Read one primary item
    fn read_primary(&self, id: &str) -> Result<ContentItem, SourceError>;

    /// Ids of pending secondary items, in publication order
    fn list_pending(&self) -> Result<Vec<String>, SourceError>;

    /// Read one pending secondary item
    fn read_pending(&self, id: &str) -> Result<ContentItem, SourceError>;

    /// Move a secondary item from pending to consumed (idempotent)
    fn move_to_consumed(&self, id: &str) -> Result<MoveOutcome, SourceError>;

    /// Store a harvested item under `number`, returning its id
    fn write_pending(
        &self,
        number: u32,
        reference: &str,
        caption: &[String],
    ) -> Result<String, SourceError>;

    /// Highest secondary number present in pending or consumed (0 if none)
    fn highest_secondary_number(&self) -> Result<u32, SourceError>;

    /// Number of pending secondary items
    fn pending_count(&self) -> Result<usize, SourceError> {
        Ok(self.list_pending()?.len())
    }
}

/// File-system content source
#[derive(Debug, Clone)]
pub struct FsContentSource {
    primary_dir: PathBuf,
    pending_dir: PathBuf,
    consumed_dir: PathBuf,
    prefix: String,
    width: usize,
    number_re: Regex,
}

impl FsContentSource {
    pub fn new(config: &ContentConfig) -> Self {
        let pattern = format!(r"^{}-(\d+)\.txt$", regex::escape(&config.secondary_prefix));
        Self {
            primary_dir: config.primary_dir.clone(),
            pending_dir: config.pending_dir.clone(),
            consumed_dir: config.consumed_dir.clone(),
            prefix: config.secondary_prefix.clone(),
            width: config.number_width,
            number_re: Regex::new(&pattern).expect("escaped prefix is a valid pattern"),
        }
    }

    /// File name for a secondary number
    pub fn secondary_name(&self, number: u32) -> String {
        format!("{}-{:0width$}.txt", self.prefix, number, width = self.width)
    }

    /// Number encoded in a secondary file name
    pub fn secondary_number(&self, name: &str) -> Option<u32> {
        self.number_re
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    pub fn pending_dir(&self) -> &Path {
        &self.pending_dir
    }

    pub fn consumed_dir(&self) -> &Path {
        &self.consumed_dir
    }
}

impl ContentSource for FsContentSource {
    fn list_primary(&self) -> Result<Vec<String>, SourceError> {
        if !self.primary_dir.is_dir() {
            return Err(SourceError::MissingFolder(self.primary_dir.clone()));
        }

        let mut ids = list_txt(&self.primary_dir)?;
        ids.sort();
        Ok(ids)
    }

    fn read_primary(&self, id: &str) -> Result<ContentItem, SourceError> {
        let body = read_item(&self.primary_dir.join(id), id)?;
        Ok(ContentItem::text(id, body))
    }

    fn list_pending(&self) -> Result<Vec<String>, SourceError> {
        if !self.pending_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut ids = list_txt(&self.pending_dir)?;
        ids.sort_by(|a, b| {
            let key_a = (self.secondary_number(a).unwrap_or(u32::MAX), a);
            let key_b = (self.secondary_number(b).unwrap_or(u32::MAX), b);
            key_a.cmp(&key_b)
        });
        Ok(ids)
    }

    fn read_pending(&self, id: &str) -> Result<ContentItem, SourceError> {
        let content = read_item(&self.pending_dir.join(id), id)?;
        let (reference, caption) = parse_secondary(id, &content)?;
        Ok(ContentItem::link(id, reference, caption))
    }

    fn move_to_consumed(&self, id: &str) -> Result<MoveOutcome, SourceError> {
        let from = self.pending_dir.join(id);
        let to = self.consumed_dir.join(id);

        if !from.exists() {
            if to.exists() {
                debug!(item = id, "Item already consumed");
                return Ok(MoveOutcome::AlreadyConsumed);
            }
            return Err(SourceError::ItemNotFound(id.to_string()));
        }

        fs::create_dir_all(&self.consumed_dir)
            .map_err(|e| SourceError::io(&self.consumed_dir, e))?;
        fs::rename(&from, &to).map_err(|e| SourceError::io(&from, e))?;

        info!(item = id, "Moved item to consumed");
        Ok(MoveOutcome::Moved)
    }

    fn write_pending(
        &self,
        number: u32,
        reference: &str,
        caption: &[String],
    ) -> Result<String, SourceError> {
        fs::create_dir_all(&self.pending_dir).map_err(|e| SourceError::io(&self.pending_dir, e))?;

        let name = self.secondary_name(number);
        let path = self.pending_dir.join(&name);

        let mut content = String::new();
        for line in caption {
            content.push_str(line);
            content.push('\n');
        }
        content.push_str(reference);
        content.push('\n');

        fs::write(&path, content).map_err(|e| SourceError::io(&path, e))?;
        debug!(item = %name, "Stored harvested item");
        Ok(name)
    }

    fn highest_secondary_number(&self) -> Result<u32, SourceError> {
        let mut highest = 0;
        for dir in [&self.pending_dir, &self.consumed_dir] {
            if !dir.is_dir() {
                continue;
            }
            for name in list_txt(dir)? {
                if let Some(n) = self.secondary_number(&name) {
                    highest = highest.max(n);
                }
            }
        }
        Ok(highest)
    }
}

/// Names of the `.txt` files in a folder
fn list_txt(dir: &Path) -> Result<Vec<String>, SourceError> {
    let entries = fs::read_dir(dir).map_err(|e| SourceError::io(dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SourceError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

fn read_item(path: &Path, id: &str) -> Result<String, SourceError> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SourceError::ItemNotFound(id.to_string()),
        _ => SourceError::io(path, e),
    })?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SourceError::EmptyItem(id.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Split a secondary file into its reference and caption lines
pub fn parse_secondary(id: &str, content: &str) -> Result<(String, Vec<String>), SourceError> {
    let mut reference = None;
    let mut caption = Vec::new();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();
        if reference.is_none() && (lower.starts_with("http://") || lower.starts_with("https://")) {
            reference = Some(line.to_string());
        } else {
            caption.push(line.to_string());
        }
    }

    let reference = reference.ok_or_else(|| SourceError::Malformed {
        id: id.to_string(),
        reason: "no http(s) reference line".to_string(),
    })?;
    Ok((reference, caption))
}
