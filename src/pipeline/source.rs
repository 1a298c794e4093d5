//! Payload source abstraction for the one-shot CLI.
//!
//! A decision reads exactly one JSON document: from stdin by default, from a
//! file with `--input`, or from memory in tests.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::PathBuf;

/// Where the decision payload comes from.
pub trait PayloadSource {
    /// Read the whole payload.
    fn read_payload(&mut self) -> Result<String>;

    /// Human-readable name for logging (e.g. "stdin", a file path).
    fn source_name(&self) -> &str;
}

// ============================================================================
// Stdin
// ============================================================================

pub struct StdinSource;

impl PayloadSource for StdinSource {
    fn read_payload(&mut self) -> Result<String> {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read payload from stdin")?;
        Ok(buf)
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

// ============================================================================
// File
// ============================================================================

pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl PayloadSource for FileSource {
    fn read_payload(&mut self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read payload from {}", self.name))
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Fixed payload, yielded once.
pub struct InlineSource {
    payload: Option<String>,
}

impl InlineSource {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }
}

impl PayloadSource for InlineSource {
    fn read_payload(&mut self) -> Result<String> {
        self.payload
            .take()
            .context("Inline payload already consumed")
    }

    fn source_name(&self) -> &str {
        "inline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_yields_once() {
        let mut src = InlineSource::new("{}");
        assert_eq!(src.read_payload().unwrap(), "{}");
        assert!(src.read_payload().is_err());
    }

    #[test]
    fn file_source_reads_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.json");
        std::fs::write(&path, "{\"a\": 1}").unwrap();
        let mut src = FileSource::new(&path);
        assert_eq!(src.read_payload().unwrap(), "{\"a\": 1}");

        let mut missing = FileSource::new(dir.path().join("nope.json"));
        let err = missing.read_payload().unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
