//! A project's main workflow file and its insertion markers

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::params;
use super::scanner::{classify, Token};
use crate::error::RaftError;
use crate::fs_ops;

pub const INCLUSIONS_MARKER: &str = "/*Inclusions*/";
pub const PARAMETERS_MARKER: &str = "/*Parameters*/";
pub const GENERAL_PARAMETERS_MARKER: &str = "/*General Parameters*/";
pub const FINE_TUNED_PARAMETERS_MARKER: &str = "/*Fine-tuned Parameters*/";

/// Main workflow text, edited in memory and written back in one go
#[derive(Debug, Clone)]
pub struct MainWorkflow {
    path: PathBuf,
    lines: Vec<String>,
}

impl MainWorkflow {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RaftError::MainWorkflowMissing {
                path: path.to_path_buf(),
            }
            .into());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::from_text(path, &text))
    }

    pub fn from_text(path: &Path, text: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains_line(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l.trim() == line.trim())
    }

    /// `call` appears verbatim and not as the tail of a longer identifier
    pub fn contains_call(&self, call: &str) -> bool {
        let text = self.render();
        text.match_indices(call).any(|(idx, _)| {
            text[..idx]
                .chars()
                .next_back()
                .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'))
        })
    }

    pub fn declared_parameters(&self) -> HashSet<String> {
        params::declared(self.lines.iter().map(String::as_str))
    }

    fn marker_position(&self, marker: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.trim() == marker)
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.marker_position(marker).is_some()
    }

    fn require_marker(&self, marker: &str) -> Result<usize> {
        self.marker_position(marker).ok_or_else(|| {
            RaftError::MissingMarker {
                marker: marker.to_string(),
                path: self.path.clone(),
            }
            .into()
        })
    }

    /// Insert `new_lines` directly below `marker`, keeping their order
    pub fn insert_after_marker(&mut self, marker: &str, new_lines: &[String]) -> Result<()> {
        let idx = self.require_marker(marker)?;
        self.lines
            .splice(idx + 1..idx + 1, new_lines.iter().cloned());
        Ok(())
    }

    /// Insert `new_lines` before the `}` closing the unnamed `workflow {` block
    pub fn insert_before_entry_close(&mut self, new_lines: &[String]) -> Result<()> {
        let start = self
            .lines
            .iter()
            .position(|l| classify(l) == Token::EntryWorkflow)
            .ok_or_else(|| RaftError::MissingMarker {
                marker: "workflow {".to_string(),
                path: self.path.clone(),
            })?;
        let close = self.lines[start..]
            .iter()
            .position(|l| classify(l) == Token::Close)
            .map(|offset| start + offset)
            .ok_or_else(|| RaftError::MissingMarker {
                marker: "}".to_string(),
                path: self.path.clone(),
            })?;
        self.lines.splice(close..close, new_lines.iter().cloned());
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// `<file>.bak`, overwritten on every call
    pub fn backup_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.bak", self.path.display()))
    }

    pub fn backup(&self, original: &str) -> Result<PathBuf> {
        let backup = self.backup_path();
        std::fs::write(&backup, original)
            .with_context(|| format!("Failed to write backup {}", backup.display()))?;
        Ok(backup)
    }

    pub fn write(&self) -> Result<()> {
        fs_ops::write_atomic(&self.path, &self.render())
    }
}
