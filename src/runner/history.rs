//! Nextflow run history (`logs/.nextflow/history`)
//!
//! One tab-separated line per run: timestamp, duration, run name, status,
//! revision id, session id and the command line.

use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub duration: String,
    pub run_name: String,
    pub status: String,
    pub revision: String,
    pub session_id: String,
    pub command: String,
}

impl HistoryEntry {
    pub fn succeeded(&self) -> bool {
        self.status == "OK"
    }
}

fn parse_line(line: &str) -> Option<HistoryEntry> {
    let mut fields = line.splitn(7, '\t');
    let mut next = || fields.next().map(|f| f.trim().to_string());
    Some(HistoryEntry {
        timestamp: next()?,
        duration: next()?,
        run_name: next()?,
        status: next()?,
        revision: next()?,
        session_id: next()?,
        command: next().unwrap_or_default(),
    })
}

/// Well-formed entries, oldest first
pub fn parse(text: &str) -> Vec<HistoryEntry> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect()
}

pub fn read(path: &Path) -> Result<Vec<HistoryEntry>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run history {}", path.display()))?;
    Ok(parse(&text))
}

pub fn latest_successful(entries: &[HistoryEntry]) -> Option<&HistoryEntry> {
    entries.iter().rev().find(|entry| entry.succeeded())
}

/// Runs that belong to the same session as `entry`, oldest first
pub fn session_runs<'a>(entries: &'a [HistoryEntry], entry: &HistoryEntry) -> Vec<&'a HistoryEntry> {
    entries
        .iter()
        .filter(|e| e.session_id == entry.session_id)
        .collect()
}
