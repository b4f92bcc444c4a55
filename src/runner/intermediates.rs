//! Intermediate files left in the engine's work directory

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_SUFFIXES: [&str; 6] = ["bam", "sam", "fastq", "fq", "fastq.gz", "fq.gz"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntermediateReport {
    pub files: Vec<PathBuf>,
    pub bytes: u64,
    pub deleted: bool,
}

fn has_suffix(path: &Path, suffixes: &[String]) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    suffixes
        .iter()
        .any(|suffix| name.ends_with(&format!(".{}", suffix.trim_start_matches('.'))))
}

/// Regular files (not links) under `work_dir` whose name ends with a suffix
pub fn scan(work_dir: &Path, suffixes: &[String]) -> Result<IntermediateReport> {
    let mut report = IntermediateReport::default();
    if !work_dir.is_dir() {
        return Ok(report);
    }
    for entry in WalkDir::new(work_dir).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", work_dir.display()))?;
        if !entry.file_type().is_file() || !has_suffix(entry.path(), suffixes) {
            continue;
        }
        report.bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        report.files.push(entry.into_path());
    }
    report.files.sort();
    Ok(report)
}

pub fn delete(report: &mut IntermediateReport) -> Result<()> {
    for file in &report.files {
        std::fs::remove_file(file).with_context(|| format!("Failed to remove {}", file.display()))?;
    }
    report.deleted = true;
    Ok(())
}

/// `1536` → `1.5 KiB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
