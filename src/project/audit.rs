//! Audit log (`.raft/auto.raft`): one recorded command line per entry

use anyhow::{Context, Result};
use std::io::Write;

use super::ProjectLayout;

/// Append an invocation; `commented` entries are prefixed with `#` so
/// replaying the log does not repeat them.
pub fn record(layout: &ProjectLayout, invocation: &str, commented: bool) -> Result<()> {
    let path = layout.audit_log();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open audit log {}", path.display()))?;

    let prefix = if commented { "#" } else { "" };
    writeln!(file, "{prefix}{invocation}")
        .with_context(|| format!("Failed to append to audit log {}", path.display()))?;
    Ok(())
}

/// Overwrite the log with a single entry
pub fn start(layout: &ProjectLayout, invocation: &str) -> Result<()> {
    let path = layout.audit_log();
    std::fs::write(&path, format!("{invocation}\n"))
        .with_context(|| format!("Failed to write audit log {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_appends_entries() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new("demo", temp.path().join("demo"));
        std::fs::create_dir_all(layout.state_dir()).unwrap();

        start(&layout, "raft init-project -p demo").unwrap();
        record(&layout, "raft load-module -p demo -m alignment", false).unwrap();
        record(&layout, "raft add-step -p demo -m alignment -s align", true).unwrap();

        let content = std::fs::read_to_string(layout.audit_log()).unwrap();
        assert_eq!(
            content,
            "raft init-project -p demo\nraft load-module -p demo -m alignment\n#raft add-step -p demo -m alignment -s align\n"
        );
    }
}
