//! Audit log snapshots shipped inside an rftpkg
//!
//! `snapshot.raft.actual` is the audit log as recorded. `snapshot.raft` has
//! the commented `add-step` entries enabled so the package can be replayed.

pub const SNAPSHOT_ACTUAL: &str = "snapshot.raft.actual";
pub const SNAPSHOT: &str = "snapshot.raft";

fn is_commented_add_step(line: &str) -> bool {
    line.strip_prefix('#')
        .map(|rest| rest.split_whitespace().nth(1) == Some("add-step"))
        .unwrap_or(false)
}

pub fn replayable(audit_log: &str) -> String {
    let mut out = String::with_capacity(audit_log.len());
    for line in audit_log.lines() {
        if is_commented_add_step(line) {
            out.push_str(&line[1..]);
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Project id recorded by the `init-project` entry of a snapshot
pub fn initial_project_id(snapshot: &str) -> Option<String> {
    let line = snapshot
        .lines()
        .find(|line| line.split_whitespace().nth(1) == Some("init-project"))?;
    let words = shell_words::split(line).ok()?;
    words.iter().enumerate().find_map(|(idx, word)| {
        if word == "-p" || word == "--project-id" {
            words.get(idx + 1).cloned()
        } else {
            word.strip_prefix("--project-id=").map(str::to_string)
        }
    })
}
