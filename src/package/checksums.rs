//! Checksum manifest: `projects/<id>/<relative path>` → md5 of the content

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use walkdir::WalkDir;

use crate::project::ProjectLayout;

/// Project subdirectories covered by the manifest
pub const CHECKSUM_DIRS: [&str; 5] = ["outputs", "metadata", "fastqs", "references", "workflow"];

pub type Checksums = BTreeMap<String, String>;

/// Hash every file under the covered directories. Symlinked inputs are
/// followed so the manifest describes the data the project actually used.
pub fn compute(layout: &ProjectLayout) -> Result<Checksums> {
    let mut checksums = Checksums::new();
    for name in CHECKSUM_DIRS {
        let dir = layout.dir(name);
        if !dir.exists() {
            continue;
        }
        let walker = WalkDir::new(&dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git");
        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(layout.root())?;
            let content = std::fs::read(entry.path())
                .with_context(|| format!("Failed to read {}", entry.path().display()))?;
            checksums.insert(
                format!("projects/{}/{}", layout.id(), relative.display()),
                format!("{:x}", md5::compute(&content)),
            );
        }
    }
    Ok(checksums)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_compute_follows_links_and_skips_git() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new("demo", temp.path().join("demo"));
        let shared = temp.path().join("shared.csv");
        std::fs::write(&shared, "a,b\n").unwrap();
        std::fs::create_dir_all(layout.metadata_dir()).unwrap();
        std::os::unix::fs::symlink(&shared, layout.metadata_dir().join("samples.csv")).unwrap();
        std::fs::create_dir_all(layout.workflow_dir().join("alignment/.git")).unwrap();
        std::fs::write(layout.workflow_dir().join("alignment/.git/HEAD"), "ref").unwrap();
        std::fs::write(layout.main_workflow(), "workflow {\n}\n").unwrap();

        let checksums = compute(&layout).unwrap();
        assert_eq!(checksums.len(), 2);
        assert_eq!(
            checksums["projects/demo/metadata/samples.csv"],
            format!("{:x}", md5::compute(b"a,b\n"))
        );
        assert!(checksums.contains_key("projects/demo/workflow/main.nf"));
    }
}
