//! Mount-binding manifest (`workflow/mounts.config`)
//!
//! A single line of comma-separated absolute host paths that the container
//! runtime binds when the engine runs a process. Entries are only ever added.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountManifest {
    path: PathBuf,
    entries: Vec<String>,
}

impl MountManifest {
    /// Start a manifest at `path` with the given bind directories
    pub fn new<I, P>(path: &Path, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut manifest = Self {
            path: path.to_path_buf(),
            entries: Vec::new(),
        };
        for dir in dirs {
            manifest.add(dir.as_ref());
        }
        manifest
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mounts manifest {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            entries: parse_entries(&content),
        })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Add a path unless it is already listed; returns whether it was added
    pub fn add(&mut self, dir: &Path) -> bool {
        let entry = dir.to_string_lossy().to_string();
        if entry.is_empty() || self.entries.contains(&entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn render(&self) -> String {
        format!("{}\n", self.entries.join(","))
    }

    pub fn save(&self) -> Result<()> {
        std::fs::write(&self.path, self.render())
            .with_context(|| format!("Failed to write mounts manifest {}", self.path.display()))
    }

    /// Load the manifest at `path`, add `dirs` and save; returns how many were new
    pub fn extend_file<I, P>(path: &Path, dirs: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut manifest = Self::load(path)?;
        let added = dirs
            .into_iter()
            .filter(|dir| manifest.add(dir.as_ref()))
            .count();
        if added > 0 {
            manifest.save()?;
        }
        tracing::debug!("Added {} path(s) to {}", added, path.display());
        Ok(added)
    }
}

fn parse_entries(content: &str) -> Vec<String> {
    content
        .lines()
        .next()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_single_line() {
        let manifest = MountManifest::new(
            Path::new("/p/mounts.config"),
            ["/raft/projects/demo", "/raft", "/raft"],
        );
        assert_eq!(manifest.render(), "/raft/projects/demo,/raft\n");
    }

    #[test]
    fn test_extend_file_skips_duplicates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mounts.config");
        MountManifest::new(&path, ["/a"]).save().unwrap();

        let added = MountManifest::extend_file(&path, ["/a", "/refs/genome.fa"]).unwrap();
        assert_eq!(added, 1);

        let added = MountManifest::extend_file(&path, ["/refs/genome.fa"]).unwrap();
        assert_eq!(added, 0);

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "/a,/refs/genome.fa\n"
        );
    }

    #[test]
    fn test_load_tolerates_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mounts.config");
        std::fs::write(&path, "").unwrap();
        assert!(MountManifest::load(&path).unwrap().entries().is_empty());
    }
}
