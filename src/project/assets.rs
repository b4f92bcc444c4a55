//! `raft load-reference`, `raft load-metadata` and `raft update-mounts`

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{MountManifest, ProjectLayout};
use crate::context::RaftContext;
use crate::error::RaftError;
use crate::fs_ops;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LoadMode {
    /// Link the shared file and bind its location into containers
    #[default]
    Symlink,
    /// Copy the file (or directory) into the project
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Reference,
    Metadata,
}

impl AssetKind {
    /// Configuration entry holding the shared root for this kind
    pub fn config_key(self) -> &'static str {
        match self {
            AssetKind::Reference => "references",
            AssetKind::Metadata => "metadata",
        }
    }

    pub fn project_dir(self, layout: &ProjectLayout) -> PathBuf {
        match self {
            AssetKind::Reference => layout.references_dir(),
            AssetKind::Metadata => layout.metadata_dir(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadAssetOptions {
    pub kind: AssetKind,
    /// File name, optionally prefixed with directories to disambiguate
    pub file: String,
    pub sub_dir: Option<String>,
    pub mode: LoadMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    Loaded(PathBuf),
    AlreadyPresent(PathBuf),
}

/// Find exactly one entry named `name` anywhere below `root`
pub fn resolve_asset(root: &Path, name: &str) -> Result<PathBuf> {
    let pattern = format!(
        "{}/**/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        name.trim_start_matches('/')
    );
    debug!("Resolving asset with pattern {}", pattern);

    let mut matches = glob::glob(&pattern)
        .with_context(|| format!("Invalid asset pattern {pattern}"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read asset directory")?;
    matches.sort();
    matches.dedup();

    match matches.len() {
        0 => Err(RaftError::AssetNotFound {
            name: name.to_string(),
            root: root.to_path_buf(),
        }
        .into()),
        1 => Ok(matches.remove(0)),
        _ => Err(RaftError::AmbiguousAsset {
            name: name.to_string(),
            matches,
        }
        .into()),
    }
}

/// Bring a shared reference or metadata file into the project.
///
/// Nothing in the project changes unless the name resolves to exactly one
/// match. An existing destination makes the call a no-op.
pub fn load_asset(
    ctx: &RaftContext,
    layout: &ProjectLayout,
    options: &LoadAssetOptions,
) -> Result<AssetOutcome> {
    let root = ctx.fs_path(options.kind.config_key())?;
    let source = resolve_asset(&root, &options.file)?;
    let file_name = source
        .file_name()
        .with_context(|| format!("{} has no file name", source.display()))?;

    let mut dest_dir = options.kind.project_dir(layout);
    if let Some(sub_dir) = options.sub_dir.as_deref().filter(|s| !s.is_empty()) {
        dest_dir = dest_dir.join(sub_dir);
    }
    let dest = dest_dir.join(file_name);

    if fs_ops::path_occupied(&dest) {
        println!("{} already exists in project {}.", dest.display(), layout.id());
        return Ok(AssetOutcome::AlreadyPresent(dest));
    }

    let canonical = source
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", source.display()))?;
    // Symlinked assets need a readable manifest before the project changes
    let mounts = match options.mode {
        LoadMode::Symlink => Some(MountManifest::load(&layout.mounts_config())?),
        LoadMode::Copy => None,
    };

    std::fs::create_dir_all(&dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

    match mounts {
        Some(mut mounts) => {
            fs_ops::symlink(&canonical, &dest)?;
            if mounts.add(&canonical) {
                if let Err(e) = mounts.save() {
                    fs_ops::remove_path(&dest)?;
                    return Err(e);
                }
            }
        }
        None => fs_ops::copy_recursive(&canonical, &dest)?,
    }

    info!("Loaded {} into {}", canonical.display(), dest.display());
    println!("Loaded {} to {}", canonical.display(), dest.display());
    Ok(AssetOutcome::Loaded(dest))
}

/// Bind the real location of everything below `dir` into containers
pub fn update_mounts(layout: &ProjectLayout, dir: &Path) -> Result<usize> {
    let mut parents = BTreeSet::new();
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let real = match entry.path().canonicalize() {
            Ok(real) => real,
            Err(e) => {
                debug!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if let Some(parent) = real.parent() {
            parents.insert(parent.to_path_buf());
        }
    }

    let added = MountManifest::extend_file(&layout.mounts_config(), &parents)?;
    println!("Added {added} path(s) to {}", layout.mounts_config().display());
    Ok(added)
}
