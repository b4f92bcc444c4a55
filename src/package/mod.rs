//! rftpkg: a project snapshot as a tar archive
//!
//! An rftpkg holds `metadata/`, `workflow/`, a `checksums` manifest and the
//! audit log (`snapshot.raft.actual`, plus its replayable `snapshot.raft`).
//! Packages live in the project's `rftpkgs` directory, which is a git
//! repository so they can be pushed and pulled.

pub mod checksums;
pub mod load;
pub mod remote;
pub mod snapshot;

use anyhow::{Context, Result};
use rand::Rng;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::write_json_pretty;
use crate::fs_ops;
use crate::project::ProjectLayout;

pub use load::{load_project, LoadProjectOptions};
pub use remote::{pull_project, push_project, PushOptions};

pub const EXTENSION: &str = "rftpkg";
pub const CHECKSUMS_FILE: &str = "checksums";

#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Package name (default: the project id)
    pub output: Option<String>,
    /// Leave hidden entries (git checkouts) of `workflow/` out
    pub no_git: bool,
    pub no_checksums: bool,
}

fn staging_dir(layout: &ProjectLayout) -> PathBuf {
    let suffix: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    layout.tmp_dir().join(suffix)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Copy the files of `from` that are not symlinks; links point at shared
/// data that is described by the checksum manifest instead.
fn copy_owned_files(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).with_context(|| format!("Failed to create {}", to.display()))?;
    if !from.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(from).follow_links(false).min_depth(1) {
        let entry = entry.with_context(|| format!("Failed to walk {}", from.display()))?;
        let target = to.join(entry.path().strip_prefix(from)?);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

fn copy_workflow(from: &Path, to: &Path, no_git: bool) -> Result<()> {
    let walker = WalkDir::new(from)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(no_git && is_hidden(e)));
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", from.display()))?;
        let target = to.join(entry.path().strip_prefix(from)?);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if file_type.is_symlink() {
            fs_ops::symlink(&std::fs::read_link(entry.path())?, &target)?;
        } else {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Write the contents of `staging` as a tar archive at `archive`
pub fn write_archive(staging: &Path, archive: &Path) -> Result<()> {
    let file = File::create(archive)
        .with_context(|| format!("Failed to create {}", archive.display()))?;
    let mut builder = tar::Builder::new(file);
    builder.follow_symlinks(false);

    let mut entries: Vec<PathBuf> = std::fs::read_dir(staging)
        .with_context(|| format!("Failed to read {}", staging.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        let name = path
            .file_name()
            .with_context(|| format!("Unexpected entry {}", path.display()))?;
        let appended = if path.is_dir() {
            builder.append_dir_all(name, &path)
        } else {
            builder.append_path_with_name(&path, name)
        };
        appended.with_context(|| format!("Failed to archive {}", path.display()))?;
    }
    builder
        .into_inner()
        .and_then(|mut file| std::io::Write::flush(&mut file))
        .with_context(|| format!("Failed to finish {}", archive.display()))?;
    Ok(())
}

pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
    std::fs::create_dir_all(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    tar::Archive::new(file)
        .unpack(dest)
        .with_context(|| format!("Failed to unpack {} into {}", archive.display(), dest.display()))
}

fn stage(layout: &ProjectLayout, staging: &Path, options: &PackageOptions) -> Result<()> {
    copy_owned_files(&layout.metadata_dir(), &staging.join("metadata"))?;
    copy_workflow(&layout.workflow_dir(), &staging.join("workflow"), options.no_git)?;

    if options.no_checksums {
        debug!("Skipping checksums");
    } else {
        let sums = checksums::compute(layout)?;
        write_json_pretty(&staging.join(CHECKSUMS_FILE), &sums)?;
    }

    let audit = std::fs::read_to_string(layout.audit_log()).unwrap_or_default();
    std::fs::write(staging.join(snapshot::SNAPSHOT_ACTUAL), &audit)
        .context("Failed to write audit snapshot")?;
    std::fs::write(staging.join(snapshot::SNAPSHOT), snapshot::replayable(&audit))
        .context("Failed to write replayable snapshot")?;
    Ok(())
}

/// `raft package-project`: write `rftpkgs/<name>.rftpkg`
pub fn package_project(layout: &ProjectLayout, options: &PackageOptions) -> Result<PathBuf> {
    let name = options.output.as_deref().unwrap_or(layout.id());
    let name = name.strip_suffix(".rftpkg").unwrap_or(name);
    let archive = layout.rftpkgs_dir().join(format!("{name}.{EXTENSION}"));
    std::fs::create_dir_all(layout.rftpkgs_dir())
        .with_context(|| format!("Failed to create {}", layout.rftpkgs_dir().display()))?;

    let staging = staging_dir(layout);
    std::fs::create_dir_all(&staging)
        .with_context(|| format!("Failed to create {}", staging.display()))?;

    let result = stage(layout, &staging, options).and_then(|()| write_archive(&staging, &archive));
    if let Err(e) = fs_ops::remove_path(&staging) {
        debug!("Failed to remove staging directory: {}", e);
    }
    result?;

    info!("Packaged project {} into {}", layout.id(), archive.display());
    Ok(archive)
}
