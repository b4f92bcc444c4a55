//! `raft setup`: install RAFT into a directory

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{
    RaftConfig, INIT_CONFIG_FILE, INIT_WORKFLOW_FILE, NEXTFLOW_CONFIG_TEMPLATE_FILE,
};
use crate::{fs_ops, prompt, templates};

#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// Skip the prompts and accept every default
    pub use_defaults: bool,
}

/// Write the configuration and templates, then create the configured directories
pub fn run_setup(raft_dir: &Path, options: SetupOptions) -> Result<RaftConfig> {
    println!("Setting up RAFT in {}...", raft_dir.display());
    std::fs::create_dir_all(raft_dir)
        .with_context(|| format!("Failed to create {}", raft_dir.display()))?;

    let mut config = RaftConfig::with_defaults(raft_dir);
    if options.use_defaults {
        println!("Using defaults due to -d/--default flag...");
    } else {
        prompt_for_paths(&mut config)?;
        prompt_for_repositories(&mut config)?;
    }

    write_templates(raft_dir)?;

    let cfg_path = RaftConfig::config_path(raft_dir);
    if cfg_path.is_file() {
        let backup = PathBuf::from(format!("{}.orig", cfg_path.display()));
        println!("A configuration file already exists. Moving it to {}.", backup.display());
        std::fs::rename(&cfg_path, &backup)
            .with_context(|| format!("Failed to back up {}", cfg_path.display()))?;
    }

    let saved = config.save(raft_dir)?;
    println!("Saved configuration file to {}", saved.display());

    provision_filesystem(raft_dir, &config)?;
    info!("RAFT setup complete in {}", raft_dir.display());
    println!("Setup complete.");
    Ok(config)
}

fn write_templates(raft_dir: &Path) -> Result<()> {
    let files = [
        (INIT_CONFIG_FILE, templates::INIT_CONFIG),
        (INIT_WORKFLOW_FILE, templates::MAIN_WORKFLOW),
        (NEXTFLOW_CONFIG_TEMPLATE_FILE, templates::NEXTFLOW_CONFIG),
    ];
    for (name, content) in files {
        let path = raft_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Wrote template {}", path.display());
    }
    Ok(())
}

/// Create each configured directory. Directories living outside the
/// installation are linked into it under their basename.
fn provision_filesystem(raft_dir: &Path, config: &RaftConfig) -> Result<()> {
    for dir in config.filesystem.values() {
        if !dir.is_dir() {
            println!("Making {}...", dir.display());
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        if dir.parent() == Some(raft_dir) {
            continue;
        }
        let Some(name) = dir.file_name() else {
            continue;
        };
        let link = raft_dir.join(name);
        if fs_ops::path_occupied(&link) {
            println!("{} already exists.", link.display());
        } else {
            println!("Symlinking {} to {}...", dir.display(), raft_dir.display());
            fs_ops::symlink(dir, &link)?;
        }
    }
    Ok(())
}

/// Expand a leading `~` to the home directory
pub fn expand_home(input: &str) -> PathBuf {
    if input == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(input));
    }
    match (input.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(input),
    }
}

fn prompt_for_paths(config: &mut RaftConfig) -> Result<()> {
    for (name, default) in config.filesystem.iter_mut() {
        let question = format!(
            "Provide a global (among projects) directory for {name} (Default: {}): ",
            default.display()
        );
        if let Some(answer) = prompt::ask(&question)? {
            *default = expand_home(&answer);
        }
    }
    Ok(())
}

fn prompt_for_repositories(config: &mut RaftConfig) -> Result<()> {
    for (name, default) in config.nextflow_repos.iter_mut() {
        let question = format!("\nProvide a repository for Nextflow {name}\n(Default: {default}): ");
        if let Some(answer) = prompt::ask(&question)? {
            *default = answer;
        }
    }

    for (name, default) in config.nextflow_subgroups.iter_mut() {
        let question = format!(
            "\nProvide a comma separated list for {name}\n(Default: {}): ",
            default.join(",")
        );
        if let Some(answer) = prompt::ask(&question)? {
            *default = answer
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_setup_with_defaults_creates_layout() {
        let temp = TempDir::new().unwrap();
        let config = run_setup(temp.path(), SetupOptions { use_defaults: true }).unwrap();

        for key in crate::config::FILESYSTEM_KEYS {
            assert!(temp.path().join(key).is_dir(), "{key} missing");
        }
        assert!(temp.path().join(".init.wf").is_file());
        assert!(temp.path().join(".init.cfg").is_file());
        assert!(temp.path().join(".nextflow.config").is_file());
        assert_eq!(RaftConfig::load(temp.path()).unwrap(), config);
    }

    #[test]
    fn test_setup_backs_up_existing_config() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".raft.cfg"), "{\"old\": true}").unwrap();

        run_setup(temp.path(), SetupOptions { use_defaults: true }).unwrap();

        let backup = std::fs::read_to_string(temp.path().join(".raft.cfg.orig")).unwrap();
        assert_eq!(backup, "{\"old\": true}");
    }

    #[test]
    fn test_external_directories_are_linked() {
        let temp = TempDir::new().unwrap();
        let raft_dir = temp.path().join("raft");
        let shared = temp.path().join("lab_references");
        std::fs::create_dir_all(&raft_dir).unwrap();

        let mut config = RaftConfig::with_defaults(&raft_dir);
        config.filesystem.insert("references".to_string(), shared.clone());
        provision_filesystem(&raft_dir, &config).unwrap();

        assert!(shared.is_dir());
        let link = raft_dir.join("lab_references");
        assert_eq!(std::fs::read_link(&link).unwrap(), shared);
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~/refs"), home.join("refs"));
        assert_eq!(expand_home("/abs/refs"), PathBuf::from("/abs/refs"));
    }
}
