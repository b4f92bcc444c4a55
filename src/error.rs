use std::path::PathBuf;
use thiserror::Error;

/// User-facing failures. Handlers wrap these in `anyhow::Error`; callers that
/// need to branch on a condition use `downcast_ref::<RaftError>()`.
#[derive(Error, Debug)]
pub enum RaftError {
    #[error("Cannot find RAFT configuration at {}. Run `raft setup` first.", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("Configuration has no `{section}` entry named `{key}`")]
    ConfigKeyMissing { section: &'static str, key: String },

    #[error("Project directory {} already exists. Please try another identifier.", path.display())]
    ProjectExists { path: PathBuf },

    #[error("Invalid project identifier `{0}`")]
    InvalidProjectId(String),

    #[error("Project `{id}` does not exist under {}", projects_dir.display())]
    ProjectNotFound { id: String, projects_dir: PathBuf },

    #[error("Module file {} not found. Has the module been loaded with `raft load-module`?", path.display())]
    ModuleNotLoaded { path: PathBuf },

    #[error("Could not find module `{module}` in any subgroup ({})", subgroups.join(", "))]
    ModuleNotFound {
        module: String,
        subgroups: Vec<String>,
    },

    #[error("Step `{step}` not found in module `{module}`. Available steps: {}", available.join(", "))]
    StepNotFound {
        module: String,
        step: String,
        available: Vec<String>,
    },

    #[error("Step `{step}` in {} has no closing brace", path.display())]
    UnterminatedStep { step: String, path: PathBuf },

    #[error("Step {step} has already been added to project {project}. Please use step aliasing (-a/--alias) if you intend to use this step multiple times.")]
    StepAlreadyAdded { step: String, project: String },

    #[error("Marker `{marker}` not found in {}", path.display())]
    MissingMarker { marker: String, path: PathBuf },

    #[error("Workflow file {} does not exist", path.display())]
    MainWorkflowMissing { path: PathBuf },

    #[error("Cannot find `{name}` under {}", root.display())]
    AssetNotFound { name: String, root: PathBuf },

    #[error("`{name}` is not specific enough, please provide a directory prefix. Matches: {}", display_paths(matches))]
    AmbiguousAsset { name: String, matches: Vec<PathBuf> },

    #[error("Workflow entry point {} does not exist", path.display())]
    EntryPointNotFound { path: PathBuf },

    #[error("No successful run recorded in {}", path.display())]
    NoSuccessfulRun { path: PathBuf },

    #[error("Invalid branch specification `{0}`")]
    InvalidBranchSpec(String),

    #[error("Invalid rftpkg {}: {reason}", path.display())]
    InvalidPackage { path: PathBuf, reason: String },

    #[error("Copy-parameters source {} does not exist", path.display())]
    ParameterSourceMissing { path: PathBuf },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_already_added_mentions_alias_flag() {
        let err = RaftError::StepAlreadyAdded {
            step: "align_reads".to_string(),
            project: "demo".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("align_reads"));
        assert!(message.contains("-a/--alias"));
    }

    #[test]
    fn test_ambiguous_asset_lists_matches() {
        let err = RaftError::AmbiguousAsset {
            name: "genome.fa".to_string(),
            matches: vec![PathBuf::from("/refs/a/genome.fa"), PathBuf::from("/refs/b/genome.fa")],
        };
        assert!(err.to_string().contains("/refs/a/genome.fa, /refs/b/genome.fa"));
    }

    #[test]
    fn test_step_not_found_lists_available() {
        let err = RaftError::StepNotFound {
            module: "alignment".to_string(),
            step: "missing".to_string(),
            available: vec!["align_reads".to_string(), "index_ref".to_string()],
        };
        assert!(err.to_string().ends_with("align_reads, index_ref"));
    }
}
