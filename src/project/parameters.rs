//! `raft copy-parameters`: carry parameter values from another project or a
//! config file into a reviewable copy of a project's main workflow.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::context::RaftContext;
use crate::error::RaftError;

#[derive(Debug, Clone)]
pub enum ParameterSource {
    Project(String),
    ConfigFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct CopyParametersOptions {
    pub source: ParameterSource,
    pub dest_project: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterChange {
    pub name: String,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Clone)]
pub struct CopyParametersReport {
    pub output: PathBuf,
    pub changes: Vec<ParameterChange>,
}

/// `params.<name> = <value>` assignments, excluding the project identifier
pub fn parse_assignments(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| line.starts_with("params.") && !line.contains("project_identifier"))
        .filter_map(|line| line.split_once(" = "))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Write `<dest>/workflow/main.nf.copy_params` with differing values replaced
pub fn copy_parameters(ctx: &RaftContext, options: &CopyParametersOptions) -> Result<CopyParametersReport> {
    let source_path = match &options.source {
        ParameterSource::Project(id) => ctx.existing_project(id)?.main_workflow(),
        ParameterSource::ConfigFile(path) => path.clone(),
    };
    if !source_path.is_file() {
        return Err(RaftError::ParameterSourceMissing { path: source_path }.into());
    }

    let dest = ctx.existing_project(&options.dest_project)?;
    let dest_main = dest.main_workflow();
    let output = PathBuf::from(format!("{}.copy_params", dest_main.display()));

    let source = std::fs::read_to_string(&source_path)
        .with_context(|| format!("Failed to read {}", source_path.display()))?;
    let target = std::fs::read_to_string(&dest_main)
        .with_context(|| format!("Failed to read {}", dest_main.display()))?;

    let source_params = parse_assignments(&source);
    let mut changes = Vec::new();
    let mut out = String::with_capacity(target.len());

    for line in target.split_inclusive('\n') {
        let trimmed = line.trim_end();
        let replacement = trimmed
            .split_once(" = ")
            .and_then(|(name, value)| {
                source_params
                    .get(name)
                    .filter(|new_value| new_value.as_str() != value)
                    .map(|new_value| (name, value, new_value))
            });

        match replacement {
            Some((name, old_value, new_value)) => {
                changes.push(ParameterChange {
                    name: name.to_string(),
                    old_value: old_value.to_string(),
                    new_value: new_value.clone(),
                });
                out.push_str(&format!("{name} = {new_value}\n"));
            }
            None => out.push_str(line),
        }
    }

    std::fs::write(&output, out).with_context(|| format!("Failed to write {}", output.display()))?;

    for change in &changes {
        println!("{}: {} -> {}", change.name, change.old_value, change.new_value);
    }
    println!("Done copying parameters.");
    println!("Verify parameters in {} and", output.display());
    println!("copy {} to {} to complete.", output.display(), dest_main.display());

    Ok(CopyParametersReport { output, changes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RaftConfig;
    use crate::subprocess::SubprocessManager;
    use tempfile::TempDir;

    #[test]
    fn test_parse_assignments() {
        let params = parse_assignments(
            "params.project_identifier = 'a'\nparams.aligner$threads = 8\n  params.indented = 1\nworkflow {\n",
        );
        assert_eq!(params.len(), 1);
        assert_eq!(params["params.aligner$threads"], "8");
    }

    #[test]
    fn test_copy_from_config_file() {
        let temp = TempDir::new().unwrap();
        let ctx = RaftContext::new(
            temp.path().to_path_buf(),
            RaftConfig::with_defaults(temp.path()),
            SubprocessManager::mock().0,
        );
        let dest = ctx.project("demo").unwrap();
        std::fs::create_dir_all(dest.workflow_dir()).unwrap();
        std::fs::write(
            dest.main_workflow(),
            "params.project_identifier = 'demo'\nparams.threads = ''\nparams.ref = 'hg38'\n",
        )
        .unwrap();
        let cfg = temp.path().join("params.config");
        std::fs::write(&cfg, "params.threads = 16\nparams.ref = 'hg38'\nparams.project_identifier = 'old'\n").unwrap();

        let report = copy_parameters(
            &ctx,
            &CopyParametersOptions {
                source: ParameterSource::ConfigFile(cfg),
                dest_project: "demo".to_string(),
            },
        )
        .unwrap();

        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].new_value, "16");
        assert_eq!(
            std::fs::read_to_string(&report.output).unwrap(),
            "params.project_identifier = 'demo'\nparams.threads = 16\nparams.ref = 'hg38'\n"
        );
        assert!(std::fs::read_to_string(dest.main_workflow())
            .unwrap()
            .contains("params.threads = ''"));
    }
}
