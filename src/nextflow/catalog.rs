//! Project-wide map of workflow step names to the module file defining them

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::step::ModuleScript;

#[derive(Debug, Clone, Default)]
pub struct StepCatalog {
    steps: BTreeMap<String, PathBuf>,
}

impl StepCatalog {
    /// Index named workflows in every `workflow/*/*.nf` file
    pub fn scan(workflow_dir: &Path) -> Result<Self> {
        let pattern = format!(
            "{}/*/*.nf",
            glob::Pattern::escape(&workflow_dir.to_string_lossy())
        );
        let mut scripts = Vec::new();
        for entry in glob::glob(&pattern).with_context(|| format!("Invalid glob pattern {pattern}"))? {
            let path = entry.with_context(|| format!("Failed to read match for {pattern}"))?;
            scripts.push(ModuleScript::read(&path)?);
        }
        Ok(Self::from_scripts(&scripts))
    }

    /// Earlier scripts win when two define the same workflow name
    pub fn from_scripts(scripts: &[ModuleScript]) -> Self {
        let mut steps: BTreeMap<String, PathBuf> = BTreeMap::new();
        for script in scripts {
            for name in script.workflow_names() {
                if let Some(existing) = steps.get(&name) {
                    debug!(
                        "Workflow {} defined in both {} and {}, keeping the first",
                        name,
                        existing.display(),
                        script.path().display()
                    );
                    continue;
                }
                steps.insert(name, script.path().to_path_buf());
            }
        }
        Self { steps }
    }

    pub fn module_of(&self, step: &str) -> Option<&Path> {
        self.steps.get(step).map(PathBuf::as_path)
    }

    pub fn contains(&self, step: &str) -> bool {
        self.steps.contains_key(step)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_indexes_named_workflows() {
        let temp = TempDir::new().unwrap();
        let wf = temp.path().join("workflow");
        std::fs::create_dir_all(wf.join("alignment")).unwrap();
        std::fs::create_dir_all(wf.join("samtools")).unwrap();
        std::fs::write(
            wf.join("alignment/alignment.nf"),
            "workflow align_reads {\n}\nprocess bwa_mem {\n}\n",
        )
        .unwrap();
        std::fs::write(wf.join("samtools/samtools.nf"), "workflow sort_bams {\n}\n").unwrap();
        std::fs::write(wf.join("main.nf"), "workflow {\n}\n").unwrap();

        let catalog = StepCatalog::scan(&wf).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.module_of("sort_bams").unwrap(),
            wf.join("samtools/samtools.nf")
        );
        assert!(!catalog.contains("bwa_mem"));
    }

    #[test]
    fn test_first_definition_wins() {
        let a = ModuleScript::from_text(Path::new("/w/a/a.nf"), "workflow dup {\n}\n");
        let b = ModuleScript::from_text(Path::new("/w/b/b.nf"), "workflow dup {\n}\n");
        let catalog = StepCatalog::from_scripts(&[a, b]);
        assert_eq!(catalog.module_of("dup").unwrap(), Path::new("/w/a/a.nf"));
    }
}
