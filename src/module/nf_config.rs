//! Merging a module's `<module>.config` into the project `nextflow.config`

use anyhow::{Context, Result};
use std::path::Path;

const PROCESS_OPEN: &str = "process {";

/// Settings of a module config, without its own `process {` wrapper
fn module_settings(module_config: &str) -> Vec<&str> {
    let lines: Vec<&str> = module_config.lines().collect();
    let Some(open) = lines.iter().position(|l| l.trim() == PROCESS_OPEN) else {
        return lines.into_iter().filter(|l| !l.trim().is_empty()).collect();
    };
    let close = lines[open + 1..]
        .iter()
        .rposition(|l| l.trim_end() == "}")
        .map_or(lines.len(), |offset| open + 1 + offset);

    lines[open + 1..close]
        .iter()
        .copied()
        .filter(|l| !l.trim().is_empty())
        .collect()
}

/// Insert the module settings right after the project's `process {` line.
/// A block that is already present is not repeated.
pub fn merge(project_config: &str, module_config: &str) -> String {
    let mut lines: Vec<String> = project_config.lines().map(str::to_string).collect();
    let settings: Vec<String> = module_settings(module_config)
        .into_iter()
        .map(str::to_string)
        .collect();
    if settings.is_empty() || project_config.contains(&settings.join("\n")) {
        return project_config.to_string();
    }

    match lines.iter().position(|l| l.trim() == PROCESS_OPEN) {
        Some(idx) => {
            lines.splice(idx + 1..idx + 1, settings);
        }
        None => {
            lines.push(PROCESS_OPEN.to_string());
            lines.extend(settings);
            lines.push("}".to_string());
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Merge `module_config` into `project_config` on disk when the module ships one
pub fn merge_file(project_config: &Path, module_config: &Path) -> Result<bool> {
    if !module_config.is_file() {
        return Ok(false);
    }
    let module = std::fs::read_to_string(module_config)
        .with_context(|| format!("Failed to read {}", module_config.display()))?;
    let project = std::fs::read_to_string(project_config)
        .with_context(|| format!("Failed to read {}", project_config.display()))?;
    std::fs::write(project_config, merge(&project, &module))
        .with_context(|| format!("Failed to write {}", project_config.display()))?;
    tracing::debug!(
        "Merged {} into {}",
        module_config.display(),
        project_config.display()
    );
    Ok(true)
}
