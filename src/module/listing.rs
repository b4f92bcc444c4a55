//! `raft list-steps`

use anyhow::Result;
use std::fmt::Write as _;

use crate::error::RaftError;
use crate::nextflow::{ModuleScript, StepSummary};
use crate::project::ProjectLayout;

#[derive(Debug, Clone)]
pub struct ModuleSteps {
    pub module: String,
    pub steps: Vec<StepSummary>,
}

/// Steps of every loaded module, or of `module` only, optionally narrowed to `step`
pub fn list_steps(
    layout: &ProjectLayout,
    module: Option<&str>,
    step: Option<&str>,
) -> Result<Vec<ModuleSteps>> {
    let modules = match module {
        Some(module) => {
            if !layout.has_module(module) {
                return Err(RaftError::ModuleNotLoaded {
                    path: layout.module_script(module),
                }
                .into());
            }
            vec![module.to_string()]
        }
        None => layout.loaded_modules()?,
    };

    let mut listing = Vec::new();
    for module in modules {
        let path = layout.module_script(&module);
        if !path.is_file() {
            tracing::debug!("Skipping {}: no {}", module, path.display());
            continue;
        }
        let steps = ModuleScript::read(&path)?
            .summaries()
            .into_iter()
            .filter(|summary| step.map_or(true, |wanted| summary.name == wanted))
            .collect::<Vec<_>>();
        if !steps.is_empty() {
            listing.push(ModuleSteps { module, steps });
        }
    }
    Ok(listing)
}

pub fn render(listing: &[ModuleSteps]) -> String {
    let mut out = String::new();
    for entry in listing {
        for step in &entry.steps {
            let _ = writeln!(out, "module: {}", entry.module);
            let _ = writeln!(out, "step type: {}", step.kind);
            let _ = writeln!(out, "step: {}", step.name);
            for doc in &step.docs {
                let _ = writeln!(out, "  {doc}");
            }
            out.push('\n');
        }
    }
    out
}
