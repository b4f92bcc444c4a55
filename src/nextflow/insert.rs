//! `raft add-step`: make a module step callable from a project workflow

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::catalog::StepCatalog;
use super::main_file::{
    MainWorkflow, FINE_TUNED_PARAMETERS_MARKER, GENERAL_PARAMETERS_MARKER, INCLUSIONS_MARKER,
    PARAMETERS_MARKER,
};
use super::params::{self, ParameterBlock};
use super::scanner::StepKind;
use super::step::{ModuleScript, RequirePolicy, Step};
use crate::error::RaftError;
use crate::project::{ProjectLayout, MAIN_WORKFLOW};

#[derive(Debug, Clone)]
pub struct AddStepRequest {
    pub module: String,
    pub step: String,
    pub alias: Option<String>,
    /// Workflow file under `workflow/` receiving the step, without `.nf`
    pub subworkflow: String,
}

impl AddStepRequest {
    pub fn new(module: &str, step: &str) -> Self {
        Self {
            module: module.to_string(),
            step: step.to_string(),
            alias: None,
            subworkflow: MAIN_WORKFLOW.to_string(),
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// The name the step is called by in the target workflow
    pub fn call_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.step)
    }
}

/// What an insertion changed
#[derive(Debug, Clone)]
pub struct StepInsertion {
    pub target: PathBuf,
    pub backup: PathBuf,
    pub inclusion: String,
    pub call: String,
    /// Parameter declarations newly written
    pub declared: Vec<String>,
    /// Steps whose parameters were collected, starting with the added one
    pub visited: Vec<String>,
}

/// Breadth-first walk of the step call graph from `root`.
///
/// Each step is expanded once: a name is marked visited before its callees
/// are queued, so cycles terminate. Returns steps in visiting order.
pub fn discover<F>(root: &str, mut calls_of: F) -> Result<Vec<String>>
where
    F: FnMut(&str) -> Result<Vec<String>>,
{
    let mut visited = vec![root.to_string()];
    let mut seen: HashSet<String> = visited.iter().cloned().collect();
    let mut pending = VecDeque::from([root.to_string()]);

    while let Some(current) = pending.pop_front() {
        for callee in calls_of(&current)? {
            if seen.insert(callee.clone()) {
                visited.push(callee.clone());
                pending.push_back(callee);
            }
        }
    }
    Ok(visited)
}

/// Loads module scripts on demand and answers "which catalogued steps does
/// this step call", resolving include aliases of the calling module.
struct StepResolver<'a> {
    catalog: &'a StepCatalog,
    scripts: HashMap<PathBuf, ModuleScript>,
    steps: HashMap<String, (Step, PathBuf)>,
}

impl<'a> StepResolver<'a> {
    fn new(catalog: &'a StepCatalog, root: Step, root_script: ModuleScript) -> Self {
        let path = root_script.path().to_path_buf();
        let mut steps = HashMap::new();
        steps.insert(root.name().to_string(), (root, path.clone()));
        let mut scripts = HashMap::new();
        scripts.insert(path, root_script);
        Self {
            catalog,
            scripts,
            steps,
        }
    }

    fn script(&mut self, path: &Path) -> Result<&ModuleScript> {
        if !self.scripts.contains_key(path) {
            let script = ModuleScript::read(path)?;
            self.scripts.insert(path.to_path_buf(), script);
        }
        self.scripts
            .get(path)
            .with_context(|| format!("Module {} was not loaded", path.display()))
    }

    fn step(&mut self, name: &str) -> Result<Option<(Step, PathBuf)>> {
        if let Some(found) = self.steps.get(name) {
            return Ok(Some(found.clone()));
        }
        let Some(path) = self.catalog.module_of(name).map(Path::to_path_buf) else {
            return Ok(None);
        };
        let step = self.script(&path)?.step(name)?;
        self.steps
            .insert(name.to_string(), (step.clone(), path.clone()));
        Ok(Some((step, path)))
    }

    fn calls_of(&mut self, name: &str) -> Result<Vec<String>> {
        let Some((step, path)) = self.step(name)? else {
            return Ok(Vec::new());
        };
        let aliases: HashMap<String, String> = self
            .script(&path)?
            .includes()
            .into_iter()
            .map(|(local, original, _)| (local, original))
            .collect();

        Ok(step
            .calls()
            .into_iter()
            .map(|call| aliases.get(&call).cloned().unwrap_or(call))
            .filter(|call| self.catalog.contains(call))
            .collect())
    }
}

/// Parameters the added step needs at the top level: its own (renamed for
/// the alias) followed by those of every step it reaches.
fn collect_parameters(
    root: &Step,
    alias: Option<&str>,
    resolver: &mut StepResolver<'_>,
    visited: &[String],
) -> Result<Vec<String>> {
    let mut collected: Vec<String> = root
        .parameters(RequirePolicy::Expose)
        .into_iter()
        .map(|p| match alias {
            Some(alias) => p.replace(root.name(), alias),
            None => p,
        })
        .collect();

    for name in visited.iter().skip(1) {
        if let Some((step, _)) = resolver.step(name)? {
            collected.extend(step.parameters(RequirePolicy::Discard));
        }
    }
    Ok(params::dedup_preserving_order(collected))
}

fn render_inclusion(step: &str, alias: Option<&str>, module: &str) -> String {
    let imported = match alias {
        Some(alias) => format!("{step} as {alias}"),
        None => step.to_string(),
    };
    format!("include {{ {imported} }} from './{module}/{module}.nf'")
}

fn parameter_block(main: &MainWorkflow, parameters: &[String]) -> Result<ParameterBlock> {
    let declared = main.declared_parameters();
    if main.has_marker(PARAMETERS_MARKER) {
        return Ok(ParameterBlock::flat(parameters, &declared));
    }
    for marker in [GENERAL_PARAMETERS_MARKER, FINE_TUNED_PARAMETERS_MARKER] {
        if !main.has_marker(marker) {
            // Report the flat marker unless the file is half-way to tiered
            let missing = if main.has_marker(GENERAL_PARAMETERS_MARKER)
                || main.has_marker(FINE_TUNED_PARAMETERS_MARKER)
            {
                marker
            } else {
                PARAMETERS_MARKER
            };
            return Err(RaftError::MissingMarker {
                marker: missing.to_string(),
                path: main.path().to_path_buf(),
            }
            .into());
        }
    }
    Ok(ParameterBlock::tiered(parameters, &declared))
}

fn apply_parameter_block(main: &mut MainWorkflow, block: &ParameterBlock) -> Result<()> {
    match block {
        ParameterBlock::Flat(lines) => main.insert_after_marker(PARAMETERS_MARKER, lines),
        ParameterBlock::Tiered {
            general,
            fine_tuned,
        } => {
            main.insert_after_marker(GENERAL_PARAMETERS_MARKER, general)?;
            main.insert_after_marker(FINE_TUNED_PARAMETERS_MARKER, fine_tuned)
        }
    }
}

/// Splice step `request.step` of `request.module` into the project workflow.
///
/// The target file is backed up to `<file>.bak` first. Every check happens
/// on an in-memory copy; the file is replaced in one atomic write at the end,
/// so a failure leaves it untouched.
pub fn add_step(layout: &ProjectLayout, request: &AddStepRequest) -> Result<StepInsertion> {
    let target = layout.workflow_file(&request.subworkflow);
    let mut main = MainWorkflow::read(&target)?;
    let original = main.render();
    let backup = main.backup(&original)?;

    let script = ModuleScript::read(&layout.module_script(&request.module))?;
    let step = script.step(&request.step)?;
    let alias = request.alias.as_deref();
    debug!(
        "Extracted {} {} ({} line(s)) from {}",
        step.kind(),
        step.name(),
        step.body().len(),
        script.path().display()
    );

    let call = match alias {
        Some(alias) => step.call().replace(step.name(), alias),
        None => step.call(),
    };
    let inclusion = render_inclusion(&request.step, alias, &request.module);

    if main.contains_line(&inclusion) || main.contains_call(&call) {
        return Err(RaftError::StepAlreadyAdded {
            step: request.call_name().to_string(),
            project: layout.id().to_string(),
        }
        .into());
    }

    let catalog = match step.kind() {
        StepKind::Workflow => StepCatalog::scan(&layout.workflow_dir())?,
        StepKind::Process => StepCatalog::default(),
    };
    let mut resolver = StepResolver::new(&catalog, step.clone(), script);
    let visited = match step.kind() {
        StepKind::Workflow => discover(step.name(), |name| resolver.calls_of(name))?,
        StepKind::Process => vec![step.name().to_string()],
    };
    let parameters = collect_parameters(&step, alias, &mut resolver, &visited)?;

    let block = parameter_block(&main, &parameters)?;
    main.insert_after_marker(INCLUSIONS_MARKER, std::slice::from_ref(&inclusion))?;
    if !block.is_empty() {
        apply_parameter_block(&mut main, &block)?;
    }
    main.insert_before_entry_close(&[format!("  {call}")])?;
    main.write()?;

    let declared = block.names().into_iter().map(str::to_string).collect();
    info!(
        "Added {} to {} ({} step(s) visited)",
        request.call_name(),
        target.display(),
        visited.len()
    );
    Ok(StepInsertion {
        target,
        backup,
        inclusion,
        call,
        declared,
        visited,
    })
}
