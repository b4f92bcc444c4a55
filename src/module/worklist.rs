//! Module dependency resolution
//!
//! Loading a module may reveal `include` statements pointing at other
//! modules. [`ModuleWorklist`] drives the fixed point: every name is queued
//! at most once, so the walk ends once no new module names appear.

use std::collections::{HashSet, VecDeque};
use std::path::Path;

use crate::nextflow::ModuleScript;

#[derive(Debug, Clone, Default)]
pub struct ModuleWorklist {
    pending: VecDeque<String>,
    seen: HashSet<String>,
}

impl ModuleWorklist {
    pub fn new<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut worklist = Self::default();
        worklist.extend(roots);
        worklist
    }

    /// Queue modules not seen before; returns how many were new
    pub fn extend<I, S>(&mut self, modules: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for module in modules {
            let module = module.into();
            if self.seen.insert(module.clone()) {
                self.pending.push_back(module);
                added += 1;
            }
        }
        added
    }

    pub fn next_module(&mut self) -> Option<String> {
        self.pending.pop_front()
    }
}

/// Modules referenced by `include ... from '../<module>/<file>.nf'` lines
pub fn module_dependencies(script: &ModuleScript) -> Vec<String> {
    let own = script.module_name();
    let mut deps: Vec<String> = Vec::new();
    for (_, _, source) in script.includes() {
        let Some(dep) = Path::new(&source)
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().to_string())
        else {
            continue;
        };
        if dep != own && dep != "." && dep != ".." && !deps.contains(&dep) {
            deps.push(dep);
        }
    }
    deps
}
