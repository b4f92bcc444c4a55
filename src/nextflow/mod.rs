//! Nextflow workflow text handling
//!
//! Module scripts are read as lines, classified by [`scanner`], and steps are
//! extracted from them by name. [`insert::add_step`] splices a step into a
//! project's main workflow: an `include` under `/*Inclusions*/`, parameter
//! declarations under `/*Parameters*/` (or the tiered General/Fine-tuned
//! markers) and a call at the end of the `workflow {}` block.

pub mod catalog;
pub mod insert;
pub mod main_file;
pub mod params;
pub mod scanner;
pub mod step;

pub use catalog::StepCatalog;
pub use insert::{add_step, discover, AddStepRequest, StepInsertion};
pub use main_file::MainWorkflow;
pub use scanner::StepKind;
pub use step::{ModuleScript, RequirePolicy, Step, StepSummary};
