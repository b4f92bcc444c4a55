//! Built-in project templates written by `raft setup`

/// Entry workflow for new projects (`.init.wf`)
pub const MAIN_WORKFLOW: &str = include_str!("../templates/main.nf");

/// Engine configuration skeleton (`.nextflow.config`)
pub const NEXTFLOW_CONFIG: &str = include_str!("../templates/nextflow.config");

/// Project subdirectories mapped to optional external locations (`.init.cfg`)
pub const INIT_CONFIG: &str = include_str!("../templates/init.cfg");
