//! CLI argument structures
//!
//! Every project command takes `-p/--project-id`; the rest of the flags are
//! command specific.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_MODULE_REPO;
use crate::project::LoadMode;

/// Reproducible analysis projects around nextflow module repositories
#[derive(Parser)]
#[command(name = "raft")]
#[command(about = "raft - Reproducible Analyses Framework and Tools", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// RAFT installation directory (defaults to the current directory)
    #[arg(long, env = "RAFT_DIR", global = true)]
    pub raft_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write .raft.cfg and the project templates
    #[command(name = "setup")]
    Setup {
        /// Accept every default without prompting
        #[arg(short = 'd', long = "default")]
        use_defaults: bool,
    },

    /// Create a new project
    #[command(name = "init-project")]
    InitProject {
        #[arg(short = 'p', long)]
        project_id: String,

        /// Init config mapping project subdirectories to external paths
        #[arg(short = 'c', long)]
        init_config: Option<PathBuf>,

        /// Remote for the project's rftpkg repository
        #[arg(short = 'r', long)]
        repo_url: Option<String>,
    },

    /// Bring a shared reference file into a project
    #[command(name = "load-reference")]
    LoadReference {
        #[arg(short = 'p', long)]
        project_id: String,

        /// File name, optionally prefixed with directories
        #[arg(short = 'f', long)]
        file: String,

        /// Subdirectory of the project's references directory
        #[arg(short = 's', long)]
        sub_dir: Option<String>,

        #[arg(short = 'm', long, value_enum, default_value_t = LoadMode::Symlink)]
        mode: LoadMode,
    },

    /// Bring a shared metadata file into a project
    #[command(name = "load-metadata")]
    LoadMetadata {
        #[arg(short = 'p', long)]
        project_id: String,

        #[arg(short = 'f', long)]
        file: String,

        #[arg(short = 's', long)]
        sub_dir: Option<String>,

        #[arg(short = 'm', long, value_enum, default_value_t = LoadMode::Symlink)]
        mode: LoadMode,
    },

    /// Clone a module (and the modules it includes) into a project
    #[command(name = "load-module")]
    LoadModule {
        #[arg(short = 'p', long)]
        project_id: String,

        #[arg(short = 'm', long)]
        module: String,

        /// Repository name from nextflow_repos
        #[arg(short = 'r', long, default_value = DEFAULT_MODULE_REPO)]
        repo: String,

        /// Branch for every module ("dev") or per module ("alignment:dev,utilities:main")
        #[arg(short = 'b', long, default_value = "main")]
        branches: String,

        /// Do not load modules referenced by include statements
        #[arg(short = 'n', long)]
        no_deps: bool,

        /// Seconds to wait between clones
        #[arg(long, default_value = "15")]
        delay: u64,
    },

    /// List the steps of loaded modules
    #[command(name = "list-steps")]
    ListSteps {
        #[arg(short = 'p', long)]
        project_id: String,

        #[arg(short = 'm', long)]
        module: Option<String>,

        #[arg(short = 's', long)]
        step: Option<String>,
    },

    /// Bind the real locations of a directory's entries into containers
    #[command(name = "update-mounts")]
    UpdateMounts {
        #[arg(short = 'p', long)]
        project_id: String,

        #[arg(short = 'd', long)]
        dir: PathBuf,
    },

    /// Add a module step to a project workflow
    #[command(name = "add-step")]
    AddStep {
        #[arg(short = 'p', long)]
        project_id: String,

        #[arg(short = 'm', long)]
        module: String,

        #[arg(short = 's', long)]
        step: String,

        /// Workflow file under workflow/ receiving the step
        #[arg(short = 'S', long, default_value = "main")]
        subworkflow: String,

        /// Name the step is included and called as
        #[arg(short = 'a', long)]
        alias: Option<String>,
    },

    /// Run a project workflow with nextflow
    #[command(name = "run-workflow")]
    RunWorkflow {
        #[arg(short = 'p', long)]
        project_id: String,

        /// Entry point under workflow/, without .nf
        #[arg(short = 'w', long, default_value = "main")]
        workflow: String,

        /// Extra nextflow arguments, shell-quoted
        #[arg(short = 'n', long, allow_hyphen_values = true)]
        nf_params: Option<String>,

        #[arg(long)]
        no_resume: bool,

        /// Keep the contents of outputs/ from earlier runs
        #[arg(short = 'k', long)]
        keep_previous_outputs: bool,

        /// Skip trace, report, DAG and timeline generation
        #[arg(short = 'r', long)]
        no_reports: bool,

        #[arg(long)]
        keep_intermediates: bool,

        /// Actually delete intermediate files instead of only reporting them
        #[arg(long)]
        confirm_intermediates_deletion: bool,

        /// Comma-separated suffixes of intermediate files
        #[arg(long, value_delimiter = ',')]
        delete_suffixes: Vec<String>,
    },

    /// Snapshot a project into rftpkgs/<name>.rftpkg
    #[command(name = "package-project")]
    PackageProject {
        #[arg(short = 'p', long)]
        project_id: String,

        /// Package name (defaults to the project id)
        #[arg(short = 'o', long)]
        output: Option<String>,

        /// Leave git checkouts of workflow/ out of the package
        #[arg(long)]
        no_git: bool,

        #[arg(long)]
        no_checksums: bool,
    },

    /// Create a project from an rftpkg
    #[command(name = "load-project")]
    LoadProject {
        #[arg(short = 'p', long)]
        project_id: String,

        /// Package file, or its name in the repository given by --repo-url
        #[arg(short = 'r', long)]
        rftpkg: PathBuf,

        #[arg(long)]
        repo_url: Option<String>,

        #[arg(short = 'b', long)]
        branch: Option<String>,
    },

    /// Commit and push the project's packages
    #[command(name = "push-project")]
    PushProject {
        #[arg(short = 'p', long)]
        project_id: String,

        /// Single package to commit (defaults to all)
        #[arg(short = 'r', long)]
        rftpkg: Option<String>,

        /// Remote URL set as origin before pushing
        #[arg(long)]
        repo: Option<String>,

        #[arg(short = 'c', long)]
        comment: Option<String>,

        #[arg(short = 'b', long, default_value = "main")]
        branch: String,
    },

    /// Pull the project's packages from origin
    #[command(name = "pull-project")]
    PullProject {
        #[arg(short = 'p', long)]
        project_id: String,

        #[arg(short = 'b', long, default_value = "main")]
        branch: String,
    },

    /// Pull the latest changes of loaded modules
    #[command(name = "update-modules")]
    UpdateModules {
        #[arg(short = 'p', long)]
        project_id: String,

        /// Modules to update (defaults to every loaded module)
        #[arg(short = 'm', long, value_delimiter = ',')]
        modules: Vec<String>,

        #[arg(long, default_value = "15")]
        delay: u64,
    },

    /// Rename a project
    #[command(name = "rename-project")]
    RenameProject {
        #[arg(short = 'p', long)]
        project_id: String,

        #[arg(short = 'n', long)]
        new_id: String,
    },

    /// Remove stale task directories from a project's work directory
    #[command(name = "clean-project")]
    CleanProject {
        #[arg(short = 'p', long)]
        project_id: String,

        /// Keep only the latest successful run (asks for confirmation)
        #[arg(short = 'k', long)]
        keep_latest: bool,

        /// Only report what would be removed
        #[arg(short = 'n', long)]
        no_exec: bool,
    },

    /// Copy parameter values into a project's main workflow
    #[command(name = "copy-parameters")]
    CopyParameters {
        /// Destination project
        #[arg(short = 'p', long)]
        project_id: String,

        /// Source project
        #[arg(short = 's', long, conflicts_with = "config", required_unless_present = "config")]
        source: Option<String>,

        /// Source config file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Setup { .. } => "setup",
            Commands::InitProject { .. } => "init-project",
            Commands::LoadReference { .. } => "load-reference",
            Commands::LoadMetadata { .. } => "load-metadata",
            Commands::LoadModule { .. } => "load-module",
            Commands::ListSteps { .. } => "list-steps",
            Commands::UpdateMounts { .. } => "update-mounts",
            Commands::AddStep { .. } => "add-step",
            Commands::RunWorkflow { .. } => "run-workflow",
            Commands::PackageProject { .. } => "package-project",
            Commands::LoadProject { .. } => "load-project",
            Commands::PushProject { .. } => "push-project",
            Commands::PullProject { .. } => "pull-project",
            Commands::UpdateModules { .. } => "update-modules",
            Commands::RenameProject { .. } => "rename-project",
            Commands::CleanProject { .. } => "clean-project",
            Commands::CopyParameters { .. } => "copy-parameters",
        }
    }

    /// Project the command operates on, if any
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Commands::Setup { .. } => None,
            Commands::InitProject { project_id, .. }
            | Commands::LoadReference { project_id, .. }
            | Commands::LoadMetadata { project_id, .. }
            | Commands::LoadModule { project_id, .. }
            | Commands::ListSteps { project_id, .. }
            | Commands::UpdateMounts { project_id, .. }
            | Commands::AddStep { project_id, .. }
            | Commands::RunWorkflow { project_id, .. }
            | Commands::PackageProject { project_id, .. }
            | Commands::LoadProject { project_id, .. }
            | Commands::PushProject { project_id, .. }
            | Commands::PullProject { project_id, .. }
            | Commands::UpdateModules { project_id, .. }
            | Commands::RenameProject { project_id, .. }
            | Commands::CleanProject { project_id, .. }
            | Commands::CopyParameters { project_id, .. } => Some(project_id),
        }
    }

    /// Whether the project must exist before the command runs
    pub fn requires_existing_project(&self) -> bool {
        !matches!(
            self,
            Commands::Setup { .. }
                | Commands::InitProject { .. }
                | Commands::LoadProject { .. }
                | Commands::CopyParameters { .. }
        )
    }

    /// Whether a successful invocation is appended to the project's audit log
    pub fn is_audited(&self) -> bool {
        !matches!(
            self,
            Commands::Setup { .. }
                | Commands::InitProject { .. }
                | Commands::PackageProject { .. }
                | Commands::LoadProject { .. }
                | Commands::PushProject { .. }
                | Commands::PullProject { .. }
                | Commands::RenameProject { .. }
                | Commands::RunWorkflow { .. }
                | Commands::CopyParameters { .. }
        )
    }
}
