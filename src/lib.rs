//! RAFT: reproducible analysis projects around nextflow module repositories
//!
//! A RAFT installation holds shared references, metadata and container images
//! next to a set of projects. Each project pulls workflow modules from git,
//! composes them into its main workflow with [`nextflow::add_step`], runs
//! them with nextflow and can be packaged as an rftpkg for sharing.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod fs_ops;
pub mod module;
pub mod nextflow;
pub mod package;
pub mod project;
pub mod prompt;
pub mod runner;
pub mod subprocess;
pub mod templates;

pub use context::RaftContext;
pub use error::RaftError;
