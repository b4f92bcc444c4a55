//! Command-line interface: argument parsing and dispatch to the handlers

pub mod args;
pub mod help;
pub mod router;

pub use args::{Cli, Commands};
pub use help::{generate_help, get_log_level};
pub use router::{execute_command, invocation_line};
