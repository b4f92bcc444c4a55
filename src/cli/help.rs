//! Help text and verbosity helpers

use crate::cli::args::Cli;
use clap::CommandFactory;

pub fn generate_help() -> String {
    Cli::command().render_help().to_string()
}

/// Log filter for the `-v` count
pub fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        assert_eq!(get_log_level(0), "info");
        assert_eq!(get_log_level(1), "debug");
        assert_eq!(get_log_level(4), "trace");
    }

    #[test]
    fn test_help_lists_commands() {
        let help = generate_help();
        assert!(help.contains("add-step"));
        assert!(help.contains("package-project"));
    }
}
