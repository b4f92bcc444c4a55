//! Interactive prompts. Non-interactive sessions fall back to defaults.

use anyhow::Result;
use std::io::{self, IsTerminal, Write};

/// Check if running in test environment
fn is_test_environment() -> bool {
    std::env::var("CARGO_TARGET_TMPDIR").is_ok()
        || std::env::var("RUST_TEST_THREADS").is_ok()
        || cfg!(test)
}

pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && !is_test_environment()
}

/// Ask a free-form question; `None` when the answer is empty or stdin is not a terminal
pub fn ask(question: &str) -> Result<Option<String>> {
    if !is_interactive() {
        return Ok(None);
    }

    print!("{question}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

/// Yes/no confirmation, declined unless the user types `y` or `yes`
pub fn confirm(question: &str) -> Result<bool> {
    if !is_interactive() {
        println!("Non-interactive session, treating \"{question}\" as declined.");
        return Ok(false);
    }

    let answer = ask(&format!("{question} (y/N): "))?;
    Ok(matches!(
        answer.as_deref().map(str::to_lowercase).as_deref(),
        Some("y") | Some("yes")
    ))
}
