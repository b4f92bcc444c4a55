use clap::Parser;
use raft::cli::{execute_command, get_log_level, invocation_line, Cli};
use tracing::{debug, error, trace};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(get_log_level(cli.verbose)))
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    debug!("raft started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", args);

    let result = match cli.raft_dir.map_or_else(std::env::current_dir, Ok) {
        Ok(raft_dir) => execute_command(cli.command, &raft_dir, &invocation_line(&args)).await,
        Err(e) => Err(anyhow::Error::new(e).context("Failed to determine the current directory")),
    };

    if let Err(e) = result {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
