use clap::Parser;
use tracing_subscriber::EnvFilter;

use otu_reassign::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("otu_reassign=debug,info")
    } else {
        EnvFilter::new("otu_reassign=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Run(args) => {
            cli::run::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Reassign(args) => {
            cli::reassign::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Config(args) => {
            cli::config::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
