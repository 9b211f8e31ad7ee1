use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::core::config::PipelineConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Validate and print this config file instead of the defaults
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Execute the config command
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded or is invalid.
pub fn run(args: ConfigArgs, _format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => {
            let config = PipelineConfig::load_from_file(path)?;
            if verbose {
                eprintln!("Loaded config from {}", path.display());
            }
            config
        }
        None => PipelineConfig::default(),
    };

    println!("{}", config.to_json()?);

    Ok(())
}
