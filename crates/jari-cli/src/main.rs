//! jari - package class directories and Maven dependencies into a jar

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use jari_cli::cmd;
use jari_cli::{Cli, Commands};
use jari_core::BuildRequest;

fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Build { file } => cmd::build(&cli, file),
        Commands::Check { file } => cmd::check(&cli, file),
        Commands::Pack {
            inputs,
            output,
            main_class,
            jar_version,
            dependencies,
            no_compress,
        } => {
            let request = BuildRequest::from_params(
                inputs.iter().cloned(),
                output.clone(),
                dependencies.clone(),
                main_class.clone(),
                jar_version.clone(),
                !no_compress,
            );
            cmd::pack(&cli, request)
        }
    }
}
