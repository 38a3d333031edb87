//! jari - package class directories and Maven dependencies into a jar
//!
//! Thin front-end over [`jari_core::Backend`]: it reads a configuration file
//! or flags, submits one build, waits for it and prints the result.
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

pub mod cmd;
pub mod console;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jari_core::BackendConfig;

#[derive(Debug, Parser)]
#[command(name = "jari")]
#[command(author, version, about = "jari - package class directories and Maven dependencies into a jar")]
pub struct Cli {
    /// Archiver executable [default: $JAVA_HOME/bin/jar, then jar on PATH]
    #[arg(long, global = true, env = "JARI_ARCHIVER")]
    pub archiver: Option<PathBuf>,

    /// Maven repository base URL
    #[arg(long, global = true, env = "JARI_REPOSITORY_URL")]
    pub repository: Option<String>,

    /// Processor count used to pick the scheduling mode (0 builds inline)
    #[arg(long, global = true, env = "JARI_PROCESSORS")]
    pub processors: Option<usize>,

    /// Directory in which staging directories are created
    #[arg(long, global = true)]
    pub staging_root: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Do not print progress
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the jar described by a configuration file
    Build {
        /// Configuration file
        file: PathBuf,
    },
    /// Validate a configuration file without building
    Check {
        /// Configuration file
        file: PathBuf,
    },
    /// Build a jar from command-line parameters
    Pack {
        /// Input directory (repeatable)
        #[arg(short, long = "input", required = true)]
        inputs: Vec<String>,

        /// Output jar
        #[arg(short, long)]
        output: String,

        /// Main class, e.g. com.example.Main
        #[arg(short, long = "main", default_value = "")]
        main_class: String,

        /// Manifest version [default: 1.0]
        #[arg(long = "jar-version", default_value = "")]
        jar_version: String,

        /// Dependency as <coordinate>:<version>, e.g. org.example.lib:2.0 (repeatable)
        #[arg(short, long = "dep", value_parser = parse_dependency)]
        dependencies: Vec<(String, String)>,

        /// Store entries without compression
        #[arg(long)]
        no_compress: bool,
    },
}

impl Cli {
    /// Environment defaults overridden by flags.
    pub fn backend_config(&self) -> BackendConfig {
        let mut config = BackendConfig::from_env();
        if let Some(archiver) = &self.archiver {
            config = config.with_archiver(archiver);
        }
        if let Some(url) = &self.repository {
            config = config.with_repository_url(url);
        }
        if let Some(processors) = self.processors {
            config = config.with_processors(processors);
        }
        if let Some(root) = &self.staging_root {
            config = config.with_staging_root(root);
        }
        config
    }
}

/// Parse `<coordinate>:<version>`.
///
/// ```
/// use jari_cli::parse_dependency;
///
/// assert_eq!(
///     parse_dependency("org.example.lib:2.0"),
///     Ok(("org.example.lib".to_string(), "2.0".to_string()))
/// );
/// assert!(parse_dependency("org.example.lib").is_err());
/// ```
pub fn parse_dependency(raw: &str) -> Result<(String, String), String> {
    match raw.rsplit_once(':') {
        Some((coordinate, version)) if !coordinate.is_empty() && !version.is_empty() => {
            Ok((coordinate.to_string(), version.to_string()))
        }
        _ => Err(format!("expected <coordinate>:<version>, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_pack_arguments() {
        let cli = Cli::try_parse_from([
            "jari",
            "--processors",
            "0",
            "pack",
            "-i",
            "a/b",
            "--input",
            "c/d",
            "-o",
            "out/app.jar",
            "--dep",
            "org.example.lib:2.0",
            "--no-compress",
        ])
        .unwrap();

        assert_eq!(cli.backend_config().processors, 0);
        let Commands::Pack {
            inputs,
            output,
            dependencies,
            no_compress,
            ..
        } = cli.command
        else {
            panic!("expected pack");
        };
        assert_eq!(inputs, ["a/b", "c/d"]);
        assert_eq!(output, "out/app.jar");
        assert_eq!(
            dependencies,
            [("org.example.lib".to_string(), "2.0".to_string())]
        );
        assert!(no_compress);
    }

    #[test]
    fn test_bad_dependency_is_rejected() {
        let result = Cli::try_parse_from(["jari", "pack", "-i", "a/b", "-o", "x/y", "--dep", "nope"]);
        assert!(result.is_err());
    }
}
