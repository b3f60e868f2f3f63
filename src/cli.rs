//! Command-line interface.
//!
//! Parses arguments, installs logging and dispatches to the [`Runner`].

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    context::Context,
    runner::Runner,
    steps::{Step, Steps},
};

/// Runs a chain of workflows described by a YAML file.
///
/// Each workflow's outputs are available to the next one as `{{ input.<name> }}`, and the
/// environment as `{{ env.<NAME> }}`.
#[derive(Parser, Debug)]
#[command(name = "workflows")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The configuration file listing the workflows to run
    pub config: Option<PathBuf>,

    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Suppress all logs except errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Validate the configuration without running anything
    #[arg(long)]
    pub check: bool,

    /// List the supported workflows with their parameters and outputs
    #[arg(long, conflicts_with = "check")]
    pub list: bool,
}

impl Cli {
    /// The default log level implied by `--verbose` and `--quiet`.
    pub fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::WARN,
            (false, 1) => Level::INFO,
            (false, _) => Level::DEBUG,
        }
    }

    /// Installs the global tracing subscriber. `RUST_LOG` takes precedence over the flags.
    pub fn init_tracing(&self) {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::builder()
                    .with_default_directive(self.log_level().into())
                    .from_env_lossy(),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    /// Executes the command.
    ///
    /// # Errors
    ///
    /// Returns an error if no configuration is given, it cannot be loaded, or a workflow fails.
    pub async fn run(self) -> Result<()> {
        if self.list {
            print!("{}", list());
            return Ok(());
        }

        let path = self.config.context("No configuration is provided.")?;
        let config = Config::load(&path).await?;
        let mut context = Context::from_env();

        if self.check {
            Runner::check(&config, &context)?;
            println!(
                "{} is valid ({} workflows)",
                path.display(),
                config.workflows.len()
            );
            return Ok(());
        }

        let working_dir = std::env::current_dir().context("failed to get working directory")?;
        let summary = Runner::from_env(working_dir)?
            .run(&config, &mut context)
            .await?;
        info!("ran {} workflows from {path:?}", summary.executed);

        Ok(())
    }
}

/// Describes every supported workflow.
pub fn list() -> String {
    Steps::names()
        .into_iter()
        .filter_map(|name| Steps::lookup(name).map(|workflow| (name, workflow)))
        .map(|(name, workflow)| {
            format!(
                "{name}\n  parameters: {}\n  outputs: {}\n",
                workflow.parameters().join(", "),
                workflow.outputs().join(", ")
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_and_flags() {
        let cli = Cli::try_parse_from(["workflows", "-vv", "deploy.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("deploy.yaml")));
        assert_eq!(cli.log_level(), Level::DEBUG);

        let cli = Cli::try_parse_from(["workflows", "--quiet", "--check", "a.yml"]).unwrap();
        assert!(cli.check);
        assert_eq!(cli.log_level(), Level::ERROR);

        let cli = Cli::try_parse_from(["workflows"]).unwrap();
        assert_eq!(cli.config, None);
        assert_eq!(cli.log_level(), Level::WARN);
    }

    #[test]
    fn rejects_conflicting_flags() {
        assert!(Cli::try_parse_from(["workflows", "-q", "-v", "a.yml"]).is_err());
        assert!(Cli::try_parse_from(["workflows", "--list", "--check"]).is_err());
    }

    #[tokio::test]
    async fn missing_config_is_an_error() {
        let err = Cli::try_parse_from(["workflows"])
            .unwrap()
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No configuration is provided.");
    }

    #[test]
    fn list_describes_workflows() {
        let listed = list();
        assert!(listed.contains("echo\n  parameters: text\n  outputs: text\n"));
        assert!(listed.contains("http\n  parameters: url, method, body, content_type\n"));
    }
}
