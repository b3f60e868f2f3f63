//! Runs the workflows of a configuration in order.

use std::{collections::HashMap, path::PathBuf};

use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    context::Context,
    framework::{RetryPolicy, run_with_retry},
    steps::{Step, StepContext, Steps, build_client, prepare},
    template::{self, Namespace},
};

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct Summary {
    /// The number of workflows that ran.
    pub executed: usize,
    /// The outputs of the last workflow.
    pub last_output: HashMap<String, String>,
    /// When the run started.
    pub started_at: DateTime<Local>,
    /// When the run finished.
    pub finished_at: DateTime<Local>,
}

/// Executes configurations.
#[derive(Debug, Clone)]
pub struct Runner {
    step_context: StepContext,
    policy: RetryPolicy,
}

impl Runner {
    /// Creates a runner from the environment, resolving relative paths against `working_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_env(working_dir: PathBuf) -> Result<Self> {
        Ok(Self::new(
            StepContext::new(build_client()?, working_dir),
            RetryPolicy::from_env(),
        ))
    }

    /// Creates a runner from its parts.
    pub fn new(step_context: StepContext, policy: RetryPolicy) -> Self {
        Self {
            step_context,
            policy,
        }
    }

    /// Runs every workflow in order, feeding each one's outputs to the next.
    ///
    /// # Errors
    ///
    /// Returns the error of the first workflow that fails to prepare or to execute.
    pub async fn run(&self, config: &Config, context: &mut Context) -> Result<Summary> {
        let started_at = Local::now();
        let total = config.workflows.len();

        for (index, entry) in config.workflows.iter().enumerate() {
            let name = entry.display_name();
            info!("starting workflow {}/{total} {name}…", index + 1);

            let (workflow, payload) = prepare(entry, context)
                .with_context(|| format!("failed to prepare workflow {name}"))?;
            debug!("workflow {name} receives {:?}", payload.parameters);

            let policy = match entry.retries {
                Some(retries) => self.policy.with_max_retries(retries),
                None => self.policy,
            };
            let cx = &self.step_context;
            let output =
                run_with_retry(name, policy, move || workflow.execute(cx, payload.clone())).await?;

            context.advance(output);
        }

        let finished_at = Local::now();
        info!(
            "finished {total} workflows in {} ms",
            (finished_at - started_at).num_milliseconds()
        );

        Ok(Summary {
            executed: total,
            last_output: context.input.clone(),
            started_at,
            finished_at,
        })
    }

    /// Validates a configuration without executing anything.
    ///
    /// Every workflow type must exist, every `env` placeholder must be set, and every `input`
    /// placeholder must name an output of the previous workflow.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first problem found.
    pub fn check(config: &Config, context: &Context) -> Result<()> {
        let mut previous: &'static [&'static str] = &[];

        for (index, entry) in config.workflows.iter().enumerate() {
            let name = entry.display_name();
            let Some(workflow) = Steps::lookup(&entry.workflow_type) else {
                bail!("Workflow {} is not found.", entry.workflow_type);
            };

            for (key, value) in &entry.parameters {
                if !workflow.parameters().contains(&key.as_str()) {
                    warn!("ignoring unknown parameter `{key}` of workflow {name}");
                    continue;
                }
                let placeholders = template::placeholders(value)
                    .with_context(|| format!("invalid parameter `{key}` of workflow {name}"))?;

                for (namespace, placeholder) in placeholders {
                    let defined = match namespace {
                        Namespace::Env => context.env.contains_key(&placeholder),
                        Namespace::Input => previous.contains(&placeholder.as_str()),
                    };
                    if !defined {
                        bail!(
                            "parameter `{key}` of workflow {} ({name}) refers to undefined `{}.{placeholder}`",
                            index + 1,
                            namespace.as_str()
                        );
                    }
                }
            }

            previous = workflow.configured_outputs(&entry.parameters);
        }

        Ok(())
    }
}
