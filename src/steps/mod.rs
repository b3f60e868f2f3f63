//! The registry of supported workflows.
//!
//! Every workflow declares the parameters it reads and the outputs it produces. Parameters not
//! declared are dropped before the workflow runs, and outputs replace the input of the next one.

mod command;
#[cfg(feature = "archive")]
mod decompress;
#[cfg(feature = "archive")]
mod download;
mod echo;
#[cfg(feature = "github")]
mod gist;
mod http;
mod wechat;

pub use command::Command;
#[cfg(feature = "archive")]
pub use decompress::Decompress;
#[cfg(feature = "archive")]
pub use download::Download;
pub use echo::Echo;
#[cfg(feature = "github")]
pub use gist::Gist;
pub use http::Http;
pub use wechat::WeChat;

use std::{collections::HashMap, path::PathBuf};

use anyhow::{Context as _, Result, anyhow};
use reqwest::Client;
use tracing::{debug, warn};

use crate::{
    USER_AGENT,
    config::WorkflowConfig,
    context::{Context, Payload},
    env::{GITHUB_API_URL, HTTP_PROXY_URL, HTTP_TIMEOUT},
    framework::{StateError, StateResult},
    static_lazy_lock, template,
};

/// A workflow that can be executed.
pub trait Step {
    /// The parameters this workflow reads.
    fn parameters(&self) -> &'static [&'static str];

    /// The outputs this workflow produces on success.
    fn outputs(&self) -> &'static [&'static str];

    /// The outputs this workflow produces when configured with `parameters`, before rendering.
    fn configured_outputs(&self, _parameters: &HashMap<String, String>) -> &'static [&'static str] {
        self.outputs()
    }

    /// Executes a single attempt of this workflow.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] telling whether the attempt may be retried.
    fn execute(
        &self,
        cx: &StepContext,
        input: Payload,
    ) -> impl Future<Output = StateResult<Payload>> + Send;
}

/// Shared resources handed to every workflow.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// The HTTP client used for every request.
    pub client: Client,
    /// Relative paths are resolved against this directory.
    pub working_dir: PathBuf,
    /// The root of GitHub REST API.
    pub github_api: String,
}

impl StepContext {
    /// Creates a context with the default endpoints.
    pub fn new(client: Client, working_dir: PathBuf) -> Self {
        Self {
            client,
            working_dir,
            github_api: GITHUB_API_URL.clone(),
        }
    }

    /// Resolves a path parameter against [`Self::working_dir`].
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.working_dir.join(path)
    }
}

/// Builds the HTTP client shared by all workflows.
///
/// The client honours [`HTTP_PROXY_URL`] and [`HTTP_TIMEOUT`].
///
/// # Errors
///
/// Returns an error if the proxy URL is invalid or the client cannot be built.
pub fn build_client() -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(*HTTP_TIMEOUT);
    if let Some(proxy) = HTTP_PROXY_URL.as_deref() {
        debug!("routing requests through {proxy}");
        builder = builder.proxy(reqwest::Proxy::all(proxy).context("invalid HTTP_PROXY_URL")?);
    }
    Ok(builder.build()?)
}

/// Maps a failed request to a retry on connection failures and timeouts.
///
/// Any other failure cancels.
pub fn request_error(err: reqwest::Error) -> StateError {
    if err.is_connect() || err.is_timeout() {
        StateError::Retry(err.into())
    } else {
        StateError::Cancelled(err.into())
    }
}

/// Every supported workflow.
#[non_exhaustive]
#[derive(Debug)]
pub enum Steps {
    /// See [`Http`].
    Http(Http),
    /// See [`Echo`].
    Echo(Echo),
    /// See [`WeChat`].
    WeChat(WeChat),
    /// See [`Gist`].
    #[cfg(feature = "github")]
    Gist(Gist),
    /// See [`Command`].
    Command(Command),
    /// See [`Download`].
    #[cfg(feature = "archive")]
    Download(Download),
    /// See [`Decompress`].
    #[cfg(feature = "archive")]
    Decompress(Decompress),
}

static_lazy_lock! {
    WORKFLOWS: HashMap<&'static str, Steps> = {
        let mut m = HashMap::new();
        m.insert("http", Steps::Http(Http));
        m.insert("echo", Steps::Echo(Echo));
        m.insert("wechat", Steps::WeChat(WeChat));
        #[cfg(feature = "github")]
        m.insert("gist", Steps::Gist(Gist));
        m.insert("command", Steps::Command(Command));
        #[cfg(feature = "archive")]
        m.insert("download", Steps::Download(Download));
        #[cfg(feature = "archive")]
        m.insert("decompress", Steps::Decompress(Decompress));
        m
    };
}

impl Steps {
    /// Finds a workflow by its case-insensitive name.
    pub fn lookup(name: &str) -> Option<&'static Self> {
        WORKFLOWS.get(name.to_lowercase().as_str())
    }

    /// The sorted names of every supported workflow.
    pub fn names() -> Vec<&'static str> {
        let mut names: Vec<_> = WORKFLOWS.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Step for Steps {
    fn parameters(&self) -> &'static [&'static str] {
        match self {
            Self::Http(step) => step.parameters(),
            Self::Echo(step) => step.parameters(),
            Self::WeChat(step) => step.parameters(),
            #[cfg(feature = "github")]
            Self::Gist(step) => step.parameters(),
            Self::Command(step) => step.parameters(),
            #[cfg(feature = "archive")]
            Self::Download(step) => step.parameters(),
            #[cfg(feature = "archive")]
            Self::Decompress(step) => step.parameters(),
        }
    }

    fn outputs(&self) -> &'static [&'static str] {
        match self {
            Self::Http(step) => step.outputs(),
            Self::Echo(step) => step.outputs(),
            Self::WeChat(step) => step.outputs(),
            #[cfg(feature = "github")]
            Self::Gist(step) => step.outputs(),
            Self::Command(step) => step.outputs(),
            #[cfg(feature = "archive")]
            Self::Download(step) => step.outputs(),
            #[cfg(feature = "archive")]
            Self::Decompress(step) => step.outputs(),
        }
    }

    fn configured_outputs(&self, parameters: &HashMap<String, String>) -> &'static [&'static str] {
        match self {
            Self::Command(step) => step.configured_outputs(parameters),
            _ => self.outputs(),
        }
    }

    async fn execute(&self, cx: &StepContext, input: Payload) -> StateResult<Payload> {
        match self {
            Self::Http(step) => step.execute(cx, input).await,
            Self::Echo(step) => step.execute(cx, input).await,
            Self::WeChat(step) => step.execute(cx, input).await,
            #[cfg(feature = "github")]
            Self::Gist(step) => step.execute(cx, input).await,
            Self::Command(step) => step.execute(cx, input).await,
            #[cfg(feature = "archive")]
            Self::Download(step) => step.execute(cx, input).await,
            #[cfg(feature = "archive")]
            Self::Decompress(step) => step.execute(cx, input).await,
        }
    }
}

/// Resolves the workflow of a configuration entry and renders its declared parameters.
///
/// # Errors
///
/// Returns an error if the workflow type is unknown or a parameter fails to render.
pub fn prepare(config: &WorkflowConfig, context: &Context) -> Result<(&'static Steps, Payload)> {
    let workflow = Steps::lookup(&config.workflow_type)
        .ok_or_else(|| anyhow!("Workflow {} is not found.", config.workflow_type))?;

    for key in config.parameters.keys() {
        if !workflow.parameters().contains(&key.as_str()) {
            warn!(
                "ignoring unknown parameter `{key}` of workflow {}",
                config.display_name()
            );
        }
    }

    let mut payload = HashMap::new();
    for key in workflow.parameters() {
        if let Some(value) = config.parameters.get(*key) {
            let rendered = template::render(value, context)
                .with_context(|| format!("failed to render parameter `{key}`"))?;
            payload.insert(*key, rendered);
        }
    }

    Ok((workflow, Payload::new(payload)))
}
