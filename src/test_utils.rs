//! Helpers for testing the workflows that talk to the network.

use std::path::PathBuf;

use tokio::net::TcpListener;

use crate::steps::StepContext;

/// A [`StepContext`] that ignores system proxies and points GitHub at `github_api`.
pub fn step_context(working_dir: PathBuf, github_api: &str) -> StepContext {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let mut cx = StepContext::new(client, working_dir);
    cx.github_api = github_api.to_owned();
    cx
}

/// A URL on a local port nothing listens on, so connecting to it is refused.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/unreachable")
}
