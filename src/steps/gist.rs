use std::collections::HashMap;

use anyhow::anyhow;
use reqwest::{Method, StatusCode};
use tracing::{debug, error, info};

use crate::{
    context::Payload,
    env::GITHUB_TOKEN,
    framework::{IntoState as _, StateError, StateResult},
    github::{Gist as GistResponse, GistContent, GistRequest, github_api_request_builder},
    steps::{Step, StepContext, request_error},
};

/// Creates a GitHub gist holding one file, or updates that file when `id` is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gist;

impl Gist {
    // Input
    const ID: &'static str = "id";
    const FILENAME: &'static str = "filename";
    const CONTENT: &'static str = "content";
    const DESCRIPTION: &'static str = "description";
    const PUBLIC: &'static str = "public";
    const TOKEN: &'static str = "token";
    const PARAMS: [&'static str; 6] = [
        Self::ID,
        Self::FILENAME,
        Self::CONTENT,
        Self::DESCRIPTION,
        Self::PUBLIC,
        Self::TOKEN,
    ];

    // Output
    const URL: &'static str = "url";
    const RAW_URL: &'static str = "raw_url";
    const OUTPUT: [&'static str; 3] = [Self::ID, Self::URL, Self::RAW_URL];
}

/// Picks the `token` parameter, falling back to the one from the environment.
fn token<'a>(input: &'a Payload, fallback: Option<&'a str>) -> StateResult<&'a str> {
    input
        .optional(Gist::TOKEN)
        .or(fallback)
        .ok_or_else(|| {
            StateError::Cancelled(anyhow!("no GitHub token, set `token` or GITHUB_TOKEN"))
        })
}

impl Step for Gist {
    fn parameters(&self) -> &'static [&'static str] {
        &Self::PARAMS
    }

    fn outputs(&self) -> &'static [&'static str] {
        &Self::OUTPUT
    }

    async fn execute(&self, cx: &StepContext, input: Payload) -> StateResult<Payload> {
        let token = token(&input, GITHUB_TOKEN.as_deref())?;
        let filename = input.require(Self::FILENAME).or_cancel()?;
        let public = input
            .optional(Self::PUBLIC)
            .map(str::parse::<bool>)
            .transpose()
            .or_cancel()?;

        let body = GistRequest {
            description: input.optional(Self::DESCRIPTION).map(str::to_owned),
            public,
            files: HashMap::from([(
                filename.to_owned(),
                GistContent {
                    content: input.parameter(Self::CONTENT).to_owned(),
                },
            )]),
        };

        let (method, url) = match input.optional(Self::ID) {
            Some(id) => (Method::PATCH, format!("{}/gists/{id}", cx.github_api)),
            None => (Method::POST, format!("{}/gists", cx.github_api)),
        };

        debug!("sending {method} {url}…");
        let response = github_api_request_builder(&cx.client, method.clone(), &url, token)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        match response.status() {
            status if status.is_success() => {}
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND) => {
                error!("GitHub refused {method} {url}: {status}");
                return Err(StateError::Cancelled(anyhow!("GitHub responded {status}")));
            }
            status if status.is_server_error() => {
                error!("failed to {method} {url}: {status}");
                return Err(StateError::Retry(anyhow!("GitHub responded {status}")));
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                error!("failed to {method} {url}: {status} {text}");
                return Err(StateError::Cancelled(anyhow!("GitHub responded {status}: {text}")));
            }
        }

        let gist = response.json::<GistResponse>().await.or_retry()?;
        info!("saved gist {gist}");

        let raw_url = gist.raw_url(filename).unwrap_or_default().to_owned();
        Ok(Payload::from_pairs([
            (Self::ID, gist.id),
            (Self::URL, gist.html_url),
            (Self::RAW_URL, raw_url),
        ]))
    }
}
