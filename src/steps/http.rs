use anyhow::anyhow;
use reqwest::{Method, Url, header};
use tracing::{debug, info};

use crate::{
    context::Payload,
    framework::{IntoState as _, StateError, StateResult},
    steps::{Step, StepContext, request_error},
};

/// Sends an HTTP request and outputs the status code and the body.
///
/// Client errors are not failures: the status is reported and the next workflow decides. Server
/// errors and connection failures are retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct Http;

impl Http {
    // Input
    const URL: &'static str = "url";
    const METHOD: &'static str = "method";
    const BODY: &'static str = "body";
    const CONTENT_TYPE: &'static str = "content_type";
    const PARAMS: [&'static str; 4] = [Self::URL, Self::METHOD, Self::BODY, Self::CONTENT_TYPE];

    // Output
    const STATUS_CODE: &'static str = "status_code";
    const TEXT: &'static str = "text";
    const OUTPUT: [&'static str; 2] = [Self::STATUS_CODE, Self::TEXT];
}

impl Step for Http {
    fn parameters(&self) -> &'static [&'static str] {
        &Self::PARAMS
    }

    fn outputs(&self) -> &'static [&'static str] {
        &Self::OUTPUT
    }

    async fn execute(&self, cx: &StepContext, input: Payload) -> StateResult<Payload> {
        let url = input
            .require(Self::URL)
            .or_cancel()?
            .parse::<Url>()
            .or_cancel()?;
        let method = input
            .optional(Self::METHOD)
            .unwrap_or("GET")
            .to_uppercase()
            .parse::<Method>()
            .or_cancel()?;

        let mut request = cx.client.request(method.clone(), url.clone());
        if let Some(content_type) = input.optional(Self::CONTENT_TYPE) {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = input.optional(Self::BODY) {
            request = request.body(body.to_owned());
        }

        debug!("sending {method} {url}…");
        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        if status.is_server_error() {
            return Err(StateError::Retry(anyhow!("{method} {url} responded {status}")));
        }

        let text = response.text().await.or_retry()?;
        info!("{method} {url} responded {status}");

        Ok(Payload::from_pairs([
            (Self::STATUS_CODE, status.as_str().to_owned()),
            (Self::TEXT, text),
        ]))
    }
}
