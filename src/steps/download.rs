use anyhow::anyhow;
use reqwest::Url;
use tracing::{error, warn};

use crate::{
    context::Payload,
    framework::{IntoState as _, StateError, StateResult},
    steps::{Step, StepContext},
    transactions::download_file,
};

/// Downloads a URL to a file, optionally verifying its SHA-256 digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Download;

impl Download {
    // Input
    const URL: &'static str = "url";
    const PATH: &'static str = "path";
    const SHA256: &'static str = "sha256";
    const PARAMS: [&'static str; 3] = [Self::URL, Self::PATH, Self::SHA256];

    // Output
    const SIZE: &'static str = "size";
    const OUTPUT: [&'static str; 3] = [Self::PATH, Self::SIZE, Self::SHA256];

    /// The last non-empty segment of a URL, used when no `path` is given.
    fn file_name(url: &Url) -> &str {
        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or("download")
    }
}

impl Step for Download {
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
        let path = cx.resolve(
            input
                .optional(Self::PATH)
                .unwrap_or_else(|| Self::file_name(&url)),
        );

        let downloaded = download_file(&cx.client, url.as_str(), &path).await?;

        match input.optional(Self::SHA256) {
            Some(expected) if !expected.eq_ignore_ascii_case(&downloaded.sha256) => {
                error!("failed to download {url} to {path:?}: broken file");
                drop(tokio::fs::remove_file(&path).await);
                return Err(StateError::Cancelled(anyhow!(
                    "checksum mismatch for {url}: expected {expected}, got {}",
                    downloaded.sha256
                )));
            }
            Some(_) => {}
            None => warn!("digest not provided for {path:?}"),
        }

        Ok(Payload::from_pairs([
            (Self::PATH, downloaded.path.display().to_string()),
            (Self::SIZE, downloaded.size.to_string()),
            (Self::SHA256, downloaded.sha256),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use crate::test_utils::{closed_port_url, step_context};

    // sha256("hello")
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn input(pairs: &[(&'static str, &str)]) -> Payload {
        Payload::from_pairs(pairs.iter().map(|(k, v)| (*k, (*v).to_owned())))
    }

    async fn serve(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn file_name_falls_back() {
        let url = Url::parse("https://example.com/releases/v1/tool.zip").unwrap();
        assert_eq!(Download::file_name(&url), "tool.zip");

        let url = Url::parse("https://example.com/dir/").unwrap();
        assert_eq!(Download::file_name(&url), "dir");

        let url = Url::parse("https://example.com").unwrap();
        assert_eq!(Download::file_name(&url), "download");
    }

    #[tokio::test]
    async fn downloads_and_verifies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/greeting.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let cx = step_context(dir.path().to_path_buf(), &server.uri());
        let url = format!("{}/files/greeting.txt", server.uri());

        let output = Download
            .execute(
                &cx,
                input(&[(Download::URL, url.as_str()), (Download::SHA256, HELLO_SHA256)]),
            )
            .await
            .unwrap();

        let path = dir.path().join("greeting.txt");
        assert_eq!(output.parameter(Download::PATH), path.display().to_string());
        assert_eq!(output.parameter(Download::SIZE), "5");
        assert_eq!(output.parameter(Download::SHA256), HELLO_SHA256);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }

    #[tokio::test]
    async fn writes_to_nested_path() {
        let server = serve(200, "hello").await;
        let dir = tempfile::tempdir().unwrap();
        let cx = step_context(dir.path().to_path_buf(), &server.uri());

        Download
            .execute(
                &cx,
                input(&[
                    (Download::URL, server.uri().as_str()),
                    (Download::PATH, "a/b/out.bin"),
                ]),
            )
            .await
            .unwrap();

        assert!(dir.path().join("a/b/out.bin").is_file());
    }

    #[tokio::test]
    async fn checksum_mismatch_removes_the_file() {
        let server = serve(200, "tampered").await;
        let dir = tempfile::tempdir().unwrap();
        let cx = step_context(dir.path().to_path_buf(), &server.uri());

        let result = Download
            .execute(
                &cx,
                input(&[
                    (Download::URL, server.uri().as_str()),
                    (Download::PATH, "out.txt"),
                    (Download::SHA256, HELLO_SHA256),
                ]),
            )
            .await;

        assert!(matches!(result, Err(StateError::Cancelled(_))));
        assert!(!dir.path().join("out.txt").exists());
    }

    #[tokio::test]
    async fn status_decides_the_flow() {
        let dir = tempfile::tempdir().unwrap();

        let server = serve(404, "").await;
        let cx = step_context(dir.path().to_path_buf(), &server.uri());
        let result = Download
            .execute(&cx, input(&[(Download::URL, server.uri().as_str())]))
            .await;
        assert!(matches!(result, Err(StateError::Cancelled(_))));

        let server = serve(502, "").await;
        let cx = step_context(dir.path().to_path_buf(), &server.uri());
        let result = Download
            .execute(&cx, input(&[(Download::URL, server.uri().as_str())]))
            .await;
        assert!(matches!(result, Err(StateError::Retry(_))));
    }

    #[tokio::test]
    async fn connection_failures_retry() {
        let dir = tempfile::tempdir().unwrap();
        let url = closed_port_url().await;
        let cx = step_context(dir.path().to_path_buf(), &url);

        let result = Download
            .execute(
                &cx,
                input(&[(Download::URL, url.as_str()), (Download::PATH, "out.bin")]),
            )
            .await;

        assert!(matches!(result, Err(StateError::Retry(_))));
        assert!(!dir.path().join("out.bin").exists());
    }
}
