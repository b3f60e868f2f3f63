use std::path::{Path, PathBuf};

use anyhow::anyhow;
use futures::TryStreamExt as _;
use reqwest::{Client, StatusCode};
use sha2::Digest as _;
use tokio::{fs::File, io::AsyncWriteExt as _};
use tracing::{debug, error, info};

use crate::framework::{IntoState as _, StateError, StateResult};

/// A file written by [`download_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    /// Where the file was written.
    pub path: PathBuf,
    /// The number of bytes written.
    pub size: u64,
    /// The hex-encoded SHA-256 digest of the content.
    pub sha256: String,
}

/// Streams a URL into a file, hashing the content on the way.
///
/// Parent directories are created when missing, and a partially written file is removed on failure.
///
/// # Errors
///
/// Returns an error that instructs retrying on connection failures, timeouts and server errors, or
/// cancelling on client errors and local IO failures.
pub async fn download_file(client: &Client, url: &str, path: &Path) -> StateResult<Downloaded> {
    debug!("requesting download from {url}…");

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(err) => {
            error!("failed to request download from {url}: {err}");
            return Err(match err {
                _ if err.is_connect() || err.is_timeout() => StateError::Retry(err.into()),
                _ => StateError::Cancelled(err.into()),
            });
        }
    };

    match response.status() {
        status if status.is_success() => info!("requested download from {url}"),
        StatusCode::GONE | StatusCode::NOT_FOUND => {
            error!("failed to request download: {url} expired or removed");
            return Err(StateError::Cancelled(anyhow!(
                "{url} responded {}",
                response.status()
            )));
        }
        status => {
            error!("failed to request download from {url}: {status}");
            let err = anyhow!("{url} responded {status}");
            return Err(if status.is_server_error() {
                StateError::Retry(err)
            } else {
                StateError::Cancelled(err)
            });
        }
    }

    let result = write(response, path).await;
    if result.is_err() {
        drop(tokio::fs::remove_file(path).await);
    }
    result
}

async fn write(response: reqwest::Response, path: &Path) -> StateResult<Downloaded> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_cancel()?;
    }
    let mut file = File::create(path).await.or_cancel()?;

    let mut sha_hasher = sha2::Sha256::new();
    let mut size: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(bytes) = stream.try_next().await.or_retry()? {
        sha_hasher.update(&bytes);
        size += bytes.len() as u64;
        file.write_all(&bytes).await.or_cancel()?;
    }
    file.flush().await.or_cancel()?;

    let downloaded = Downloaded {
        path: path.to_path_buf(),
        size,
        sha256: hex::encode(sha_hasher.finalize()),
    };
    info!("downloaded {size} bytes to {path:?}");
    Ok(downloaded)
}
