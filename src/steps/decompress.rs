use std::path::{Path, PathBuf};

use async_zip::base::read::stream::ZipFileReader;
use tokio::io::BufReader;
use tokio_util::compat::TokioAsyncReadCompatExt as _;
use tracing::{debug, error, info};

use crate::{
    context::Payload,
    framework::{IntoState as _, StateResult},
    steps::{Step, StepContext},
    transactions::extract_archive,
};

/// Extracts a zip archive into a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decompress;

impl Decompress {
    // Input
    const PATH: &'static str = "path";
    const TARGET: &'static str = "target";
    const PARAMS: [&'static str; 2] = [Self::PATH, Self::TARGET];

    // Output
    const FILES: &'static str = "files";
    const OUTPUT: [&'static str; 2] = [Self::TARGET, Self::FILES];

    /// The archive's path without its extension, used when no `target` is given.
    ///
    /// An archive without an extension extracts to `<archive>.d` instead of its own path.
    fn default_target(archive: &Path) -> PathBuf {
        match (archive.file_stem(), archive.extension()) {
            (Some(stem), Some(_)) => archive.with_file_name(stem),
            _ => archive.with_extension("d"),
        }
    }
}

impl Step for Decompress {
    fn parameters(&self) -> &'static [&'static str] {
        &Self::PARAMS
    }

    fn outputs(&self) -> &'static [&'static str] {
        &Self::OUTPUT
    }

    async fn execute(&self, cx: &StepContext, input: Payload) -> StateResult<Payload> {
        let archive = cx.resolve(input.require(Self::PATH).or_cancel()?);
        let target = match input.optional(Self::TARGET) {
            Some(target) => cx.resolve(target),
            None => Self::default_target(&archive),
        };
        let existed = target.exists();

        debug!("extracting {archive:?} to {target:?}…");
        let file = tokio::fs::File::open(&archive).await.or_cancel()?;
        let mut reader = BufReader::new(file).compat();

        match extract_archive(ZipFileReader::new(&mut reader), &target).await {
            Ok(files) => {
                info!("successfully extracted {files} files from {archive:?} to {target:?}");
                Ok(Payload::from_pairs([
                    (Self::TARGET, target.display().to_string()),
                    (Self::FILES, files.to_string()),
                ]))
            }
            Err(err) => {
                error!("failed to extract {archive:?} to {target:?}: {err}");
                if !existed {
                    drop(tokio::fs::remove_dir_all(&target).await);
                }
                Err(err).or_cancel()
            }
        }
    }
}
