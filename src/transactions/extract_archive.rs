use async_zip::{
    base::read::stream::{Ready, ZipFileReader},
    error::ZipError,
};
use futures::io::{AsyncBufRead, AsyncWriteExt as _};
use tokio_util::compat::TokioAsyncWriteCompatExt as _;

use std::path::{Path, PathBuf};

/// Extracts an archive of [`ZipFileReader<Ready<R>>`] to a specified path.
///
/// Returns the number of files written. This function will sanitize the file path and create
/// intermediate directories if possible.
/// Existing files with the same name are overwritten.
///
/// # Errors
///
/// Returns a [`ZipError`] if the archive fails to extract.
pub async fn extract_archive<R, P>(
    archive: ZipFileReader<Ready<R>>,
    path: P,
) -> Result<usize, ZipError>
where
    R: AsyncBufRead + Unpin,
    P: AsRef<Path> + Send + Sync,
{
    tokio::fs::create_dir_all(&path).await?;

    let mut a_ready = archive;
    let mut files = 0;

    while let Some(mut a_reading) = a_ready.next_with_entry().await? {
        let reader = a_reading.reader();
        let Ok(name) = reader.entry().filename().as_str() else {
            a_ready = a_reading.skip().await?;
            continue;
        };
        let p = path.as_ref().join(sanitize_file_path(name));

        if name.ends_with('/') {
            // Is a directory
            if !p.exists() {
                tokio::fs::create_dir_all(&p).await?;
            }
        } else {
            // Creates parent directories. They may not exist if iteration is out of order or the
            // archive does not contain directory entries
            match p.parent() {
                Some(parent) if !parent.is_dir() => tokio::fs::create_dir_all(parent).await?,
                _ => {}
            }

            let mut writer = tokio::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&p)
                .await?
                .compat_write();
            futures::io::copy(a_reading.reader_mut(), &mut writer).await?;
            writer.flush().await?;
            files += 1;
        }

        a_ready = a_reading.done().await?;
    }

    Ok(files)
}

fn sanitize_file_path(path: &str) -> PathBuf {
    // Replaces backwards slashes
    path.replace('\\', "/")
        // Sanitizes each component
        .split('/')
        .map(sanitize_filename::sanitize)
        .filter(|component| !component.is_empty())
        .collect()
}
