//! Pre-made transactions shared by the workflows.

#![cfg(feature = "archive")]

mod download_file;
mod extract_archive;

pub use download_file::*;
pub use extract_archive::*;
