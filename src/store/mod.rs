pub mod paths;
pub mod receipt_store;

pub use paths::*;
pub use receipt_store::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("A receipt named '{0}' is already in the store")]
    DestinationExists(String),

    #[error("No document named '{0}' in the store")]
    DocumentNotFound(String),

    #[error("Source path has no usable filename: {}", .0.display())]
    InvalidFilename(PathBuf),

    #[error("Failed to create receipt store at {}: {source}", .path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
