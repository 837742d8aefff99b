//! Errors raised while preparing & playing animation packages.
//!
//! Nothing here ever reaches the caller's completion callback: each failure is logged where it
//! happens and the offending item / sub-package simply contributes fewer layers.

use std::path::PathBuf;
use thiserror::Error;


#[derive(Debug, Error)]
pub enum PlayerError {

    #[error("No manifest found at '{path}'")]
    MissingManifest { path: PathBuf },

    #[error("Malformed manifest '{path}': {source}")]
    MalformedManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Manifest entry #{position} has no `packageName`")]
    MissingPackageName { position: usize },

    #[error("Sub-package directory '{path}' does not exist")]
    MissingSubPackage { path: PathBuf },

    #[error("No animation definition found at '{path}'")]
    MissingAnimationDefinition { path: PathBuf },

    #[error("Malformed animation definition '{path}': {source}")]
    MalformedAnimationDefinition {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not load image '{path}': {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Could not enumerate images in '{path}': {source}")]
    ImageEnumeration {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("The animation view was disposed")]
    ViewDisposed,

    #[error("The presentation thread is gone")]
    PresentationGone,
}

impl PlayerError {

    /// maps a failed read of `path` to [PlayerError::Io], or to `not_found(path)` if the file is simply absent
    pub(crate) fn from_read(path: PathBuf, err: std::io::Error, not_found: impl FnOnce(PathBuf) -> Self) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            not_found(path)
        } else {
            PlayerError::Io { path, source: err }
        }
    }
}
