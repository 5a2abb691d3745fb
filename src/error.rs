use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the export engine.
///
/// Only `MissingAssets` is fatal to a batch: it is raised before any session
/// starts. Everything else is caught at the session boundary and converted
/// into an [`ExportOutcome`](crate::flow::ExportOutcome).
#[derive(Error, Debug)]
pub enum Error {
    #[error("language '{language}' is missing required assets: {}", missing.join(", "))]
    MissingAssets {
        language: String,
        missing: Vec<String>,
    },

    #[error("failed to launch client {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("screen capability error: {0}")]
    Screen(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Wrap a capability adapter failure (locator, input injection, capture).
    pub fn screen(err: impl std::fmt::Display) -> Self {
        Error::Screen(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
