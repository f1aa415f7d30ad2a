//! Error taxonomy for the mount and unmount workflows.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutomountError {
    /// Malformed or missing arguments. Nothing was touched.
    #[error("usage: {0}")]
    Usage(String),

    /// The process lacks the privilege a live run needs.
    #[error("{0}")]
    Privilege(String),

    /// A mount precondition failed before any mutation.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A command or write failed while creating or activating units.
    #[error("{step} failed: {detail}")]
    FatalCommand { step: String, detail: String },

    #[error("configuration {path}: {detail}")]
    Config { path: PathBuf, detail: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl AutomountError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// The message followed by every underlying cause, `: `-separated.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        out
    }
}

pub type AutomountResult<T> = Result<T, AutomountError>;
