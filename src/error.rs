//! Error handling for survey file parsing and writing.
//!
//! Every parse error carries the offending file path, and a line number where
//! a specific record can be blamed. A single malformed line aborts the parse
//! of its file; survey data is never silently dropped or repaired.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Underlying file open/read/write failure, with path context
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Survey header block could not be parsed
    #[error("malformed survey header in {} (line {line}): {reason}", path.display())]
    MalformedHeader {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Shot record line could not be parsed
    #[error("malformed shot in {} (line {line}): {reason}", path.display())]
    MalformedShot {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Unexpected line tag or sentinel for the declared format
    #[error("unrecognized '{token}' token in {} (line {line})", path.display())]
    UnrecognizedToken {
        path: PathBuf,
        line: usize,
        token: String,
    },

    /// Two surveys in one project share a designation
    #[error("duplicate survey designation '{designation}'")]
    DuplicateDesignation { designation: String },

    /// Designation lookup miss; the one error callers handle routinely
    #[error("no survey with designation '{designation}'")]
    SurveyNotFound { designation: String },

    /// A model value cannot be rendered within the .DAT column constraints
    #[error("value '{value}' for {field} cannot be represented in the .DAT format: {reason}")]
    Unrepresentable {
        field: String,
        value: String,
        reason: String,
    },
}

impl Error {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a malformed-header error
    pub fn malformed_header(
        path: impl Into<PathBuf>,
        line: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedHeader {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a malformed-shot error
    pub fn malformed_shot(
        path: impl Into<PathBuf>,
        line: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedShot {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create an unrecognized-token error
    pub fn unrecognized_token(
        path: impl Into<PathBuf>,
        line: usize,
        token: impl Into<String>,
    ) -> Self {
        Self::UnrecognizedToken {
            path: path.into(),
            line,
            token: token.into(),
        }
    }

    /// Create a duplicate-designation error
    pub fn duplicate_designation(designation: impl Into<String>) -> Self {
        Self::DuplicateDesignation {
            designation: designation.into(),
        }
    }

    /// Create a lookup-miss error
    pub fn survey_not_found(designation: impl Into<String>) -> Self {
        Self::SurveyNotFound {
            designation: designation.into(),
        }
    }

    /// Create an unrepresentable-value error for the writer
    pub fn unrepresentable(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unrepresentable {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
