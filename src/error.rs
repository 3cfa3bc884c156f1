//! Error handling for cube construction
//!
//! This module provides:
//! - `CubeError`, the single error type of the library core
//! - `ErrorCode` classification with stable integer codes and metric categories
//!
//! The application layer (`pipeline`, `config`, `main`) wraps these in `anyhow`
//! with context; the binary maps the root cause back to an `ErrorCode` for its
//! exit status.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable error codes, also used as process exit codes by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// Label was empty after normalization
    InvalidLabel = 10,
    /// Geographic code has no entry in a code map
    UnresolvedCode = 11,
    /// Input table is missing a column or carries an unusable cell
    MalformedSource = 12,
    /// An IRI, blank node id or language tag could not be built
    InvalidIdentifier = 13,
    /// Writing the serialized graph failed
    Serialization = 14,
    /// File I/O error
    IoError = 15,
    /// Configuration rejected before the run started
    Configuration = 16,
    /// Anything else
    Internal = 70,
}

impl ErrorCode {
    /// Get the integer code
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Get the error category for logs
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::InvalidLabel | ErrorCode::MalformedSource => "input_error",
            ErrorCode::UnresolvedCode => "resolution_error",
            ErrorCode::InvalidIdentifier => "identifier_error",
            ErrorCode::Serialization | ErrorCode::IoError => "io_error",
            ErrorCode::Configuration => "configuration_error",
            ErrorCode::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

// =============================================================================
// CUBE ERROR
// =============================================================================

/// Errors raised while loading tables and building a cube.
#[derive(Debug, Error)]
pub enum CubeError {
    /// Raw label normalized to an empty key.
    #[error("invalid label {label:?}{}", row_suffix(.row))]
    InvalidLabel { label: String, row: Option<usize> },

    /// Code absent from a code map. Always fatal: observations must resolve
    /// to every level of the hierarchy.
    #[error("unresolved code {code:?} in code map '{map}'{}", row_suffix(.row))]
    UnresolvedCode {
        code: String,
        map: String,
        row: Option<usize>,
    },

    /// Input table cannot satisfy the column contract of the cube.
    #[error("malformed source table '{table}': {detail}")]
    MalformedSource { table: String, detail: String },

    #[error("invalid IRI {iri:?}: {reason}")]
    Iri { iri: String, reason: String },

    #[error("invalid language tag {tag:?}: {reason}")]
    LanguageTag { tag: String, reason: String },

    #[error("failed to read table '{table}': {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to serialize graph: {0}")]
    Serialization(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" at row {row}"),
        None => String::new(),
    }
}

impl CubeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CubeError::InvalidLabel { .. } => ErrorCode::InvalidLabel,
            CubeError::UnresolvedCode { .. } => ErrorCode::UnresolvedCode,
            CubeError::MalformedSource { .. } | CubeError::Csv { .. } => {
                ErrorCode::MalformedSource
            }
            CubeError::Iri { .. } | CubeError::LanguageTag { .. } => ErrorCode::InvalidIdentifier,
            CubeError::Serialization(_) => ErrorCode::Serialization,
            CubeError::Io(_) => ErrorCode::IoError,
        }
    }

    pub fn malformed(table: impl Into<String>, detail: impl Into<String>) -> Self {
        CubeError::MalformedSource {
            table: table.into(),
            detail: detail.into(),
        }
    }

    /// Attach a source row number if the error does not carry one yet.
    pub fn at_row(self, index: usize) -> Self {
        match self {
            CubeError::InvalidLabel { label, row: None } => CubeError::InvalidLabel {
                label,
                row: Some(index),
            },
            CubeError::UnresolvedCode {
                code,
                map,
                row: None,
            } => CubeError::UnresolvedCode {
                code,
                map,
                row: Some(index),
            },
            other => other,
        }
    }
}

pub type CubeResult<T> = std::result::Result<T, CubeError>;

/// Classify an application-level error chain for the process exit code.
pub fn error_code_of(error: &anyhow::Error) -> ErrorCode {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CubeError>())
        .map(CubeError::code)
        .unwrap_or(ErrorCode::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_row_is_attached_once() {
        let err = CubeError::UnresolvedCode {
            code: "A9".into(),
            map: "county->region".into(),
            row: None,
        }
        .at_row(4)
        .at_row(7);

        assert_eq!(
            err.to_string(),
            "unresolved code \"A9\" in code map 'county->region' at row 4"
        );
    }

    #[test]
    fn test_error_code_found_through_context() {
        let result: anyhow::Result<()> = Err(CubeError::malformed("codelist", "missing column"))
            .context("loading code list");
        let err = result.unwrap_err();
        assert_eq!(error_code_of(&err), ErrorCode::MalformedSource);
        assert_eq!(error_code_of(&err).category(), "input_error");
    }

    #[test]
    fn test_unknown_errors_are_internal() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(error_code_of(&err), ErrorCode::Internal);
        assert_eq!(ErrorCode::Internal.code(), 70);
    }
}
