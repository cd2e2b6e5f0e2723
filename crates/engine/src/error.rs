//! The module contains the errors the engine can throw.
//!
//! - [`EngineError`] is returned by the report pipeline itself.
//! - [`ServiceError`] is what a [`ReportService`] reports when the remote
//!   side fails; the view turns it into a notice instead of propagating it.
//! - [`DateRangeError`] is the checked validation state of a date range.
//!
//!  [`ReportService`]: crate::ReportService
use thiserror::Error;

/// Why a user-entered date range cannot be used.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("invalid format")]
    InvalidFormat,
    #[error("end before start")]
    EndBeforeStart,
}

/// Failure of an external collaborator (catalog lookup, report service,
/// document render or spreadsheet download).
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("{status}: {message}")]
    Server { status: u16, message: String },
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid date range: {0}")]
    InvalidDateRange(#[from] DateRangeError),
    #[error("Date out of range: {0}")]
    DateOutOfRange(String),
    #[error("Unknown report kind: {0}")]
    UnknownKind(String),
    #[error("Unknown date preset: {0}")]
    UnknownPreset(String),
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Catalog not offered by this report: {0}")]
    CatalogNotOffered(String),
    #[error("Export refused: {0}")]
    ExportRefused(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidDateRange(a), Self::InvalidDateRange(b)) => a == b,
            (Self::DateOutOfRange(a), Self::DateOutOfRange(b)) => a == b,
            (Self::UnknownKind(a), Self::UnknownKind(b)) => a == b,
            (Self::UnknownPreset(a), Self::UnknownPreset(b)) => a == b,
            (Self::UnknownOption(a), Self::UnknownOption(b)) => a == b,
            (Self::CatalogNotOffered(a), Self::CatalogNotOffered(b)) => a == b,
            (Self::ExportRefused(a), Self::ExportRefused(b)) => a == b,
            (Self::Service(a), Self::Service(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
