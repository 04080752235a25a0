use h3o::error::{CompactionError, InvalidGeometry, InvalidLatLng};
use pgrx::pg_sys::panic::{ErrorReport, ErrorReportable};
use pgrx::prelude::PgSqlErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgH3Error {
    #[error("could not convert the value '{0}' to a H3 index")]
    InvalidIndex(String),

    #[error("invalid H3 resolution: {0} (must be between 0 and 15)")]
    InvalidResolution(i32),

    #[error("could not convert the coordinates ({x} {y}) to a H3 index: {source}")]
    InvalidCoordinates {
        x: f64,
        y: f64,
        source: InvalidLatLng,
    },

    #[error("index {index} has no parent at resolution {resolution}")]
    NoParent { index: String, resolution: i32 },

    #[error("the k-ring distance must not be negative")]
    NegativeDistance,

    #[error("invalid polygon geometry: {0}")]
    InvalidGeometry(#[from] InvalidGeometry),

    #[error("error while compacting the h3 indexes: {0}")]
    Compaction(#[from] CompactionError),

    #[error("h3 index at array position {0} is null")]
    NullArrayElement(usize),

    #[error(
        "pgh3.polyfill_mem: requested memory allocation ({requested}) exceeds the upper limit ({limit_mb}MB)"
    )]
    PolyfillMemExceeded { requested: String, limit_mb: usize },
}

impl From<PgH3Error> for ErrorReport {
    fn from(value: PgH3Error) -> Self {
        let error_code = match &value {
            PgH3Error::InvalidIndex(_)
            | PgH3Error::InvalidCoordinates { .. }
            | PgH3Error::NoParent { .. }
            | PgH3Error::Compaction(_) => PgSqlErrorCode::ERRCODE_EXTERNAL_ROUTINE_EXCEPTION,

            PgH3Error::InvalidResolution(_)
            | PgH3Error::NegativeDistance
            | PgH3Error::InvalidGeometry(_) => PgSqlErrorCode::ERRCODE_INVALID_PARAMETER_VALUE,

            PgH3Error::NullArrayElement(_) => PgSqlErrorCode::ERRCODE_NULL_VALUE_NOT_ALLOWED,

            PgH3Error::PolyfillMemExceeded { .. } => {
                PgSqlErrorCode::ERRCODE_CONFIGURATION_LIMIT_EXCEEDED
            }
        };
        ErrorReport::new(error_code, format!("{value}"), "")
    }
}

pub type PgH3Result<T> = Result<T, PgH3Error>;

/// Unwraps a result at the `#[pg_extern]` boundary, reporting errors to
/// Postgres with the SQLSTATE chosen above instead of a generic panic.
pub(crate) trait ReportableError {
    type Output;

    fn report_unwrap(self) -> Self::Output;
}

impl<T, E: Into<ErrorReport>> ReportableError for Result<T, E> {
    type Output = T;

    fn report_unwrap(self) -> Self::Output {
        self.map_err(|e| e.into()).unwrap_or_report()
    }
}
