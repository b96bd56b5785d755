//! Error types raised by the analysis engine.

use thiserror::Error;

/// Reason a single input row was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowFault {
    #[error("year field {0:?} is not an integer")]
    BadYear(String),

    #[error("column {column} holds {field:?}, which is not a number")]
    BadValue { column: usize, field: String },

    #[error("column {column} is missing")]
    MissingColumn { column: usize },

    #[error("record is unreadable: {0}")]
    Unreadable(String),

    #[error("year {year} does not follow previous year {previous}")]
    NonIncreasingYear { year: i32, previous: i32 },
}

/// Reason a regression could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Degeneracy {
    #[error("at least 2 points are required, but got {0}")]
    TooFewPoints(usize),

    #[error("x has {xs} values but y has {ys}")]
    LengthMismatch { xs: usize, ys: usize },

    #[error("x values have zero variance")]
    ZeroVariance,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Recovered at the row level: the row is dropped and counted.
    #[error("malformed row at line {line}: {fault}")]
    MalformedRow { line: usize, fault: RowFault },

    /// Surfaced to the caller of the specific regression.
    #[error("degenerate input: {0}")]
    DegenerateInput(#[from] Degeneracy),
}

pub type EngineResult<T> = Result<T, EngineError>;
