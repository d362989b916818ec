use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between reading a source and producing an
/// aggregation result.  Empty results are never an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The dataset could not be read at all.  Fatal to the session.
    #[error("data source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    /// Required columns are absent after header normalization.
    #[error("schema mismatch: missing required column(s) {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    /// A data row violates the record invariants.
    #[error("invalid record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("value {value} is outside the allowed range {min}..={max}")]
    InvalidRange { value: i64, min: u32, max: u32 },

    /// A filter value that was not produced by the column's enumeration.
    #[error("'{value}' is not an observed value of column '{column}'")]
    InvalidFilterValue { column: String, value: String },

    #[error("query parameter '{0}' is not bound")]
    UnboundParameter(String),

    /// Structural fault inside the aggregation engine.
    #[error("aggregation failed: {reason}")]
    Aggregation { reason: String },
}

impl Error {
    pub fn aggregation(reason: impl Into<String>) -> Self {
        Error::Aggregation {
            reason: reason.into(),
        }
    }

    /// Whether the error belongs to the aggregation class, i.e. is scoped to
    /// a single display region rather than the whole session.
    pub fn is_aggregation_fault(&self) -> bool {
        matches!(self, Error::Aggregation { .. } | Error::UnboundParameter(_))
    }
}
