/// Result alias that carries the custom [`ScatterError`] type.
pub type Result<T> = std::result::Result<T, ScatterError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum ScatterError {
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The tabular reader could not decode the input.
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    /// The configuration file is not valid JSON for [`crate::AppConfig`].
    #[error("invalid configuration: {0}")]
    Config(#[source] serde_json::Error),
    /// A required column is absent from the header row.
    #[error("required column `{0}` is missing")]
    MissingColumn(String),
    /// The header names the same column more than once.
    #[error("column `{0}` appears more than once in the header")]
    DuplicateColumn(String),
    /// A row was rejected during ingestion.
    #[error("row {row} rejected: {reason}")]
    MalformedRow { row: usize, reason: String },
    /// Relative scaling hit a zero, negative or missing denominator.
    #[error("row {row}: cannot scale by `{field}` (denominator {denominator:?})")]
    DivisionByZero {
        row: usize,
        field: String,
        denominator: Option<f64>,
    },
    /// A view field has no numeric value on the record.
    #[error("row {row}: no numeric value for `{field}`")]
    MissingField { row: usize, field: String },
    /// The per-row annotation list is not a JSON array of triples.
    #[error("row {row}: malformed annotations: {source}")]
    AnnotationParse {
        row: usize,
        #[source]
        source: serde_json::Error,
    },
    /// A selection named a field that is not selectable.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// An interaction targeted a mark that is not in the current scene.
    #[error("no rendered mark for row {0}")]
    UnknownMark(usize),
    /// The initial data load failed.
    #[error("failed to load dataset: {0}")]
    Load(String),
}

impl ScatterError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Returns true for failures that exclude a single point but leave the
    /// rest of the render pass intact.
    pub fn is_point_local(&self) -> bool {
        matches!(
            self,
            Self::DivisionByZero { .. } | Self::MissingField { .. }
        )
    }
}

impl From<&str> for ScatterError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ScatterError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_local_errors_are_flagged() {
        let err = ScatterError::DivisionByZero {
            row: 3,
            field: "nr_tokens".to_string(),
            denominator: Some(0.0),
        };
        assert!(err.is_point_local());
        assert!(err.to_string().contains("row 3"));
        assert!(!ScatterError::UnknownMark(1).is_point_local());
    }
}
