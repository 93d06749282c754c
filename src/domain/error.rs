//! Domain error types.

/// Top-level error type for riskoff.
#[derive(Debug, thiserror::Error)]
pub enum RiskoffError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("expected '{column}' column")]
    MissingColumn { column: String },

    #[error("schema error: {reason}")]
    Schema { reason: String },

    #[error("empty price series")]
    EmptySeries,

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RiskoffError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        RiskoffError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing_column(column: &str) -> Self {
        RiskoffError::MissingColumn {
            column: column.to_string(),
        }
    }

    /// Invalid parameter passed to a pipeline stage.
    pub fn is_configuration(&self) -> bool {
        matches!(self, RiskoffError::InvalidParameter { .. })
    }

    /// Input table is missing a column or is malformed.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            RiskoffError::MissingColumn { .. } | RiskoffError::Schema { .. }
        )
    }
}

impl From<&RiskoffError> for std::process::ExitCode {
    fn from(err: &RiskoffError) -> Self {
        let code: u8 = match err {
            RiskoffError::Io(_) => 1,
            RiskoffError::ConfigParse { .. }
            | RiskoffError::ConfigMissing { .. }
            | RiskoffError::ConfigInvalid { .. } => 2,
            RiskoffError::Data { .. } => 3,
            RiskoffError::MissingColumn { .. } | RiskoffError::Schema { .. } => 4,
            RiskoffError::InvalidParameter { .. } | RiskoffError::EmptySeries => 5,
        };
        std::process::ExitCode::from(code)
    }
}
