use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, wrong field kind, etc.).
    ConfigValidation(String),
    /// A referenced canonical field does not exist on one side.
    UnknownField { table: String, field: String },
    /// Match key has no field pairs.
    EmptyMatchKey,
    /// Tolerance is negative or not finite.
    InvalidTolerance(f64),
    /// In-memory CSV text could not be parsed.
    Csv(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownField { table, field } => {
                write!(f, "table '{table}': unknown field '{field}'")
            }
            Self::EmptyMatchKey => write!(f, "match key must contain at least one field pair"),
            Self::InvalidTolerance(t) => {
                write!(f, "tolerance must be finite and non-negative, got {t}")
            }
            Self::Csv(msg) => write!(f, "CSV parse error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
