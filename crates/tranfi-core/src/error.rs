use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("schema error: {0}")]
    Schema(String),

    /// Plan validation: unknown op, bad arguments, codec placement.
    #[error("{0}")]
    Plan(String),

    #[error("expression error: {0}")]
    Expr(String),

    #[error("hashing error: {0}")]
    Hash(String),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Plan(format!("invalid plan JSON: {e}"))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Plan(format!("invalid plan YAML: {e}"))
    }
}

/// A non-fatal, per-row problem. Written to the errors channel as one JSON
/// line; the pipeline keeps going.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub op: String,
    pub message: String,
    pub row: Option<u64>,
}

impl RowError {
    pub fn new(op: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            message: message.into(),
            row: None,
        }
    }

    pub fn at_row(mut self, row: u64) -> Self {
        self.row = Some(row);
        self
    }

    /// `{"op":..,"error":..}` plus `"row":n` when known.
    pub fn to_json_line(&self) -> String {
        let quote = |s: &str| serde_json::Value::String(s.to_string()).to_string();
        let mut line = format!("{{\"op\":{},\"error\":{}", quote(&self.op), quote(&self.message));
        if let Some(r) = self.row {
            line.push_str(&format!(",\"row\":{r}"));
        }
        line.push_str("}\n");
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_error_line() {
        let e = RowError::new("select", "column 'x' not found");
        assert_eq!(
            e.to_json_line(),
            "{\"op\":\"select\",\"error\":\"column 'x' not found\"}\n"
        );
        assert!(e.at_row(3).to_json_line().contains("\"row\":3"));
    }
}
