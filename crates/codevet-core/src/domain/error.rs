//! Domain-level error taxonomy for codevet.

/// Codevet domain errors.
///
/// Only invalid input and infrastructure failures surface as errors; a
/// failing program under test is reported as an `Issue`, never raised.
#[derive(Debug, thiserror::Error)]
pub enum CodevetError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("sandbox provider '{name}' unavailable: {reason}")]
    UnavailableProvider { name: String, reason: String },

    #[error("invalid rule '{id}': {reason}")]
    InvalidRule { id: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for codevet domain operations.
pub type Result<T> = std::result::Result<T, CodevetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodevetError::InvalidInput("no input source given".to_string());
        assert!(err.to_string().contains("invalid input"));

        let err = CodevetError::UnavailableProvider {
            name: "local".to_string(),
            reason: "docker engine not reachable".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("local"));
        assert!(msg.contains("docker engine not reachable"));
    }

    #[test]
    fn test_invalid_rule_error_names_the_rule() {
        let err = CodevetError::InvalidRule {
            id: "my-rule".to_string(),
            reason: "needs a pattern or a check".to_string(),
        };
        assert!(err.to_string().contains("my-rule"));
    }
}
