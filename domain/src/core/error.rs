//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Unsupported model provider: {0}")]
    UnsupportedProvider(String),

    #[error("Unknown tool server: {0}")]
    UnknownServer(String),

    #[error("Invalid server definition '{name}': {reason}")]
    InvalidServer { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_server_names_the_server() {
        let error = DomainError::InvalidServer {
            name: "filesystem".to_string(),
            reason: "command cannot be empty".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid server definition 'filesystem': command cannot be empty"
        );
    }
}
