// ABOUTME: Centralized error handling for the application
// Provides consistent error types and conversions

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Please add your OpenAI API key to continue.")]
    MissingCredential,

    #[error("Unknown model '{0}': no pricing entry")]
    UnknownModel(String),

    #[error("{}", provider_message(.status, .message))]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn provider_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Provider error ({}): {}", code, message),
        None => format!("Provider error: {}", message),
    }
}

impl ChatError {
    pub fn provider(message: impl Into<String>) -> Self {
        ChatError::Provider {
            status: None,
            message: message.into(),
        }
    }

    /// Errors that reject a turn before anything is sent to the provider.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ChatError::MissingCredential | ChatError::UnknownModel(_))
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Provider {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_message() {
        assert_eq!(
            ChatError::MissingCredential.to_string(),
            "Please add your OpenAI API key to continue."
        );
    }

    #[test]
    fn test_provider_message_with_status() {
        let err = ChatError::Provider {
            status: Some(429),
            message: "Rate limit reached".to_string(),
        };
        assert_eq!(err.to_string(), "Provider error (429): Rate limit reached");
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_rejections() {
        assert!(ChatError::MissingCredential.is_rejection());
        assert!(ChatError::UnknownModel("gpt-9".into()).is_rejection());
        assert!(!ChatError::provider("boom").is_rejection());
    }
}
