//! Client errors

use serde::Deserialize;

/// Error entry of a failed API response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("API request failed with status {status}: {}", format_errors(.errors))]
    Api { status: u16, errors: Vec<ApiError> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("API response contained no items")]
    EmptyResponse,
}

impl ClientError {
    /// Whether the API reported an error with this code
    pub fn has_code(&self, code: &str) -> bool {
        match self {
            ClientError::Api { errors, .. } => errors.iter().any(|e| e.code == code),
            _ => false,
        }
    }

    /// Whether the API reported an error with this code and a message
    /// containing `needle`
    pub fn matches(&self, code: &str, needle: &str) -> bool {
        match self {
            ClientError::Api { errors, .. } => errors
                .iter()
                .any(|e| e.code == code && e.message.contains(needle)),
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn format_errors(errors: &[ApiError]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(ApiError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: &str, message: &str) -> ClientError {
        ClientError::Api {
            status: 400,
            errors: vec![ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }],
        }
    }

    #[test]
    fn classifies_by_code_and_message() {
        let err = api_error(
            "InvalidParameterValue",
            "Invalid IAM Instance Profile name",
        );
        assert!(err.has_code("InvalidParameterValue"));
        assert!(err.matches("InvalidParameterValue", "Invalid IAM Instance Profile"));
        assert!(!err.matches("InvalidParameterValue", "subnet"));
        assert!(!ClientError::EmptyResponse.has_code("InvalidParameterValue"));
    }

    #[test]
    fn display_lists_all_errors() {
        let err = ClientError::Api {
            status: 400,
            errors: vec![
                ApiError {
                    code: "A".to_string(),
                    message: "first".to_string(),
                },
                ApiError {
                    code: "B".to_string(),
                    message: "second".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "API request failed with status 400: A: first; B: second"
        );
        assert_eq!(err.status(), Some(400));
    }
}
