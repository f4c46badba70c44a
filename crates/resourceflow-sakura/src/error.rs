//! Sakura Cloud provider error types

use resourceflow_core::ServiceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SakuraError {
    #[error("usacloud not found. Please install: brew install usacloud")]
    UsacloudNotFound,

    #[error("usacloud command failed: {0}")]
    CommandFailed(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SakuraError>;

/// Phrases usacloud prints when the API answered without a bare status
const STATUS_PHRASES: [(&str, &str); 4] = [
    ("not found", "404"),
    ("conflict", "409"),
    ("too many requests", "429"),
    ("bad request", "400"),
];

/// Picks an HTTP status out of usacloud's stderr
///
/// Only standalone three-digit words count, so resource IDs that happen to
/// contain "404" are not mistaken for a status.
pub fn code_from_stderr(stderr: &str) -> Option<String> {
    let status = stderr
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| word.len() == 3)
        .filter_map(|word| word.parse::<u16>().ok())
        .find(|status| (400..=599).contains(status));
    if let Some(status) = status {
        return Some(status.to_string());
    }

    let lower = stderr.to_ascii_lowercase();
    STATUS_PHRASES
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, code)| code.to_string())
}

impl From<SakuraError> for ServiceError {
    fn from(error: SakuraError) -> Self {
        let code = match &error {
            SakuraError::UsacloudNotFound => "UsacloudNotFound".to_string(),
            SakuraError::CommandFailed(stderr) => {
                code_from_stderr(stderr).unwrap_or_else(|| "CommandFailed".to_string())
            }
            SakuraError::JsonError(_) => "MalformedResponse".to_string(),
            SakuraError::IoError(_) => "NetworkFailure".to_string(),
        };
        ServiceError::new(code, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_from_stderr() {
        assert_eq!(
            code_from_stderr("Error: 404 Not Found: server 113100404123 is not exists").as_deref(),
            Some("404")
        );
        assert_eq!(
            code_from_stderr("API error: status=409 (still migrating)").as_deref(),
            Some("409")
        );
        assert_eq!(
            code_from_stderr("server 113500012345: resource not found").as_deref(),
            Some("404")
        );
        assert_eq!(code_from_stderr("flag provided but not defined"), None);
    }

    #[test]
    fn test_into_service_error() {
        let error: ServiceError =
            SakuraError::CommandFailed("503 Service Unavailable".to_string()).into();
        assert_eq!(error.code, "503");
        assert!(error.message.contains("usacloud command failed"));

        let error: ServiceError = SakuraError::CommandFailed("unknown flag".to_string()).into();
        assert_eq!(error.code, "CommandFailed");
    }
}
