//! API error types

use thiserror::Error;

pub const ADD_EXPENDITURE_FAILED: &str = "Failed to add expenditure. Please try again.";
pub const LOAD_RISK_ISSUES_FAILED: &str = "Failed to load risks/issues.";
pub const UPDATE_STATUS_FAILED: &str = "Failed to update status";
pub const SUBMIT_FAILED: &str = "Failed to submit.";
pub const LOAD_EXPENDITURES_FAILED: &str = "Failed to load expenditures.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error (status {status}): {}", message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("Failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Build a status error from a non-2xx response body
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        ApiError::Status {
            status,
            message: extract_message(body),
        }
    }

    /// Message supplied by the server payload, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// The single string shown to the user for any failure
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

fn extract_message(body: &[u8]) -> Option<String> {
    let payload: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| payload.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_message_then_error() {
        let err = ApiError::from_status(422, br#"{"message":"The title field is required.","error":"x"}"#);
        assert_eq!(err.user_message(SUBMIT_FAILED), "The title field is required.");

        let err = ApiError::from_status(403, br#"{"error":"Only owners can report risks"}"#);
        assert_eq!(err.user_message(SUBMIT_FAILED), "Only owners can report risks");
    }

    #[test]
    fn test_falls_back_without_usable_payload() {
        let html = ApiError::from_status(500, b"<html>Server Error</html>");
        assert_eq!(html.user_message(ADD_EXPENDITURE_FAILED), ADD_EXPENDITURE_FAILED);

        let non_string = ApiError::from_status(500, br#"{"message": 42}"#);
        assert_eq!(non_string.user_message(UPDATE_STATUS_FAILED), UPDATE_STATUS_FAILED);

        let blank = ApiError::from_status(400, br#"{"message": "  "}"#);
        assert_eq!(blank.user_message(SUBMIT_FAILED), SUBMIT_FAILED);
    }

    #[test]
    fn test_decode_errors_use_fallback() {
        let decode = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err = ApiError::from(decode);
        assert_eq!(err.user_message(LOAD_RISK_ISSUES_FAILED), LOAD_RISK_ISSUES_FAILED);
    }
}
