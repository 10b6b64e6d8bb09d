//! JSON response bodies.

use serde::{Deserialize, Serialize};

pub const SUCCESS_STATUS: &str = "success";
pub const SUCCESS_BODY: &str = "Request processed successfully";
pub const REJECTED_STATUS: &str = "Request Failed";
pub const REJECTED_BODY: &str = "Rate limit exceeded. Please try again later.";

/// The `{status, body}` envelope returned by every JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub status: String,
    pub body: String,
}

impl Message {
    pub fn new(status: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            body: body.into(),
        }
    }

    /// Body of a request the inner handler processed.
    pub fn success() -> Self {
        Self::new(SUCCESS_STATUS, SUCCESS_BODY)
    }

    /// Body of a request rejected by the rate limiter.
    pub fn rate_limited() -> Self {
        Self::new(REJECTED_STATUS, REJECTED_BODY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_wire_format() {
        let json = serde_json::to_string(&Message::rate_limited()).unwrap();
        assert_eq!(
            json,
            r#"{"status":"Request Failed","body":"Rate limit exceeded. Please try again later."}"#
        );
    }

    #[test]
    fn test_success_wire_format() {
        let json = serde_json::to_string(&Message::success()).unwrap();
        assert_eq!(json, r#"{"status":"success","body":"Request processed successfully"}"#);
    }
}
