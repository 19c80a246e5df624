//! REST response envelope.

use serde::{Deserialize, Serialize};

/// `{code, message, data, success}` envelope wrapped around every REST reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// HTTP-like status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    /// Human-readable status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response data. Absent on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Whether the call succeeded.
    #[serde(default)]
    pub success: bool,
}

impl<T> ApiResponse<T> {
    /// Successful envelope.
    pub fn ok(data: T) -> Self {
        Self { code: Some(200), message: None, data: Some(data), success: true }
    }

    /// Failed envelope.
    pub fn failed(message: impl Into<String>) -> Self {
        Self { code: Some(400), message: Some(message.into()), data: None, success: false }
    }

    /// Data if the call succeeded and carried any.
    pub fn into_data(self) -> Option<T> {
        if self.success { self.data } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WireMessage;

    #[test]
    fn failed_envelope_yields_no_data() {
        let json = r#"{"code":400,"message":"could not load public messages","success":false}"#;
        let resp: ApiResponse<Vec<WireMessage>> = serde_json::from_str(json).unwrap();

        assert!(!resp.success);
        assert_eq!(resp.into_data(), None);
    }

    #[test]
    fn success_envelope_yields_data() {
        let json = r#"{"code":200,"success":true,"data":[{"id":1,"content":"a"}]}"#;
        let resp: ApiResponse<Vec<WireMessage>> = serde_json::from_str(json).unwrap();

        let data = resp.into_data().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].content, "a");
    }
}
