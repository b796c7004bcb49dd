//! Response Envelope
//!
//! Every scheduler operation answers with `{code, msg, data}`:
//! `code=0` on success, `code=1` on failure with `data=null`.

use crate::domain::error::SchedulerResult;
use serde::{Deserialize, Serialize};

pub const CODE_SUCCESS: u8 = 0;
pub const CODE_FAILURE: u8 = 1;

/// Standard response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u8,
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Success carrying a payload.
    pub fn success(data: T, msg: impl Into<String>) -> Self {
        Self {
            code: CODE_SUCCESS,
            msg: msg.into(),
            data: Some(data),
        }
    }

    /// Success with no payload.
    pub fn done(msg: impl Into<String>) -> Self {
        Self {
            code: CODE_SUCCESS,
            msg: msg.into(),
            data: None,
        }
    }

    /// Failure; `data` is always null.
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            code: CODE_FAILURE,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }

    /// Wrap a scheduler result; errors render through their `Display`.
    pub fn from_result(result: SchedulerResult<T>, msg: impl Into<String>) -> Self {
        match result {
            Ok(data) => Self::success(data, msg),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Render the envelope as JSON for the networking layer.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::SchedulerError;

    #[test]
    fn test_success_json_shape() {
        let response = ApiResponse::success(vec!["b1"], "ok");
        let json: serde_json::Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();

        assert_eq!(json, serde_json::json!({"code": 0, "msg": "ok", "data": ["b1"]}));
    }

    #[test]
    fn test_error_json_has_null_data() {
        let response: ApiResponse<Vec<String>> = ApiResponse::error("Backend not found");
        let json: serde_json::Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();

        assert_eq!(json["code"], 1);
        assert_eq!(json["msg"], "Backend not found");
        assert!(json["data"].is_null());
        assert!(!response.is_success());
    }

    #[test]
    fn test_from_result_error_uses_display() {
        let result: SchedulerResult<u32> = Err(SchedulerError::InvalidWeight(0));
        let response = ApiResponse::from_result(result, "unused");

        assert_eq!(response.code, CODE_FAILURE);
        assert_eq!(response.msg, "weight must be between 1 and 4294967295, got 0");
        assert_eq!(response.data, None);
    }

    #[test]
    fn test_done_has_no_data() {
        let response: ApiResponse<()> = ApiResponse::done("Backend removed successfully");
        assert!(response.is_success());
        assert_eq!(response.to_json().unwrap(), r#"{"code":0,"msg":"Backend removed successfully","data":null}"#);
    }
}
