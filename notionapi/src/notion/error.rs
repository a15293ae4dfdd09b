use reqwest::StatusCode;
use thiserror::Error;

use super::types::ErrorResponse;

/// API が 2xx 以外を返したときのエラー
/// `body` はレスポンスをそのまま保持する
#[derive(Error, Debug, Clone)]
#[error("{status} {body}")]
pub struct ApiError {
    pub status: StatusCode,
    pub body: String,
}

impl ApiError {
    pub fn response(&self) -> Option<ErrorResponse> {
        serde_json::from_str(&self.body).ok()
    }
}

#[test]
fn test_api_error_response() {
    let err = ApiError {
        status: StatusCode::BAD_REQUEST,
        body: r#"{"object":"error","status":400,"code":"validation_error","message":"bad"}"#
            .to_string(),
    };
    assert_eq!(err.response().map(|r| r.code), Some("validation_error".to_string()));
    assert!(err.to_string().starts_with("400 Bad Request {"));
}
