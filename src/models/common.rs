use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Envelope every JSON endpoint answers with: `success` plus either `data`
/// or an `error` object, never both. Raffle clients branch on `success`
/// alone and only read `error.code` when it is false.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

/// Machine-readable error code plus a human-readable message, e.g.
/// `VALIDATION_ERROR` / "Number 131 is outside 1..=130".
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn error(code: String, message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: None,
            error: Some(ApiError { code, message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_the_error_field() {
        let json = serde_json::to_value(ApiResponse::success(vec![5, 12])).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([5, 12]));
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_envelope_omits_the_data_field() {
        let json = serde_json::to_value(ApiResponse::<()>::error(
            "NOT_FOUND".to_string(),
            "Transaction t1 not found".to_string(),
        ))
        .unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert!(json.get("data").is_none());
    }
}
