use axum::{Json, http::StatusCode, response::IntoResponse};
use greeting_schema::ErrorBody;
use thiserror::Error as ThisError;

/// Body text returned when the relation could not be made available.
pub const TABLE_CREATION_FAILED: &str = "Table creation failed.";

/// Terminal failures of one greeting invocation.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum HandlerError {
    /// The relation is still missing after the schema check.
    #[error("{}", TABLE_CREATION_FAILED)]
    SchemaUnavailable,

    /// A read or seed failed; carries the store's message unmodified.
    #[error("{0}")]
    StorageFailure(String),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> axum::response::Response {
        let body = match self {
            HandlerError::SchemaUnavailable => ErrorBody::new(TABLE_CREATION_FAILED),
            HandlerError::StorageFailure(message) => ErrorBody::new(message),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: HandlerError) -> (StatusCode, String) {
        let resp = err.into_response();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn schema_unavailable_renders_fixed_message() {
        let (status, body) = render(HandlerError::SchemaUnavailable).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"Table creation failed."}"#);
    }

    #[tokio::test]
    async fn storage_failure_renders_store_message() {
        let (status, body) =
            render(HandlerError::StorageFailure("permission denied".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"permission denied"}"#);
    }
}
