//! Request extractors.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;

use crate::errors::AppError;

/// `Json<T>` whose rejections are reported as `AppError::Validation`, so a bad
/// body gets the same `ApiResponse` envelope as every other error.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    async fn extract(content_type: &str, body: &str) -> Result<AppJson<Payload>, AppError> {
        let req = axum::http::Request::builder()
            .method("POST")
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        AppJson::<Payload>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn test_valid_body() {
        assert!(extract("application/json", r#"{"name": "Ada"}"#).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejections_use_envelope() {
        for (content_type, body) in [
            ("application/json", r#"{"nom": "Ada"}"#),
            ("application/json", "{"),
            ("text/plain", r#"{"name": "Ada"}"#),
        ] {
            let err = extract(content_type, body).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{err:?}");

            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(json["success"], false);
            assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        }
    }
}
