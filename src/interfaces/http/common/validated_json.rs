//! Validated JSON extractor for Axum
//!
//! `ValidatedJson<T>` works like `axum::Json<T>`, but additionally runs
//! `validator::Validate::validate()` on the deserialized value. Both parse
//! and validation failures answer 400 with the standard error envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::ApiError;

/// An extractor that deserializes JSON and validates it.
pub struct ValidatedJson<T>(pub T);

/// Error type for `ValidatedJson` extraction failures.
pub enum ValidatedJsonRejection {
    /// JSON parsing failed.
    JsonError(JsonRejection),
    /// Validation failed.
    ValidationError(validator::ValidationErrors),
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            Self::JsonError(rejection) => {
                ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", rejection))
                    .into_response()
            }
            Self::ValidationError(errors) => {
                let field_errors: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |e| {
                            let msg = e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| format!("{:?}", e.code));
                            format!("{}: {}", field, msg)
                        })
                    })
                    .collect();

                let message = if field_errors.is_empty() {
                    "VALIDATION_FAILED".to_string()
                } else {
                    field_errors.join("; ")
                };
                ApiError::new(StatusCode::BAD_REQUEST, message).into_response()
            }
        }
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(
        req: axum::extract::Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::JsonError)?;

        value
            .validate()
            .map_err(ValidatedJsonRejection::ValidationError)?;

        Ok(ValidatedJson(value))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct TestBody {
        #[validate(length(min = 1, max = 10))]
        name: String,
        #[validate(range(min = 1, max = 8))]
        seats: u32,
    }

    async fn handler(ValidatedJson(_body): ValidatedJson<TestBody>) -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new().route("/test", post(handler))
    }

    async fn send(req: Request<Body>) -> axum::http::Response<Body> {
        use tower::Service;
        let mut svc = app().into_service();
        svc.call(req).await.unwrap()
    }

    #[tokio::test]
    async fn valid_body_returns_ok() {
        let body = serde_json::json!({"name": "Campus", "seats": 3});
        let req = Request::builder()
            .method("POST")
            .uri("/test")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let resp = send(req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_json_returns_400() {
        let req = Request::builder()
            .method("POST")
            .uri("/test")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();

        let resp = send(req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn validation_failure_returns_400() {
        let body = serde_json::json!({"name": "", "seats": 0});
        let req = Request::builder()
            .method("POST")
            .uri("/test")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let resp = send(req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
