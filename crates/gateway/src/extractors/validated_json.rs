//! Validated JSON extractor.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use common::{AppError, FieldError};

/// JSON extractor that automatically validates the payload.
///
/// Failures carry the offending input, the target type and one entry per
/// failing field.
pub struct ValidatedJson<T>(pub T);

fn type_label<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(input) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let value = match serde_json::from_value::<T>(input.clone()) {
            Ok(value) => value,
            Err(e) => {
                return Err(AppError::ValidationFailed {
                    input,
                    target: type_label::<T>(),
                    errors: vec![FieldError::from_serde(&e)],
                })
            }
        };

        if let Err(e) = value.validate() {
            return Err(AppError::ValidationFailed {
                input,
                target: type_label::<T>(),
                errors: FieldError::from_validation(&e),
            });
        }

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use domain::UserData;

    fn request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_payload() {
        let body = r#"{"username":"alice","email":"alice@x.com","password":"qwe123qwe123"}"#;
        let ValidatedJson(data) = ValidatedJson::<UserData>::from_request(request(body), &())
            .await
            .unwrap();
        assert_eq!(data.username, "alice");
    }

    #[tokio::test]
    async fn test_field_errors_are_collected() {
        let body = r#"{"username":"","email":"nope","password":"qwe123qwe123"}"#;
        let err = ValidatedJson::<UserData>::from_request(request(body), &())
            .await
            .err()
            .unwrap();

        match err {
            AppError::ValidationFailed { target, errors, input } => {
                assert_eq!(target, "UserData");
                assert_eq!(input["email"], "nope");
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "username"]);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_shape_is_reported_on_body() {
        let err = ValidatedJson::<UserData>::from_request(request(r#"{"username":1}"#), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            AppError::ValidationFailed { ref errors, .. } if errors[0].field == "body"
        ));
    }
}
