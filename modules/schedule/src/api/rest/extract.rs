//! Body and path helpers whose failures are problem responses instead of
//! axum's plain-text rejections.

use axum::extract::{FromRequest, Request};
use axum::http::Uri;
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::api::rest::error::{from_parts, map_domain_error};
use crate::api::rest::problem::ProblemResponse;
use crate::domain::error::DomainError;

/// JSON request body. A missing content type, broken syntax or a payload of
/// the wrong shape becomes a `SCHEDULE_VALIDATION` problem.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let instance = req.uri().path().to_string();
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(from_parts(
                rejection.status(),
                "SCHEDULE_VALIDATION",
                "Invalid request body",
                rejection.body_text(),
                &instance,
            )),
        }
    }
}

/// Id segment of a route. Anything that is not a UUID cannot name a stored
/// row, so it is reported exactly like a missing one.
pub fn entity_id(raw: &str, entity: &'static str, uri: &Uri) -> Result<Uuid, ProblemResponse> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| map_domain_error(&DomainError::not_found(entity), uri.path()))
}
