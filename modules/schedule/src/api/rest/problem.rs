//! Error bodies in the `application/problem+json` format (RFC 9457).

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Body of every failed schedule request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Points at the error catalogue entry for `code`.
    #[serde(rename = "type")]
    pub type_url: String,
    /// Same for every occurrence of a given `code`.
    pub title: String,
    pub status: u16,
    /// What went wrong with this particular request.
    pub detail: String,
    /// Path of the failing request.
    pub instance: String,
    /// Stable `SCHEDULE_*` identifier clients can branch on.
    pub code: String,
    /// Span id of the handler, when one was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_string(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: String::new(),
            code: String::new(),
            trace_id: None,
        }
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_instance(mut self, path: impl Into<String>) -> Self {
        self.instance = path.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }
}

/// Handler error type; renders the wrapped [`Problem`] with its own status.
#[derive(Debug, Clone)]
pub struct ProblemResponse(pub Problem);

impl From<Problem> for ProblemResponse {
    fn from(p: Problem) -> Self {
        Self(p)
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_PROBLEM_JSON))],
            Json(self.0),
        )
            .into_response()
    }
}
