use axum::http::StatusCode;

use crate::api::rest::problem::{Problem, ProblemResponse};
use crate::domain::error::DomainError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.timetable.local/{code}"))
        .with_code(code)
        .with_instance(instance);

    let problem = match tracing::Span::current().id() {
        Some(id) => problem.with_trace_id(id.into_u64().to_string()),
        None => problem,
    };

    ProblemResponse(problem)
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::Validation { .. } => from_parts(
            StatusCode::BAD_REQUEST,
            "SCHEDULE_VALIDATION",
            "Validation error",
            e.to_string(),
            instance,
        ),
        DomainError::EmailAlreadyExists { email } => from_parts(
            StatusCode::CONFLICT,
            "SCHEDULE_EMAIL_CONFLICT",
            "Email already registered",
            format!("Email '{email}' is already in use"),
            instance,
        ),
        DomainError::InvalidCredentials => from_parts(
            StatusCode::UNAUTHORIZED,
            "SCHEDULE_INVALID_CREDENTIALS",
            "Login failed",
            e.to_string(),
            instance,
        ),
        DomainError::Unauthenticated => from_parts(
            StatusCode::UNAUTHORIZED,
            "SCHEDULE_UNAUTHENTICATED",
            "Unauthenticated",
            e.to_string(),
            instance,
        ),
        DomainError::Forbidden => from_parts(
            StatusCode::FORBIDDEN,
            "SCHEDULE_FORBIDDEN",
            "Forbidden",
            e.to_string(),
            instance,
        ),
        DomainError::NotFound { .. } => from_parts(
            StatusCode::NOT_FOUND,
            "SCHEDULE_NOT_FOUND",
            "Not found",
            e.to_string(),
            instance,
        ),
        DomainError::LastAdmin => from_parts(
            StatusCode::CONFLICT,
            "SCHEDULE_LAST_ADMIN",
            "Last administrator",
            e.to_string(),
            instance,
        ),
        DomainError::Import { .. } => from_parts(
            StatusCode::BAD_REQUEST,
            "SCHEDULE_IMPORT_INVALID",
            "Import rejected",
            e.to_string(),
            instance,
        ),
        DomainError::Database { .. } | DomainError::Internal { .. } => {
            // Details stay in the log.
            tracing::error!(error = ?e, "Internal error while handling request");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "Internal error",
                "An internal error occurred",
                instance,
            )
        }
    }
}
