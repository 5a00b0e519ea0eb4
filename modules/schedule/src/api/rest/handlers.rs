use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    Extension,
};
use tracing::{error, info};

use crate::api::rest::auth::{AdminUser, CookieSettings, CurrentUser, SessionToken};
use crate::api::rest::dto::{
    AdminOverviewDto, ClearSummaryDto, CourseDto, CreateCourseReq, CreateExamReq, DashboardDto,
    ExamDto, ImportQuery, ImportSummaryDto, LoginReq, RegisterReq, ScheduleDto, StatsDto, UserDto,
    UserListDto,
};
use crate::api::rest::error::map_domain_error;
use crate::api::rest::extract::{entity_id, JsonBody};
use crate::api::rest::problem::ProblemResponse;
use crate::domain::accounts::AccountService;
use crate::domain::service::Service;
use crate::domain::transfer::detect_format;

type Accounts = Extension<Arc<AccountService>>;
type Schedules = Extension<Arc<Service>>;

/// Create an account
pub async fn register(
    uri: Uri,
    Extension(accounts): Accounts,
    JsonBody(req_body): JsonBody<RegisterReq>,
) -> Result<(StatusCode, Json<UserDto>), ProblemResponse> {
    info!("Registering user: {}", req_body.email);

    match accounts.register(req_body.into()).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserDto::from(user)))),
        Err(e) => {
            error!("Failed to register user: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Log in and receive the session cookie
pub async fn login(
    uri: Uri,
    Extension(accounts): Accounts,
    Extension(cookies): Extension<CookieSettings>,
    JsonBody(req_body): JsonBody<LoginReq>,
) -> Result<Response, ProblemResponse> {
    info!("Login attempt for {}", req_body.email);

    match accounts.login(&req_body.email, &req_body.password).await {
        Ok((user, session)) => Ok((
            [(header::SET_COOKIE, cookies.session_cookie(&session.token))],
            Json(UserDto::from(user)),
        )
            .into_response()),
        Err(e) => {
            info!("Login failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Close the current session
pub async fn logout(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    SessionToken(token): SessionToken,
    Extension(accounts): Accounts,
    Extension(cookies): Extension<CookieSettings>,
) -> Result<Response, ProblemResponse> {
    info!("Logging out user {}", caller.user_id);

    if let Some(token) = token {
        accounts
            .logout(&token)
            .await
            .map_err(|e| map_domain_error(&e, uri.path()))?;
    }
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cookies.cleared_cookie())],
    )
        .into_response())
}

/// Caller's schedule together with its statistics
pub async fn dashboard(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(accounts): Accounts,
    Extension(svc): Schedules,
) -> Result<Json<DashboardDto>, ProblemResponse> {
    let user = accounts
        .current_user(&caller)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;

    match svc.dashboard(&caller).await {
        Ok((schedule, stats)) => Ok(Json(DashboardDto {
            user: user.into(),
            courses: schedule.courses.into_iter().map(CourseDto::from).collect(),
            exams: schedule.exams.into_iter().map(ExamDto::from).collect(),
            stats: stats.into(),
        })),
        Err(e) => {
            error!("Failed to build dashboard: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn create_course(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(svc): Schedules,
    JsonBody(req_body): JsonBody<CreateCourseReq>,
) -> Result<(StatusCode, Json<CourseDto>), ProblemResponse> {
    info!("Creating course: {:?}", req_body);

    match svc.create_course(&caller, req_body.into()).await {
        Ok(course) => Ok((StatusCode::CREATED, Json(CourseDto::from(course)))),
        Err(e) => {
            error!("Failed to create course: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn create_exam(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(svc): Schedules,
    JsonBody(req_body): JsonBody<CreateExamReq>,
) -> Result<(StatusCode, Json<ExamDto>), ProblemResponse> {
    info!("Creating exam: {:?}", req_body);

    match svc.create_exam(&caller, req_body.into()).await {
        Ok(exam) => Ok((StatusCode::CREATED, Json(ExamDto::from(exam)))),
        Err(e) => {
            error!("Failed to create exam: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn delete_course(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(svc): Schedules,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ProblemResponse> {
    let id = entity_id(&raw_id, "Course", &uri)?;
    info!("Deleting course: {}", id);

    svc.delete_course(&caller, id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| map_domain_error(&e, uri.path()))
}

pub async fn delete_exam(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(svc): Schedules,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ProblemResponse> {
    let id = entity_id(&raw_id, "Exam", &uri)?;
    info!("Deleting exam: {}", id);

    svc.delete_exam(&caller, id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| map_domain_error(&e, uri.path()))
}

pub async fn my_schedule(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(svc): Schedules,
) -> Result<Json<ScheduleDto>, ProblemResponse> {
    let schedule = svc
        .schedule(&caller)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(Json(ScheduleDto {
        courses: schedule.courses.into_iter().map(CourseDto::from).collect(),
        exams: schedule.exams.into_iter().map(ExamDto::from).collect(),
    }))
}

pub async fn stats(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(svc): Schedules,
) -> Result<Json<StatsDto>, ProblemResponse> {
    svc.stats(&caller)
        .await
        .map(|r| Json(StatsDto::from(r)))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

fn attachment(content_type: &'static str, filename: &str, body: impl IntoResponse) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

pub async fn export_courses_csv(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(svc): Schedules,
) -> Result<Response, ProblemResponse> {
    let bytes = svc
        .export_courses_csv(&caller)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(attachment("text/csv; charset=utf-8", "courses.csv", bytes))
}

pub async fn export_exams_csv(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(svc): Schedules,
) -> Result<Response, ProblemResponse> {
    let bytes = svc
        .export_exams_csv(&caller)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(attachment("text/csv; charset=utf-8", "exams.csv", bytes))
}

pub async fn export_json(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(svc): Schedules,
) -> Result<Response, ProblemResponse> {
    let doc = svc
        .export_json(&caller)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    Ok(attachment("application/json", "schedule.json", doc))
}

/// Bulk-create courses or exams from a CSV or JSON body
pub async fn import(
    uri: Uri,
    CurrentUser(caller): CurrentUser,
    Extension(svc): Schedules,
    Query(query): Query<ImportQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportSummaryDto>, ProblemResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let format = detect_format(query.filename.as_deref(), content_type, &body);
    info!("Importing {} bytes as {:?}", body.len(), format);

    match svc.import(&caller, format, &body).await {
        Ok(summary) => Ok(Json(summary.into())),
        Err(e) => {
            error!("Import failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn admin_overview(
    uri: Uri,
    AdminUser(caller): AdminUser,
    Extension(accounts): Accounts,
) -> Result<Json<AdminOverviewDto>, ProblemResponse> {
    accounts
        .overview(&caller)
        .await
        .map(|o| Json(o.into()))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

pub async fn admin_list_users(
    uri: Uri,
    AdminUser(caller): AdminUser,
    Extension(accounts): Accounts,
) -> Result<Json<UserListDto>, ProblemResponse> {
    let users: Vec<UserDto> = accounts
        .list_users(&caller)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?
        .into_iter()
        .map(UserDto::from)
        .collect();
    Ok(Json(UserListDto {
        total: users.len(),
        users,
    }))
}

pub async fn make_admin(
    uri: Uri,
    AdminUser(caller): AdminUser,
    Extension(accounts): Accounts,
    Path(raw_id): Path<String>,
) -> Result<Json<UserDto>, ProblemResponse> {
    let id = entity_id(&raw_id, "User", &uri)?;
    info!("Promoting user {}", id);

    match accounts.promote(&caller, id).await {
        Ok(user) => Ok(Json(user.into())),
        Err(e) => {
            error!("Failed to promote user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn remove_admin(
    uri: Uri,
    AdminUser(caller): AdminUser,
    Extension(accounts): Accounts,
    Path(raw_id): Path<String>,
) -> Result<Json<UserDto>, ProblemResponse> {
    let id = entity_id(&raw_id, "User", &uri)?;
    info!("Demoting user {}", id);

    match accounts.demote(&caller, id).await {
        Ok(user) => Ok(Json(user.into())),
        Err(e) => {
            error!("Failed to demote user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn delete_user(
    uri: Uri,
    AdminUser(caller): AdminUser,
    Extension(accounts): Accounts,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ProblemResponse> {
    let id = entity_id(&raw_id, "User", &uri)?;
    info!("Deleting user {}", id);

    match accounts.delete_user(&caller, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn clear_all(
    uri: Uri,
    AdminUser(caller): AdminUser,
    Extension(svc): Schedules,
) -> Result<Json<ClearSummaryDto>, ProblemResponse> {
    info!("Clearing all schedule data");

    svc.clear_all(&caller)
        .await
        .map(|s| Json(s.into()))
        .map_err(|e| map_domain_error(&e, uri.path()))
}
