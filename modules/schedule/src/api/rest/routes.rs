use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};

use crate::api::rest::auth::CookieSettings;
use crate::api::rest::handlers;
use crate::domain::accounts::AccountService;
use crate::domain::service::Service;

/// Mount every schedule route on `router` and attach the services they use.
pub fn register_routes(
    router: Router,
    accounts: Arc<AccountService>,
    service: Arc<Service>,
    cookies: CookieSettings,
) -> Router {
    router
        // Accounts
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", get(handlers::logout).post(handlers::logout))
        // Own schedule
        .route("/dashboard", get(handlers::dashboard))
        .route("/course", post(handlers::create_course))
        .route("/course/{id}/delete", post(handlers::delete_course))
        .route("/exam", post(handlers::create_exam))
        .route("/exam/{id}/delete", post(handlers::delete_exam))
        .route("/api/my-schedule", get(handlers::my_schedule))
        .route("/api/stats", get(handlers::stats))
        // Import / export
        .route("/export/courses.csv", get(handlers::export_courses_csv))
        .route("/export/exams.csv", get(handlers::export_exams_csv))
        .route("/export.json", get(handlers::export_json))
        .route("/import", post(handlers::import))
        // Administration
        .route("/admin", get(handlers::admin_overview))
        .route("/admin/users", get(handlers::admin_list_users))
        .route("/admin/user/{id}/make-admin", post(handlers::make_admin))
        .route("/admin/user/{id}/remove-admin", post(handlers::remove_admin))
        .route("/admin/user/{id}/delete", post(handlers::delete_user))
        .route("/admin/clear-all", post(handlers::clear_all))
        .layer(Extension(accounts))
        .layer(Extension(service))
        .layer(Extension(cookies))
}
