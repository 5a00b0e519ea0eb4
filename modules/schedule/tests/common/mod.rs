#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use schedule::contract::model::{NewCourse, NewExam, Registration, User};
use schedule::domain::caller::Caller;
use schedule::domain::ports::FixedClock;
use schedule::infra::storage::migrations::Migrator;
use schedule::{ScheduleConfig, ScheduleModule};

/// Fresh in-memory database with every migration applied.
pub async fn create_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub fn test_config() -> ScheduleConfig {
    ScheduleConfig {
        bcrypt_cost: 4,
        ..ScheduleConfig::default()
    }
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// Module over a fresh database with the clock pinned to [`now`].
pub async fn create_test_module() -> ScheduleModule {
    create_test_module_at(now()).await
}

pub async fn create_test_module_at(at: DateTime<Utc>) -> ScheduleModule {
    let db = create_test_db().await;
    ScheduleModule::with_clock(db, test_config(), Arc::new(FixedClock(at)))
}

pub fn registration(name: &str, email: &str) -> Registration {
    Registration {
        name: name.to_string(),
        email: email.to_string(),
        password: "correct horse".to_string(),
    }
}

pub async fn register(module: &ScheduleModule, name: &str, email: &str) -> (User, Caller) {
    let user = module
        .accounts()
        .register(registration(name, email))
        .await
        .expect("registration failed");
    let caller = Caller::from(&user);
    (user, caller)
}

pub fn new_course(title: &str, day: &str, start: &str, end: &str, mode: &str) -> NewCourse {
    NewCourse {
        title: title.to_string(),
        day: day.to_string(),
        start: start.to_string(),
        end: end.to_string(),
        mode: mode.to_string(),
    }
}

pub fn new_exam(title: &str, kind: &str, date: &str) -> NewExam {
    NewExam {
        title: title.to_string(),
        kind: kind.to_string(),
        date: date.to_string(),
        start: "09:00".to_string(),
        end: "11:00".to_string(),
    }
}
