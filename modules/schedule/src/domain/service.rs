use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{
    ClearSummary, Course, Exam, ExamKind, ImportSummary, Mode, NewCourse, NewExam, Schedule,
    StatsReport, Weekday,
};
use crate::domain::caller::Caller;
use crate::domain::error::DomainError;
use crate::domain::insights::{compute_schedule_insights_with_window, parse_minutes};
use crate::domain::ports::Clock;
use crate::domain::repo::ScheduleRepository;
use crate::domain::transfer::{self, ImportFormat};

/// Domain service for a user's own courses and exams.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn ScheduleRepository>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_title_length: usize,
    pub upcoming_exam_window_days: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_title_length: 200,
            upcoming_exam_window_days: crate::domain::insights::DEFAULT_UPCOMING_WINDOW_DAYS,
        }
    }
}

impl Service {
    pub fn new(repo: Arc<dyn ScheduleRepository>, clock: Arc<dyn Clock>, config: ServiceConfig) -> Self {
        Self {
            repo,
            clock,
            config,
        }
    }

    #[instrument(name = "schedule.service.create_course", skip(self, caller, new), fields(owner = %caller.user_id))]
    pub async fn create_course(&self, caller: &Caller, new: NewCourse) -> Result<Course, DomainError> {
        let course = self.build_course(caller.user_id, new)?;
        self.repo
            .insert_course(course.clone())
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        info!(course_id = %course.id, "Created course");
        Ok(course)
    }

    #[instrument(name = "schedule.service.create_exam", skip(self, caller, new), fields(owner = %caller.user_id))]
    pub async fn create_exam(&self, caller: &Caller, new: NewExam) -> Result<Exam, DomainError> {
        let exam = self.build_exam(caller.user_id, new)?;
        self.repo
            .insert_exam(exam.clone())
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        info!(exam_id = %exam.id, "Created exam");
        Ok(exam)
    }

    /// Missing and not-owned look the same to the caller.
    #[instrument(name = "schedule.service.delete_course", skip(self, caller), fields(owner = %caller.user_id))]
    pub async fn delete_course(&self, caller: &Caller, id: Uuid) -> Result<(), DomainError> {
        let deleted = self
            .repo
            .delete_course(caller.user_id, id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if !deleted {
            return Err(DomainError::not_found("Course"));
        }
        info!("Deleted course");
        Ok(())
    }

    #[instrument(name = "schedule.service.delete_exam", skip(self, caller), fields(owner = %caller.user_id))]
    pub async fn delete_exam(&self, caller: &Caller, id: Uuid) -> Result<(), DomainError> {
        let deleted = self
            .repo
            .delete_exam(caller.user_id, id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if !deleted {
            return Err(DomainError::not_found("Exam"));
        }
        info!("Deleted exam");
        Ok(())
    }

    #[instrument(name = "schedule.service.schedule", skip_all, fields(owner = %caller.user_id))]
    pub async fn schedule(&self, caller: &Caller) -> Result<Schedule, DomainError> {
        let db = |e: anyhow::Error| DomainError::database(e.to_string());
        let courses = self.repo.list_courses(caller.user_id).await.map_err(db)?;
        let exams = self.repo.list_exams(caller.user_id).await.map_err(db)?;
        debug!(courses = courses.len(), exams = exams.len(), "Loaded schedule");
        Ok(Schedule { courses, exams })
    }

    pub fn stats_for(&self, schedule: &Schedule) -> StatsReport {
        compute_schedule_insights_with_window(
            &schedule.courses,
            &schedule.exams,
            self.clock.today(),
            self.config.upcoming_exam_window_days,
        )
    }

    /// Schedule plus the statistics derived from it.
    #[instrument(name = "schedule.service.dashboard", skip_all, fields(owner = %caller.user_id))]
    pub async fn dashboard(&self, caller: &Caller) -> Result<(Schedule, StatsReport), DomainError> {
        let schedule = self.schedule(caller).await?;
        let stats = self.stats_for(&schedule);
        Ok((schedule, stats))
    }

    pub async fn stats(&self, caller: &Caller) -> Result<StatsReport, DomainError> {
        Ok(self.dashboard(caller).await?.1)
    }

    pub async fn export_courses_csv(&self, caller: &Caller) -> Result<Vec<u8>, DomainError> {
        let schedule = self.schedule(caller).await?;
        transfer::courses_to_csv(&schedule.courses).map_err(|e| DomainError::internal(e.to_string()))
    }

    pub async fn export_exams_csv(&self, caller: &Caller) -> Result<Vec<u8>, DomainError> {
        let schedule = self.schedule(caller).await?;
        transfer::exams_to_csv(&schedule.exams).map_err(|e| DomainError::internal(e.to_string()))
    }

    pub async fn export_json(&self, caller: &Caller) -> Result<String, DomainError> {
        let schedule = self.schedule(caller).await?;
        transfer::schedule_to_json(&schedule).map_err(|e| DomainError::internal(e.to_string()))
    }

    /// Parses, validates and stores every row of an import file, or nothing.
    #[instrument(name = "schedule.service.import", skip(self, caller, body), fields(owner = %caller.user_id, bytes = body.len()))]
    pub async fn import(
        &self,
        caller: &Caller,
        format: ImportFormat,
        body: &[u8],
    ) -> Result<ImportSummary, DomainError> {
        let parsed = transfer::parse_import(format, body)?;

        let courses = parsed
            .courses
            .into_iter()
            .enumerate()
            .map(|(i, raw)| {
                self.build_course(caller.user_id, raw)
                    .map_err(|e| row_error("course", i, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let exams = parsed
            .exams
            .into_iter()
            .enumerate()
            .map(|(i, raw)| {
                self.build_exam(caller.user_id, raw)
                    .map_err(|e| row_error("exam", i, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let summary = ImportSummary {
            courses_imported: courses.len(),
            exams_imported: exams.len(),
        };
        self.repo
            .insert_batch(courses, exams)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        info!(
            courses = summary.courses_imported,
            exams = summary.exams_imported,
            "Imported schedule rows"
        );
        Ok(summary)
    }

    /// Wipes every course and exam in the system. Users are kept.
    #[instrument(name = "schedule.service.clear_all", skip_all, fields(caller = %caller.user_id))]
    pub async fn clear_all(&self, caller: &Caller) -> Result<ClearSummary, DomainError> {
        caller.require_admin()?;
        let summary = self
            .repo
            .clear_all()
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        info!(
            courses = summary.courses_deleted,
            exams = summary.exams_deleted,
            "Cleared all schedule data"
        );
        Ok(summary)
    }

    // --- validation helpers ---

    fn build_course(&self, owner_id: Uuid, new: NewCourse) -> Result<Course, DomainError> {
        let title = self.validate_title(&new.title)?;
        let day: Weekday = required("day", &new.day)?
            .parse()
            .map_err(|m: String| DomainError::validation("day", m))?;
        let mode: Mode = required("mode", &new.mode)?
            .parse()
            .map_err(|m: String| DomainError::validation("mode", m))?;
        let start = validate_time("start", &new.start)?;
        let end = validate_time("end", &new.end)?;
        Ok(Course {
            id: Uuid::now_v7(),
            owner_id,
            title,
            day,
            start,
            end,
            mode,
        })
    }

    fn build_exam(&self, owner_id: Uuid, new: NewExam) -> Result<Exam, DomainError> {
        let title = self.validate_title(&new.title)?;
        let kind: ExamKind = required("kind", &new.kind)?
            .parse()
            .map_err(|m: String| DomainError::validation("kind", m))?;
        let date = validate_date(&new.date)?;
        let start = validate_time("start", &new.start)?;
        let end = validate_time("end", &new.end)?;
        Ok(Exam {
            id: Uuid::now_v7(),
            owner_id,
            title,
            kind,
            date,
            start,
            end,
        })
    }

    fn validate_title(&self, raw: &str) -> Result<String, DomainError> {
        let title = required("title", raw)?;
        if title.chars().count() > self.config.max_title_length {
            return Err(DomainError::validation(
                "title",
                format!("must be at most {} characters", self.config.max_title_length),
            ));
        }
        Ok(title.to_string())
    }
}

fn required<'a>(field: &str, raw: &'a str) -> Result<&'a str, DomainError> {
    let v = raw.trim();
    if v.is_empty() {
        return Err(DomainError::validation(field, "is required"));
    }
    Ok(v)
}

/// Canonical zero-padded `HH:MM`.
fn validate_time(field: &str, raw: &str) -> Result<String, DomainError> {
    let minutes = parse_minutes(required(field, raw)?)
        .ok_or_else(|| DomainError::validation(field, "must be a time in HH:MM format"))?;
    Ok(format!("{:02}:{:02}", minutes / 60, minutes % 60))
}

fn validate_date(raw: &str) -> Result<String, DomainError> {
    let date = NaiveDate::parse_from_str(required("date", raw)?, "%Y-%m-%d")
        .map_err(|_| DomainError::validation("date", "must be a date in YYYY-MM-DD format"))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

fn row_error(entity: &str, index: usize, e: DomainError) -> DomainError {
    match e {
        DomainError::Validation { field, message } => {
            DomainError::import(format!("{entity} #{}: {field} {message}", index + 1))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times_are_canonicalized() {
        assert_eq!(validate_time("start", " 9:05").unwrap(), "09:05");
        assert!(matches!(
            validate_time("start", "25:00"),
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            validate_time("end", "  "),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(validate_date("2025-01-09").unwrap(), "2025-01-09");
        assert!(validate_date("09/01/2025").is_err());
        assert!(validate_date("2025-02-30").is_err());
    }

    #[test]
    fn import_row_errors_name_the_row() {
        let e = row_error("course", 2, DomainError::validation("day", "is required"));
        assert_eq!(e.to_string(), "Import rejected: course #3: day is required");
    }

    mod tracing_output {
        use std::sync::Arc;

        use chrono::{TimeZone, Utc};
        use sea_orm::Database;
        use tracing_test::traced_test;

        use crate::config::ScheduleConfig;
        use crate::contract::model::{NewCourse, Registration};
        use crate::domain::caller::Caller;
        use crate::domain::ports::FixedClock;
        use crate::module::ScheduleModule;

        async fn module() -> ScheduleModule {
            let db = Database::connect("sqlite::memory:").await.unwrap();
            ScheduleModule::migrate(&db).await.unwrap();
            let cfg = ScheduleConfig {
                bcrypt_cost: 4,
                ..ScheduleConfig::default()
            };
            let clock = FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());
            ScheduleModule::with_clock(db, cfg, Arc::new(clock))
        }

        #[tokio::test]
        #[traced_test]
        async fn course_creation_is_logged_inside_its_span() {
            let module = module().await;
            let user = module
                .accounts()
                .register(Registration {
                    name: "Alice".into(),
                    email: "alice@example.com".into(),
                    password: "pw".into(),
                })
                .await
                .unwrap();
            let caller = Caller::from(&user);

            module
                .service()
                .create_course(
                    &caller,
                    NewCourse {
                        title: "Math".into(),
                        day: "Monday".into(),
                        start: "09:00".into(),
                        end: "10:00".into(),
                        mode: "Onsite".into(),
                    },
                )
                .await
                .unwrap();

            assert!(logs_contain("schedule.service.create_course"));
            assert!(logs_contain("Created course"));
            assert!(logs_contain(&user.id.to_string()));
        }

        #[tokio::test]
        #[traced_test]
        async fn refused_last_admin_removal_is_warned() {
            let module = module().await;
            let user = module
                .accounts()
                .register(Registration {
                    name: "Alice".into(),
                    email: "alice@example.com".into(),
                    password: "pw".into(),
                })
                .await
                .unwrap();
            let caller = Caller::from(&user);

            assert!(module.accounts().demote(&caller, user.id).await.is_err());
            assert!(logs_contain("Refused to remove the last administrator"));
        }
    }
}
