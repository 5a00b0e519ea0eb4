use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::contract::model::{
    AdminOverview, ClearSummary, Course, Exam, ImportSummary, NewCourse, NewExam, Registration,
    StatsReport, User,
};

/// REST DTO for user representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterReq {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginReq {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginReq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginReq")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDto {
    pub id: Uuid,
    pub title: String,
    pub day: String,
    pub start: String,
    pub end: String,
    pub mode: String,
}

/// Missing fields arrive as empty strings and are rejected by validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourseReq {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    "Onsite".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDto {
    pub id: Uuid,
    pub title: String,
    pub kind: String,
    pub date: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExamReq {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDto {
    pub courses: Vec<CourseDto>,
    pub exams: Vec<ExamDto>,
}

/// Statistics as sent on the wire. Count maps keep canonical order.
#[derive(Debug, Clone, Serialize)]
pub struct StatsDto {
    #[serde(serialize_with = "ordered_counts")]
    pub per_day_counts: Vec<(String, usize)>,
    #[serde(serialize_with = "ordered_counts")]
    pub per_mode_counts: Vec<(String, usize)>,
    pub weekly_hours: f64,
    pub sessions_per_week: usize,
    pub exam_count: usize,
    pub midterm_count: usize,
    pub final_count: usize,
    pub upcoming_exam_count: usize,
    pub busiest_day: Option<String>,
    pub remote_percentage: u32,
    pub conflicts: Vec<String>,
    pub insights: Vec<String>,
}

fn ordered_counts<S: Serializer>(entries: &[(String, usize)], s: S) -> Result<S::Ok, S::Error> {
    let mut map = s.serialize_map(Some(entries.len()))?;
    for (k, v) in entries {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardDto {
    pub user: UserDto,
    pub courses: Vec<CourseDto>,
    pub exams: Vec<ExamDto>,
    pub stats: StatsDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListDto {
    pub users: Vec<UserDto>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOverviewDto {
    pub user_count: u64,
    pub admin_count: u64,
    pub course_count: u64,
    pub exam_count: u64,
    pub users: Vec<UserDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummaryDto {
    pub courses_imported: usize,
    pub exams_imported: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearSummaryDto {
    pub courses_deleted: u64,
    pub exams_deleted: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportQuery {
    pub filename: Option<String>,
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            is_admin: u.is_admin(),
            role: u.role.to_string(),
            id: u.id,
            name: u.name,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

impl From<RegisterReq> for Registration {
    fn from(req: RegisterReq) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
        }
    }
}

impl From<Course> for CourseDto {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            title: c.title,
            day: c.day.to_string(),
            start: c.start,
            end: c.end,
            mode: c.mode.to_string(),
        }
    }
}

impl From<CreateCourseReq> for NewCourse {
    fn from(req: CreateCourseReq) -> Self {
        Self {
            title: req.title,
            day: req.day,
            start: req.start,
            end: req.end,
            mode: req.mode,
        }
    }
}

impl From<Exam> for ExamDto {
    fn from(e: Exam) -> Self {
        Self {
            id: e.id,
            title: e.title,
            kind: e.kind.to_string(),
            date: e.date,
            start: e.start,
            end: e.end,
        }
    }
}

impl From<CreateExamReq> for NewExam {
    fn from(req: CreateExamReq) -> Self {
        Self {
            title: req.title,
            kind: req.kind,
            date: req.date,
            start: req.start,
            end: req.end,
        }
    }
}

impl From<StatsReport> for StatsDto {
    fn from(r: StatsReport) -> Self {
        Self {
            per_day_counts: r
                .per_day_counts
                .into_iter()
                .map(|(d, n)| (d.to_string(), n))
                .collect(),
            per_mode_counts: r
                .per_mode_counts
                .into_iter()
                .map(|(m, n)| (m.to_string(), n))
                .collect(),
            weekly_hours: r.weekly_hours,
            sessions_per_week: r.sessions_per_week,
            exam_count: r.exam_count,
            midterm_count: r.midterm_count,
            final_count: r.final_count,
            upcoming_exam_count: r.upcoming_exam_count,
            busiest_day: r.busiest_day.map(|d| d.to_string()),
            remote_percentage: r.remote_percentage,
            conflicts: r.conflicts,
            insights: r.insights,
        }
    }
}

impl From<AdminOverview> for AdminOverviewDto {
    fn from(o: AdminOverview) -> Self {
        Self {
            user_count: o.user_count,
            admin_count: o.admin_count,
            course_count: o.course_count,
            exam_count: o.exam_count,
            users: o.users.into_iter().map(UserDto::from).collect(),
        }
    }
}

impl From<ImportSummary> for ImportSummaryDto {
    fn from(s: ImportSummary) -> Self {
        Self {
            courses_imported: s.courses_imported,
            exams_imported: s.exams_imported,
        }
    }
}

impl From<ClearSummary> for ClearSummaryDto {
    fn from(s: ClearSummary) -> Self {
        Self {
            courses_deleted: s.courses_deleted,
            exams_deleted: s.exams_deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::{Mode, Weekday};
    use crate::domain::insights::compute_schedule_insights;
    use chrono::NaiveDate;

    #[test]
    fn day_counts_serialize_in_week_order() {
        let course = Course {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: "Math".into(),
            day: Weekday::Tuesday,
            start: "09:00".into(),
            end: "10:00".into(),
            mode: Mode::Remote,
        };
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let dto = StatsDto::from(compute_schedule_insights(&[course], &[], today));
        let json = serde_json::to_string(&dto).unwrap();
        let sunday = json.find("\"Sunday\"").unwrap();
        let monday = json.find("\"Monday\"").unwrap();
        let saturday = json.find("\"Saturday\"").unwrap();
        assert!(sunday < monday && monday < saturday);
        assert!(json.contains("\"per_mode_counts\":{\"Onsite\":0,\"Remote\":1}"));
        assert!(json.contains("\"busiest_day\":\"Tuesday\""));
    }

    #[test]
    fn missing_course_mode_defaults_to_onsite() {
        let req: CreateCourseReq =
            serde_json::from_str(r#"{"title":"Art","day":"Mon","start":"09:00","end":"10:00"}"#)
                .unwrap();
        assert_eq!(req.mode, "Onsite");
    }

    #[test]
    fn login_debug_hides_password() {
        let req = LoginReq {
            email: "a@b.c".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{req:?}").contains("hunter2"));
    }
}
