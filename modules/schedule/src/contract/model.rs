use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Account role. Stored as the lowercase string returned by [`Role::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            other => Err(format!("{other:?} is not a valid role")),
        }
    }
}

/// Registered account (the password hash never leaves the domain layer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Day of a recurring weekly session. Declaration order is the canonical
/// week order (Sunday first) used for reporting and tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    /// Full English names or three-letter abbreviations, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|d| {
                let name = d.as_str().to_ascii_lowercase();
                needle == name || (needle.len() == 3 && name.starts_with(&needle))
            })
            .ok_or_else(|| format!("{:?} is not a weekday", s.trim()))
    }
}

/// Delivery mode of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    Onsite,
    Remote,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Onsite, Mode::Remote];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Onsite => "Onsite",
            Mode::Remote => "Remote",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        match t.to_lowercase().as_str() {
            "onsite" | "on-site" | "inperson" | "in-person" | "presence" | "حضوري" => {
                Ok(Mode::Onsite)
            }
            "remote" | "online" | "عن بعد" | "اونلاين" => Ok(Mode::Remote),
            _ => Err(format!("{t:?} is not a delivery mode")),
        }
    }
}

/// Kind of exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExamKind {
    Midterm,
    Final,
}

impl ExamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExamKind::Midterm => "Midterm",
            ExamKind::Final => "Final",
        }
    }
}

impl fmt::Display for ExamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        match t.to_lowercase().as_str() {
            "midterm" | "mid" | "mid-term" | "ميد" => Ok(ExamKind::Midterm),
            "final" | "فاينل" => Ok(ExamKind::Final),
            _ => Err(format!("{t:?} is not an exam kind")),
        }
    }
}

/// Recurring weekly class session. `start`/`end` are `HH:MM` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub day: Weekday,
    pub start: String,
    pub end: String,
    pub mode: Mode,
}

/// One-off dated assessment. `date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub kind: ExamKind,
    pub date: String,
    pub start: String,
    pub end: String,
}

/// Raw course fields as submitted by a caller; validated by the service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewCourse {
    pub title: String,
    pub day: String,
    pub start: String,
    pub end: String,
    pub mode: String,
}

/// Raw exam fields as submitted by a caller; validated by the service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewExam {
    pub title: String,
    pub kind: String,
    pub date: String,
    pub start: String,
    pub end: String,
}

/// Registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A user's full schedule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    pub courses: Vec<Course>,
    pub exams: Vec<Exam>,
}

/// Derived dashboard statistics for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    /// Every weekday in canonical order, zero-filled.
    pub per_day_counts: Vec<(Weekday, usize)>,
    /// Both modes, always present.
    pub per_mode_counts: Vec<(Mode, usize)>,
    pub weekly_hours: f64,
    pub sessions_per_week: usize,
    pub exam_count: usize,
    pub midterm_count: usize,
    pub final_count: usize,
    pub upcoming_exam_count: usize,
    pub busiest_day: Option<Weekday>,
    pub remote_percentage: u32,
    pub conflicts: Vec<String>,
    pub insights: Vec<String>,
}

impl StatsReport {
    pub fn day_count(&self, day: Weekday) -> usize {
        self.per_day_counts
            .iter()
            .find(|(d, _)| *d == day)
            .map_or(0, |(_, n)| *n)
    }

    pub fn mode_count(&self, mode: Mode) -> usize {
        self.per_mode_counts
            .iter()
            .find(|(m, _)| *m == mode)
            .map_or(0, |(_, n)| *n)
    }
}

/// System-wide counters plus the user list for the admin view.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminOverview {
    pub user_count: u64,
    pub admin_count: u64,
    pub course_count: u64,
    pub exam_count: u64,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub courses_imported: usize,
    pub exams_imported: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearSummary {
    pub courses_deleted: u64,
    pub exams_deleted: u64,
}
