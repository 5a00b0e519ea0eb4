use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{ClearSummary, Course, Exam, Role, User};

/// A user row together with its password hash. Never crosses the REST boundary.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: String,
}

/// Server-side login session referenced by an opaque cookie token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Persistence operations on accounts.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Lookup by the already-normalized email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<StoredUser>>;
    async fn email_exists(&self, email: &str) -> anyhow::Result<bool>;
    async fn count_users(&self) -> anyhow::Result<u64>;
    async fn count_admins(&self) -> anyhow::Result<u64>;
    async fn insert_user(&self, user: User, password_hash: String) -> anyhow::Result<()>;
    /// Returns false when no such user exists.
    async fn set_role(&self, id: Uuid, role: Role) -> anyhow::Result<bool>;
    /// Removes the user with every course, exam and session they own, atomically.
    async fn delete_user_cascade(&self, id: Uuid) -> anyhow::Result<bool>;
    /// All users, newest first.
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
}

#[async_trait]
pub trait SessionsRepository: Send + Sync {
    async fn insert_session(&self, session: SessionRecord) -> anyhow::Result<()>;
    async fn find_session(&self, token: &str) -> anyhow::Result<Option<SessionRecord>>;
    async fn delete_session(&self, token: &str) -> anyhow::Result<bool>;
    async fn purge_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64>;
}

/// Courses and exams, always scoped by owner except for the admin-wide calls.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn insert_course(&self, course: Course) -> anyhow::Result<()>;
    async fn insert_exam(&self, exam: Exam) -> anyhow::Result<()>;
    /// All-or-nothing bulk insert.
    async fn insert_batch(&self, courses: Vec<Course>, exams: Vec<Exam>) -> anyhow::Result<()>;
    /// In creation order.
    async fn list_courses(&self, owner_id: Uuid) -> anyhow::Result<Vec<Course>>;
    /// In creation order.
    async fn list_exams(&self, owner_id: Uuid) -> anyhow::Result<Vec<Exam>>;
    /// Deletes only when `id` belongs to `owner_id`.
    async fn delete_course(&self, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
    async fn delete_exam(&self, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
    async fn count_courses(&self) -> anyhow::Result<u64>;
    async fn count_exams(&self) -> anyhow::Result<u64>;
    /// Deletes every course and exam of every user; users are kept.
    async fn clear_all(&self) -> anyhow::Result<ClearSummary>;
}
