//! SeaORM-backed implementation of the domain repository ports.
//!
//! `SeaOrmRepository` is generic over the connection so it can be built from a
//! `DatabaseConnection` in production and from an in-memory SQLite connection
//! in tests. Multi-row writes open their own transaction.

use anyhow::Context;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::warn;
use uuid::Uuid;

use crate::contract::model::{ClearSummary, Course, Exam, Role, User};
use crate::domain::repo::{
    ScheduleRepository, SessionRecord, SessionsRepository, StoredUser, UsersRepository,
};
use crate::infra::storage::entity::{course, exam, session, user};
use crate::infra::storage::mapper;

/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

/// Drops rows whose stored enum columns no longer parse, logging each one.
fn skip_unreadable<T>(rows: impl IntoIterator<Item = anyhow::Result<T>>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match row {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Skipping unreadable stored row");
                None
            }
        })
        .collect()
}

fn course_am(c: Course) -> course::ActiveModel {
    course::ActiveModel {
        id: Set(c.id),
        owner_id: Set(c.owner_id),
        title: Set(c.title),
        day: Set(c.day.to_string()),
        start: Set(c.start),
        end: Set(c.end),
        mode: Set(c.mode.to_string()),
    }
}

fn exam_am(e: Exam) -> exam::ActiveModel {
    exam::ActiveModel {
        id: Set(e.id),
        owner_id: Set(e.owner_id),
        title: Set(e.title),
        kind: Set(e.kind.to_string()),
        date: Set(e.date),
        start: Set(e.start),
        end: Set(e.end),
    }
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let found = user::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_by_id failed")?;
        Ok(found.map(mapper::user_to_contract))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<StoredUser>> {
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("find_by_email failed")?;
        Ok(found.map(mapper::user_to_stored))
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("email_exists failed")?;
        Ok(count > 0)
    }

    async fn count_users(&self) -> anyhow::Result<u64> {
        user::Entity::find()
            .count(&self.conn)
            .await
            .context("count_users failed")
    }

    async fn count_admins(&self) -> anyhow::Result<u64> {
        user::Entity::find()
            .filter(user::Column::Role.eq(Role::Admin.as_str()))
            .count(&self.conn)
            .await
            .context("count_admins failed")
    }

    async fn insert_user(&self, u: User, password_hash: String) -> anyhow::Result<()> {
        let m = user::ActiveModel {
            id: Set(u.id),
            name: Set(u.name),
            email: Set(u.email),
            password_hash: Set(password_hash),
            role: Set(u.role.as_str().to_string()),
            created_at: Set(u.created_at),
        };
        let _ = m.insert(&self.conn).await.context("insert_user failed")?;
        Ok(())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> anyhow::Result<bool> {
        let res = user::Entity::update_many()
            .col_expr(user::Column::Role, Expr::value(role.as_str()))
            .filter(user::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("set_role failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn delete_user_cascade(&self, id: Uuid) -> anyhow::Result<bool> {
        let txn = self.conn.begin().await.context("begin failed")?;
        session::Entity::delete_many()
            .filter(session::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .context("delete sessions failed")?;
        course::Entity::delete_many()
            .filter(course::Column::OwnerId.eq(id))
            .exec(&txn)
            .await
            .context("delete courses failed")?;
        exam::Entity::delete_many()
            .filter(exam::Column::OwnerId.eq(id))
            .exec(&txn)
            .await
            .context("delete exams failed")?;
        let res = user::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .context("delete user failed")?;
        txn.commit().await.context("commit failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let rows = user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .all(&self.conn)
            .await
            .context("list_users failed")?;
        Ok(rows.into_iter().map(mapper::user_to_contract).collect())
    }
}

#[async_trait::async_trait]
impl<C> SessionsRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn insert_session(&self, s: SessionRecord) -> anyhow::Result<()> {
        let m = session::ActiveModel {
            token: Set(s.token),
            user_id: Set(s.user_id),
            created_at: Set(s.created_at),
            expires_at: Set(s.expires_at),
        };
        let _ = m.insert(&self.conn).await.context("insert_session failed")?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> anyhow::Result<Option<SessionRecord>> {
        let found = session::Entity::find_by_id(token.to_string())
            .one(&self.conn)
            .await
            .context("find_session failed")?;
        Ok(found.map(mapper::session_to_record))
    }

    async fn delete_session(&self, token: &str) -> anyhow::Result<bool> {
        let res = session::Entity::delete_by_id(token.to_string())
            .exec(&self.conn)
            .await
            .context("delete_session failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let res = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await
            .context("purge_expired failed")?;
        Ok(res.rows_affected)
    }
}

#[async_trait::async_trait]
impl<C> ScheduleRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn insert_course(&self, c: Course) -> anyhow::Result<()> {
        let _ = course_am(c)
            .insert(&self.conn)
            .await
            .context("insert_course failed")?;
        Ok(())
    }

    async fn insert_exam(&self, e: Exam) -> anyhow::Result<()> {
        let _ = exam_am(e)
            .insert(&self.conn)
            .await
            .context("insert_exam failed")?;
        Ok(())
    }

    async fn insert_batch(&self, courses: Vec<Course>, exams: Vec<Exam>) -> anyhow::Result<()> {
        let txn = self.conn.begin().await.context("begin failed")?;
        for c in courses {
            course_am(c)
                .insert(&txn)
                .await
                .context("batch course insert failed")?;
        }
        for e in exams {
            exam_am(e)
                .insert(&txn)
                .await
                .context("batch exam insert failed")?;
        }
        txn.commit().await.context("commit failed")?;
        Ok(())
    }

    async fn list_courses(&self, owner_id: Uuid) -> anyhow::Result<Vec<Course>> {
        let rows = course::Entity::find()
            .filter(course::Column::OwnerId.eq(owner_id))
            .order_by_asc(course::Column::Id)
            .all(&self.conn)
            .await
            .context("list_courses failed")?;
        Ok(skip_unreadable(rows.into_iter().map(mapper::course_to_contract)))
    }

    async fn list_exams(&self, owner_id: Uuid) -> anyhow::Result<Vec<Exam>> {
        let rows = exam::Entity::find()
            .filter(exam::Column::OwnerId.eq(owner_id))
            .order_by_asc(exam::Column::Id)
            .all(&self.conn)
            .await
            .context("list_exams failed")?;
        Ok(skip_unreadable(rows.into_iter().map(mapper::exam_to_contract)))
    }

    async fn delete_course(&self, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = course::Entity::delete_many()
            .filter(course::Column::Id.eq(id))
            .filter(course::Column::OwnerId.eq(owner_id))
            .exec(&self.conn)
            .await
            .context("delete_course failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn delete_exam(&self, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = exam::Entity::delete_many()
            .filter(exam::Column::Id.eq(id))
            .filter(exam::Column::OwnerId.eq(owner_id))
            .exec(&self.conn)
            .await
            .context("delete_exam failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn count_courses(&self) -> anyhow::Result<u64> {
        course::Entity::find()
            .count(&self.conn)
            .await
            .context("count_courses failed")
    }

    async fn count_exams(&self) -> anyhow::Result<u64> {
        exam::Entity::find()
            .count(&self.conn)
            .await
            .context("count_exams failed")
    }

    async fn clear_all(&self) -> anyhow::Result<ClearSummary> {
        let txn = self.conn.begin().await.context("begin failed")?;
        let courses = course::Entity::delete_many()
            .exec(&txn)
            .await
            .context("clear courses failed")?;
        let exams = exam::Entity::delete_many()
            .exec(&txn)
            .await
            .context("clear exams failed")?;
        txn.commit().await.context("commit failed")?;
        Ok(ClearSummary {
            courses_deleted: courses.rows_affected,
            exams_deleted: exams.rows_affected,
        })
    }
}
