use anyhow::{anyhow, Context};

use crate::contract::model::{Course, Exam, Role, User};
use crate::domain::repo::{SessionRecord, StoredUser};
use crate::infra::storage::entity::{course, exam, session, user};

/// Unknown role strings fall back to the least privileged role.
pub fn role_from_column(raw: &str) -> Role {
    raw.parse().unwrap_or(Role::Student)
}

pub fn user_to_contract(m: user::Model) -> User {
    User {
        id: m.id,
        role: role_from_column(&m.role),
        name: m.name,
        email: m.email,
        created_at: m.created_at,
    }
}

pub fn user_to_stored(m: user::Model) -> StoredUser {
    let password_hash = m.password_hash.clone();
    StoredUser {
        user: user_to_contract(m),
        password_hash,
    }
}

pub fn course_to_contract(m: course::Model) -> anyhow::Result<Course> {
    Ok(Course {
        day: m
            .day
            .parse()
            .map_err(|e: String| anyhow!(e))
            .with_context(|| format!("course {} has a bad day", m.id))?,
        mode: m
            .mode
            .parse()
            .map_err(|e: String| anyhow!(e))
            .with_context(|| format!("course {} has a bad mode", m.id))?,
        id: m.id,
        owner_id: m.owner_id,
        title: m.title,
        start: m.start,
        end: m.end,
    })
}

pub fn exam_to_contract(m: exam::Model) -> anyhow::Result<Exam> {
    Ok(Exam {
        kind: m
            .kind
            .parse()
            .map_err(|e: String| anyhow!(e))
            .with_context(|| format!("exam {} has a bad kind", m.id))?,
        id: m.id,
        owner_id: m.owner_id,
        title: m.title,
        date: m.date,
        start: m.start,
        end: m.end,
    })
}

pub fn session_to_record(m: session::Model) -> SessionRecord {
    SessionRecord {
        token: m.token,
        user_id: m.user_id,
        created_at: m.created_at,
        expires_at: m.expires_at,
    }
}
