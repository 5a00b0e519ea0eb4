use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{AdminOverview, Registration, Role, User};
use crate::domain::caller::Caller;
use crate::domain::error::DomainError;
use crate::domain::ports::Clock;
use crate::domain::repo::{ScheduleRepository, SessionRecord, SessionsRepository, UsersRepository};

/// Longest session lifetime handed out, whatever the configuration says.
pub const MAX_SESSION_TTL_HOURS: u32 = 24 * 365 * 10;

/// Account, session and administration rules.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepository>,
    sessions: Arc<dyn SessionsRepository>,
    schedule: Arc<dyn ScheduleRepository>,
    clock: Arc<dyn Clock>,
    config: AccountsConfig,
    // Verified against when the email is unknown.
    dummy_hash: Arc<OnceCell<String>>,
}

#[derive(Debug, Clone)]
pub struct AccountsConfig {
    pub session_ttl_hours: u32,
    pub bcrypt_cost: u32,
    pub max_name_length: usize,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24 * 7,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            max_name_length: 100,
        }
    }
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepository>,
        sessions: Arc<dyn SessionsRepository>,
        schedule: Arc<dyn ScheduleRepository>,
        clock: Arc<dyn Clock>,
        config: AccountsConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            schedule,
            clock,
            config,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Creates an account. The very first account becomes an administrator.
    #[instrument(name = "schedule.accounts.register", skip(self, reg), fields(email = %reg.email))]
    pub async fn register(&self, reg: Registration) -> Result<User, DomainError> {
        let name = reg.name.trim().to_string();
        let email = normalize_email(&reg.email);
        self.validate_registration(&name, &email, &reg.password)?;

        if self
            .users
            .email_exists(&email)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
        {
            return Err(DomainError::email_already_exists(email));
        }

        // Two concurrent first registrations can both observe zero users.
        let existing = self
            .users
            .count_users()
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        let role = if existing == 0 {
            Role::Admin
        } else {
            Role::Student
        };

        let password_hash = hash_password(reg.password, self.config.bcrypt_cost).await?;
        let user = User {
            id: Uuid::now_v7(),
            name,
            email,
            role,
            created_at: self.clock.now(),
        };
        if let Err(e) = self.users.insert_user(user.clone(), password_hash).await {
            // A concurrent registration may have taken the email since the check above.
            if self.users.email_exists(&user.email).await.unwrap_or(false) {
                return Err(DomainError::email_already_exists(user.email));
            }
            return Err(DomainError::database(e.to_string()));
        }

        info!(user_id = %user.id, role = %user.role, "Registered user");
        Ok(user)
    }

    /// Verifies credentials and opens a session. Unknown email and wrong
    /// password produce the same error.
    #[instrument(name = "schedule.accounts.login", skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, SessionRecord), DomainError> {
        let email = normalize_email(email);
        let stored = self
            .users
            .find_by_email(&email)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        let Some(stored) = stored else {
            let dummy = self.dummy_hash().await?;
            verify_password(password.to_string(), dummy).await?;
            debug!("Unknown email");
            return Err(DomainError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), stored.password_hash).await? {
            debug!("Password mismatch");
            return Err(DomainError::InvalidCredentials);
        }

        let now = self.clock.now();
        let session = SessionRecord {
            token: new_session_token(),
            user_id: stored.user.id,
            created_at: now,
            expires_at: self.session_expiry(now),
        };
        self.sessions
            .insert_session(session.clone())
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;

        info!(user_id = %stored.user.id, "Opened session");
        Ok((stored.user, session))
    }

    #[instrument(name = "schedule.accounts.logout", skip_all)]
    pub async fn logout(&self, token: &str) -> Result<(), DomainError> {
        let removed = self
            .sessions
            .delete_session(token)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        debug!(removed, "Closed session");
        Ok(())
    }

    /// Resolves a session token to the caller it belongs to. Expired sessions
    /// are purged before the lookup.
    #[instrument(name = "schedule.accounts.authenticate", skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<Caller, DomainError> {
        let now = self.clock.now();
        let purged = self
            .sessions
            .purge_expired(now)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if purged > 0 {
            debug!(purged, "Purged expired sessions");
        }

        let session = self
            .sessions
            .find_session(token)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or(DomainError::Unauthenticated)?;
        if session.is_expired(now) {
            return Err(DomainError::Unauthenticated);
        }

        let user = self
            .users
            .find_by_id(session.user_id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or(DomainError::Unauthenticated)?;
        Ok(Caller::from(&user))
    }

    pub async fn current_user(&self, caller: &Caller) -> Result<User, DomainError> {
        self.users
            .find_by_id(caller.user_id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or(DomainError::Unauthenticated)
    }

    #[instrument(name = "schedule.accounts.list_users", skip_all, fields(caller = %caller.user_id))]
    pub async fn list_users(&self, caller: &Caller) -> Result<Vec<User>, DomainError> {
        caller.require_admin()?;
        self.users
            .list_users()
            .await
            .map_err(|e| DomainError::database(e.to_string()))
    }

    #[instrument(name = "schedule.accounts.overview", skip_all, fields(caller = %caller.user_id))]
    pub async fn overview(&self, caller: &Caller) -> Result<AdminOverview, DomainError> {
        caller.require_admin()?;
        let db = |e: anyhow::Error| DomainError::database(e.to_string());
        let users = self.users.list_users().await.map_err(db)?;
        Ok(AdminOverview {
            user_count: users.len() as u64,
            admin_count: users.iter().filter(|u| u.is_admin()).count() as u64,
            course_count: self.schedule.count_courses().await.map_err(db)?,
            exam_count: self.schedule.count_exams().await.map_err(db)?,
            users,
        })
    }

    #[instrument(name = "schedule.accounts.promote", skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn promote(&self, caller: &Caller, id: Uuid) -> Result<User, DomainError> {
        caller.require_admin()?;
        self.change_role(id, Role::Admin).await
    }

    #[instrument(name = "schedule.accounts.demote", skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn demote(&self, caller: &Caller, id: Uuid) -> Result<User, DomainError> {
        caller.require_admin()?;
        let target = self.find_user(id).await?;
        if target.is_admin() {
            self.ensure_not_last_admin().await?;
        }
        self.change_role(id, Role::Student).await
    }

    /// Deletes an account with everything it owns.
    #[instrument(name = "schedule.accounts.delete_user", skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn delete_user(&self, caller: &Caller, id: Uuid) -> Result<(), DomainError> {
        caller.require_admin()?;
        let target = self.find_user(id).await?;
        if target.is_admin() {
            self.ensure_not_last_admin().await?;
        }
        let deleted = self
            .users
            .delete_user_cascade(id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if !deleted {
            return Err(DomainError::not_found("User"));
        }
        info!(user_id = %id, "Deleted user and owned data");
        Ok(())
    }

    fn session_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ttl = self.config.session_ttl_hours.min(MAX_SESSION_TTL_HOURS);
        now.checked_add_signed(Duration::hours(i64::from(ttl)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn dummy_hash(&self) -> Result<String, DomainError> {
        let cost = self.config.bcrypt_cost;
        self.dummy_hash
            .get_or_try_init(|| hash_password(new_session_token(), cost))
            .await
            .cloned()
    }

    async fn find_user(&self, id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::not_found("User"))
    }

    async fn change_role(&self, id: Uuid, role: Role) -> Result<User, DomainError> {
        let updated = self
            .users
            .set_role(id, role)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if !updated {
            return Err(DomainError::not_found("User"));
        }
        info!(user_id = %id, role = %role, "Changed role");
        self.find_user(id).await
    }

    async fn ensure_not_last_admin(&self) -> Result<(), DomainError> {
        let admins = self
            .users
            .count_admins()
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if admins <= 1 {
            warn!("Refused to remove the last administrator");
            return Err(DomainError::LastAdmin);
        }
        Ok(())
    }

    fn validate_registration(&self, name: &str, email: &str, password: &str) -> Result<(), DomainError> {
        if name.is_empty() {
            return Err(DomainError::validation("name", "must not be empty"));
        }
        if name.chars().count() > self.config.max_name_length {
            return Err(DomainError::validation(
                "name",
                format!("must be at most {} characters", self.config.max_name_length),
            ));
        }
        if email.is_empty() {
            return Err(DomainError::validation("email", "must not be empty"));
        }
        if !email.contains('@') {
            return Err(DomainError::validation("email", "must be an email address"));
        }
        if password.is_empty() {
            return Err(DomainError::validation("password", "must not be empty"));
        }
        Ok(())
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn new_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

async fn hash_password(password: String, cost: u32) -> Result<String, DomainError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| DomainError::internal(format!("hashing task failed: {e}")))?
        .map_err(|e| DomainError::internal(format!("password hashing failed: {e}")))
}

async fn verify_password(password: String, hash: String) -> Result<bool, DomainError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| DomainError::internal(format!("verification task failed: {e}")))?;
    match verified {
        Ok(ok) => Ok(ok),
        Err(e) => {
            warn!(error = %e, "Stored password hash is unreadable");
            Ok(false)
        }
    }
}
