use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::auth::CookieSettings;
use crate::api::rest::routes;
use crate::config::ScheduleConfig;
use crate::domain::accounts::{AccountService, AccountsConfig, MAX_SESSION_TTL_HOURS};
use crate::domain::ports::{Clock, SystemClock};
use crate::domain::service::{Service, ServiceConfig};
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::SeaOrmRepository;

/// Wires storage, domain services and REST routes together.
#[derive(Clone)]
pub struct ScheduleModule {
    accounts: Arc<AccountService>,
    service: Arc<Service>,
    cookies: CookieSettings,
}

impl ScheduleModule {
    /// Apply pending schema migrations.
    pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running schedule database migrations");
        Migrator::up(db, None).await?;
        info!("Schedule database migrations completed successfully");
        Ok(())
    }

    pub fn new(db: DatabaseConnection, cfg: ScheduleConfig) -> Self {
        Self::with_clock(db, cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(db: DatabaseConnection, cfg: ScheduleConfig, clock: Arc<dyn Clock>) -> Self {
        debug!(
            "Loaded schedule config: session_ttl_hours={}, upcoming_exam_window_days={}",
            cfg.session_ttl_hours, cfg.upcoming_exam_window_days
        );

        // One repository instance serves all three ports.
        let repo = Arc::new(SeaOrmRepository::new(db));

        let accounts = AccountService::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            clock.clone(),
            AccountsConfig {
                session_ttl_hours: cfg.session_ttl_hours,
                bcrypt_cost: cfg.bcrypt_cost,
                ..AccountsConfig::default()
            },
        );
        let service = Service::new(
            repo,
            clock,
            ServiceConfig {
                max_title_length: cfg.max_title_length,
                upcoming_exam_window_days: cfg.upcoming_exam_window_days,
            },
        );

        Self {
            accounts: Arc::new(accounts),
            service: Arc::new(service),
            cookies: CookieSettings {
                secure: cfg.cookie_secure,
                max_age_secs: u64::from(cfg.session_ttl_hours.min(MAX_SESSION_TTL_HOURS)) * 3600,
            },
        }
    }

    pub fn accounts(&self) -> Arc<AccountService> {
        self.accounts.clone()
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    pub fn register_rest(&self, router: Router) -> Router {
        info!("Registering schedule REST routes");
        routes::register_routes(
            router,
            self.accounts.clone(),
            self.service.clone(),
            self.cookies,
        )
    }
}
