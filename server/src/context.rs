//! Application context shared with every handler.
//!
//! Built once at startup from [`Config`]. Handlers extract the parts they
//! need through the [`FromRef`] impls below.

use crate::config::{Config, StorageBackend};
use crate::qr::{self, QrSetupError};
use crate::telemetry;
use crate::uploads::{ImageStore, LocalImageStore};
use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;
use repair_desk_auth::{AuthConfig, AuthError, AuthService};
use repair_desk_core::{
    Clock, CustomerStore, RandomSuffix, SystemClock, TicketEnvironment, TicketLifecycle,
    TicketStore,
};
use repair_desk_postgres::{
    PgCustomerStore, PgSessionStore, PgTechnicianRepository, PgTicketStore, PoolConfig,
    SetupError,
};
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Startup failures.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Database connection or migration failed
    #[error(transparent)]
    Database(#[from] SetupError),

    /// Admin bootstrap or session purge failed
    #[error("Auth setup failed: {0}")]
    Auth(#[from] AuthError),

    /// QR publisher misconfigured
    #[error(transparent)]
    Qr(#[from] QrSetupError),

    /// Prometheus recorder could not be installed
    #[error("Metrics setup failed: {0}")]
    Metrics(String),
}

/// Static-file and upload settings used by the router.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Served at `/`
    pub public_dir: PathBuf,
    /// Served at `/uploads`
    pub upload_dir: PathBuf,
    /// Request body cap in bytes
    pub max_upload_bytes: usize,
}

/// Everything a request handler may need.
#[derive(Clone)]
pub struct AppContext {
    /// Ticket operations
    pub lifecycle: TicketLifecycle,
    /// Technician accounts and sessions
    pub auth: AuthService,
    /// Intake image storage
    pub images: Arc<dyn ImageStore>,
    /// Rendered at `/metrics` when set
    pub metrics: Option<PrometheusHandle>,
    /// Router settings
    pub http: HttpSettings,
    pool: Option<PgPool>,
}

impl AppContext {
    /// Wire stores, services and collaborators from configuration.
    ///
    /// For the `postgres` backend this connects, applies migrations and
    /// purges expired sessions. Then the admin account is bootstrapped if
    /// `ADMIN_USERNAME`/`ADMIN_PASSWORD` are set.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] if any of those steps fail.
    pub async fn build(config: &Config) -> Result<Self, ContextError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let auth_config = auth_config(config);
        let qr = qr::from_settings(&config.qr)?;

        let (customers, tickets, auth, pool): (
            Arc<dyn CustomerStore>,
            Arc<dyn TicketStore>,
            AuthService,
            Option<PgPool>,
        ) = match config.database.backend {
            StorageBackend::Postgres => {
                let pool = repair_desk_postgres::connect(&PoolConfig {
                    url: config.database.url.clone(),
                    max_connections: config.database.max_connections,
                    min_connections: config.database.min_connections,
                    connect_timeout: config.database.connect_timeout,
                })
                .await?;
                repair_desk_postgres::migrate(&pool).await?;

                let sessions = PgSessionStore::new(pool.clone());
                let purged = sessions.purge_expired(clock.now()).await?;
                tracing::info!(purged, "Expired sessions removed");

                let auth = AuthService::new(
                    Arc::new(PgTechnicianRepository::new(pool.clone())),
                    Arc::new(sessions),
                    Arc::clone(&clock),
                    auth_config,
                );
                (
                    Arc::new(PgCustomerStore::new(pool.clone())),
                    Arc::new(PgTicketStore::new(pool.clone())),
                    auth,
                    Some(pool),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                let auth = memory_auth(Arc::clone(&clock), auth_config);
                (
                    Arc::new(repair_desk_testing::InMemoryCustomerStore::new()),
                    Arc::new(repair_desk_testing::InMemoryTicketStore::new()),
                    auth,
                    None,
                )
            }
        };

        if let (Some(username), Some(password)) =
            (&config.auth.admin_username, &config.auth.admin_password)
        {
            if auth.ensure_admin(username, password).await? {
                tracing::info!(username = %username, "Admin account created");
            }
        }

        let metrics = if config.server.metrics_enabled {
            Some(telemetry::install_metrics().map_err(|e| ContextError::Metrics(e.to_string()))?)
        } else {
            None
        };

        let lifecycle = TicketLifecycle::new(
            TicketEnvironment {
                clock,
                customers,
                tickets,
                suffixes: Arc::new(RandomSuffix),
                qr,
            },
            config.lifecycle(),
        );

        Ok(Self {
            lifecycle,
            auth,
            images: Arc::new(LocalImageStore::new(config.server.upload_dir.clone())),
            metrics,
            http: http_settings(config),
            pool,
        })
    }

    /// Assemble a context from parts already built, no database.
    #[must_use]
    pub fn from_parts(
        lifecycle: TicketLifecycle,
        auth: AuthService,
        images: Arc<dyn ImageStore>,
        http: HttpSettings,
    ) -> Self {
        Self {
            lifecycle,
            auth,
            images,
            metrics: None,
            http,
            pool: None,
        }
    }

    /// Release resources. Closes the database pool if there is one.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            tracing::info!("Database pool closed");
        }
    }
}

/// Auth service over the in-process stores.
#[must_use]
pub fn memory_auth(clock: Arc<dyn Clock>, config: AuthConfig) -> AuthService {
    AuthService::new(
        Arc::new(repair_desk_auth::mocks::MockTechnicianRepository::new()),
        Arc::new(repair_desk_auth::mocks::MockSessionStore::new()),
        clock,
        config,
    )
}

fn auth_config(config: &Config) -> AuthConfig {
    AuthConfig::default()
        .with_session_ttl(
            chrono::Duration::from_std(config.auth.session_ttl)
                .unwrap_or_else(|_| chrono::Duration::hours(8)),
        )
        .with_hash_cost(config.auth.hash_cost)
}

fn http_settings(config: &Config) -> HttpSettings {
    HttpSettings {
        public_dir: config.server.public_dir.clone(),
        upload_dir: config.server.upload_dir.clone(),
        max_upload_bytes: config.server.max_upload_bytes,
    }
}

impl FromRef<AppContext> for TicketLifecycle {
    fn from_ref(ctx: &AppContext) -> Self {
        ctx.lifecycle.clone()
    }
}

impl FromRef<AppContext> for AuthService {
    fn from_ref(ctx: &AppContext) -> Self {
        ctx.auth.clone()
    }
}

impl FromRef<AppContext> for Arc<dyn ImageStore> {
    fn from_ref(ctx: &AppContext) -> Self {
        Arc::clone(&ctx.images)
    }
}
