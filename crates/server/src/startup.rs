use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_for;
use configs::{AppConfig, StoreBackend};
use dotenvy::dotenv;
use migration::MigratorTrait;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, AppState};
use service::onboarding::{
    repo::seaorm::SeaOrmCredentialStore,
    repository::mock::InMemoryCredentialStore,
    CredentialStore, OnboardingConfig, OnboardingOrchestrator,
};

/// Map the `[onboarding]` section onto the service configuration
pub fn onboarding_config(cfg: &AppConfig) -> OnboardingConfig {
    OnboardingConfig {
        default_application_id: cfg.onboarding.default_application_id.clone(),
        username_separator: cfg.onboarding.username_separator,
    }
}

/// Open the configured credential store; the SeaORM store migrates on open.
pub async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn CredentialStore>, StartupError> {
    match cfg.onboarding.store {
        StoreBackend::Memory => {
            warn!(store = "memory", "in-memory credential store; canonical users are lost on restart");
            Ok(Arc::new(InMemoryCredentialStore::default()))
        }
        StoreBackend::Postgres => {
            let db = models::db::connect_with_config(&cfg.database)
                .await
                .map_err(|e| StartupError::Store(e.to_string()))?;
            migration::Migrator::up(&db, None)
                .await
                .map_err(|e| StartupError::Store(format!("migrate up failed: {e}")))?;
            info!(store = "postgres", "credential store ready");
            Ok(Arc::new(SeaOrmCredentialStore::new(db)))
        }
    }
}

pub fn build_state(store: Arc<dyn CredentialStore>, cfg: OnboardingConfig) -> AppState {
    AppState { orchestrator: Arc::new(OnboardingOrchestrator::new(store, cfg)) }
}

fn load_bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load_or_env()?;
    init_logging_for(&cfg.logging.format);

    let store = build_store(&cfg).await?;
    let state = build_state(store, onboarding_config(&cfg));
    let app: Router = routes::build_router(state);

    let addr = load_bind_addr(&cfg)?;
    info!(%addr, store = ?cfg.onboarding.store, "starting onboarding trigger server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
