use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::auth::SessionManager;
use crate::config::Config;
use crate::db::Store;
use crate::domain::DomainEvent;
use crate::services::{
    AuditService, AuthService, PackageService, SeaOrmAuthService, SeaOrmPackageService,
    SeaOrmUserService, UserService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub sessions: Arc<SessionManager>,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub package_service: Arc<dyn PackageService>,

    pub audit: Arc<AuditService>,

    pub event_bus: broadcast::Sender<DomainEvent>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::init_with_event_bus(config, event_bus).await
    }

    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<DomainEvent>,
    ) -> anyhow::Result<Self> {
        Self::init_with_event_bus(config, event_bus).await
    }

    async fn init_with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<DomainEvent>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        // Loads or creates the session key file before anything can serve.
        let sessions = Arc::new(SessionManager::new(store.clone(), &config.auth)?);

        let auth_service = Arc::new(SeaOrmAuthService::new(
            sessions.clone(),
            store.clone(),
            event_bus.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let user_service = Arc::new(SeaOrmUserService::new(
            store.clone(),
            sessions.clone(),
            config.security.clone(),
            event_bus.clone(),
        )) as Arc<dyn UserService + Send + Sync + 'static>;

        let package_service = Arc::new(SeaOrmPackageService::new(store.clone(), event_bus.clone()))
            as Arc<dyn PackageService + Send + Sync + 'static>;

        let audit = Arc::new(AuditService::new(store.clone(), event_bus.clone()));
        audit.clone().start_listener();

        let config_arc = Arc::new(RwLock::new(config));

        Ok(Self {
            config: config_arc,
            store,
            sessions,
            auth_service,
            user_service,
            package_service,
            audit,
            event_bus,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
