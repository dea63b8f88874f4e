use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{package_flags, packages, users};

pub mod migrator;
pub mod records;
pub mod repositories;

pub use crate::entities::system_logs::Model as SystemLog;
pub use repositories::user::PasswordDigest;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn package_repo(&self) -> repositories::package::PackageRepository {
        repositories::package::PackageRepository::new(self.conn.clone())
    }

    fn logs_repo(&self) -> repositories::logs::LogRepository {
        repositories::logs::LogRepository::new(self.conn.clone())
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_api_key(&self, api_key: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_api_key(api_key).await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn get_package_by_name(&self, name: &str) -> Result<Option<packages::Model>> {
        self.package_repo().get_by_name(name).await
    }

    pub async fn get_packages_for_user(&self, user_id: i32) -> Result<Vec<packages::Model>> {
        self.package_repo().list_for_user(user_id).await
    }

    pub async fn get_package_flags(&self, package_id: i32) -> Result<Vec<package_flags::Model>> {
        self.package_repo().flags_for_package(package_id).await
    }

    pub async fn count_packages(&self) -> Result<u64> {
        self.package_repo().count().await
    }

    pub async fn add_log(
        &self,
        event_type: &str,
        level: &str,
        message: &str,
        actor: Option<i32>,
        details: Option<String>,
    ) -> Result<()> {
        self.logs_repo()
            .add(event_type, level, message, actor, details)
            .await
    }

    pub async fn get_logs(
        &self,
        page: u64,
        page_size: u64,
        level_filter: Option<String>,
        event_type_filter: Option<String>,
    ) -> Result<(Vec<SystemLog>, u64)> {
        self.logs_repo()
            .get_logs(page, page_size, level_filter, event_type_filter)
            .await
    }

    pub async fn clear_logs(&self) -> Result<()> {
        self.logs_repo().clear_logs().await
    }
}
