//! Plugin lifecycle: pool creation, migration bootstrap and teardown.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use sqlx::PgPool;

use crate::config::PersistConfig;
use crate::db;
use crate::errors::PersistError;
use crate::retry::{self, RetryPolicy};

/// Boxed async action run once against the freshly created pool.
pub type MigrationFn = Box<
    dyn for<'a> FnOnce(&'a PgPool) -> Pin<Box<dyn Future<Output = Result<(), PersistError>> + Send + 'a>>
        + Send,
>;

/// What to do with a new pool before handing it to the host.
#[derive(Default)]
pub enum Migration {
    #[default]
    Skip,
    /// Apply the SQL files under `<data_dir>/migrations`.
    Directory,
    Custom(MigrationFn),
}

impl Migration {
    pub fn custom<F>(action: F) -> Self
    where
        F: for<'a> FnOnce(&'a PgPool) -> Pin<Box<dyn Future<Output = Result<(), PersistError>> + Send + 'a>>
            + Send
            + 'static,
    {
        Self::Custom(Box::new(action))
    }

    async fn run(self, pool: &PgPool, data_dir: &Path) -> Result<(), PersistError> {
        match self {
            Migration::Skip => Ok(()),
            Migration::Directory => Ok(db::run_migrations(pool, data_dir).await?),
            Migration::Custom(action) => action(pool).await,
        }
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Migration::Skip => f.write_str("Skip"),
            Migration::Directory => f.write_str("Directory"),
            Migration::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Initializer registered with the host application at boot.
#[derive(Debug)]
pub struct PersistPlugin {
    name: String,
    description: String,
    data_dir: PathBuf,
    migration: Migration,
}

impl PersistPlugin {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            data_dir: data_dir.into(),
            migration: Migration::Skip,
        }
    }

    pub fn with_migration(mut self, migration: Migration) -> Self {
        self.migration = migration;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Build the pool from configuration and bootstrap it.
    ///
    /// Nothing here is retried: a bad connection string or an unreachable
    /// server should stop the application from booting.
    pub async fn init(self, config: &PersistConfig) -> Result<PersistState, PersistError> {
        let pool = db::create_pool_from_config(config).await?;
        tracing::info!(
            plugin = %self.name,
            max_connections = config.database_max_connections,
            "Database pool created"
        );
        self.init_with_pool(pool, config.retry).await
    }

    /// Bootstrap a pool the host already owns.
    pub async fn init_with_pool(
        self,
        pool: PgPool,
        retry: RetryPolicy,
    ) -> Result<PersistState, PersistError> {
        tracing::debug!(plugin = %self.name, migration = ?self.migration, "Bootstrapping pool");
        self.migration.run(&pool, &self.data_dir).await?;

        tracing::info!(plugin = %self.name, description = %self.description, "Plugin initialized");
        Ok(PersistState {
            pool,
            retry,
            description: Arc::from(self.description),
        })
    }
}

/// Handle the host keeps for the lifetime of the application.
///
/// Cloning is cheap; every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct PersistState {
    pool: PgPool,
    retry: RetryPolicy,
    description: Arc<str>,
}

impl PersistState {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Same pool, different retry policy.
    pub fn with_retry_policy(&self, retry: RetryPolicy) -> Self {
        Self {
            retry,
            ..self.clone()
        }
    }

    /// Run a database action, retrying it when the connection drops.
    ///
    /// The action receives a handle to the pool and is invoked again for each
    /// retry, so it must be safe to repeat.
    pub async fn run<T, F, Fut>(&self, mut action: F) -> Result<T, sqlx::Error>
    where
        F: FnMut(PgPool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        retry::retry_with(&self.retry, retry::is_transient, || action(self.pool.clone())).await
    }

    /// Close every connection; later acquires fail with `PoolClosed`.
    pub async fn shutdown(&self) {
        if !self.pool.is_closed() {
            tracing::info!(description = %self.description, "Closing database pool");
            self.pool.close().await;
        }
    }
}
