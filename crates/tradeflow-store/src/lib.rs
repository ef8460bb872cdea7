//! # Tradeflow Store
//!
//! DuckDB-backed persistent product reference data.
//!
//! ## Overview
//!
//! [`ProductStore`] keeps `product key -> product name` entries in a single
//! `products` table and implements [`ProductCache`], so it can be injected into
//! the enrichment pipeline and the reference-data loader in place of the
//! in-memory cache.
//!
//! - Parameterized reads and writes only
//! - Batched upserts inside one transaction, rolled back on failure
//! - Versioned schema migrations tracked in `schema_migrations`
//! - Small connection pool sharing one database instance
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tradeflow_store::{ProductStore, ProductStoreConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ProductStore::open(ProductStoreConfig::default())?;
//!     store.upsert_many(&[("1".to_string(), "Treasury Bills".to_string())])?;
//!
//!     let names = store.get_many(&["1".to_string(), "2".to_string()])?;
//!     assert_eq!(names, vec![Some("Treasury Bills".to_string()), None]);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `products` | Product names by canonical product key |
//! | `schema_migrations` | Applied migration versions |

pub mod duckdb;
pub mod migrations;

use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::ToSql;
use async_trait::async_trait;
use thiserror::Error;
use tradeflow_core::{CacheError, ProductCache};

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration for the product store.
#[derive(Debug, Clone)]
pub struct ProductStoreConfig {
    /// Root directory for tradeflow data.
    pub home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept by the pool.
    pub max_pool_size: usize,
}

impl ProductStoreConfig {
    pub const DEFAULT_DB_FILE: &'static str = "products.duckdb";
    pub const DEFAULT_POOL_SIZE: usize = 4;

    /// Configuration for an explicit database file, keeping the default home.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

impl Default for ProductStoreConfig {
    fn default() -> Self {
        let home = resolve_tradeflow_home();
        let db_path = home.join(Self::DEFAULT_DB_FILE);
        Self {
            home,
            db_path,
            max_pool_size: Self::DEFAULT_POOL_SIZE,
        }
    }
}

/// Persistent product reference data.
#[derive(Clone)]
pub struct ProductStore {
    manager: DuckDbConnectionManager,
}

impl ProductStore {
    /// Open (or create) the store and bring its schema up to date.
    pub fn open(config: ProductStoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path, config.max_pool_size)?;
        let store = Self { manager };
        store.initialize()?;
        tracing::debug!(path = %store.db_path().display(), "product store opened");
        Ok(store)
    }

    fn initialize(&self) -> Result<(), StoreError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Look up names for `keys`. The result is aligned with `keys`; repeated
    /// keys are answered at every position.
    pub fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut distinct: Vec<&dyn ToSql> = Vec::with_capacity(keys.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(keys.len());
        for key in keys {
            if seen.insert(key.as_str()) {
                distinct.push(key);
            }
        }

        let sql = format!(
            "SELECT product_key, name FROM products WHERE product_key IN ({})",
            repeat_vars(distinct.len())
        );
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query(distinct.as_slice())?;

        let mut found: HashMap<String, String> = HashMap::with_capacity(distinct.len());
        while let Some(row) = rows.next()? {
            found.insert(row.get(0)?, row.get(1)?);
        }

        Ok(keys.iter().map(|key| found.get(key).cloned()).collect())
    }

    /// Insert or replace entries in one transaction. Later entries win over
    /// earlier ones with the same key. Returns the number of distinct keys
    /// written.
    pub fn upsert_many(&self, entries: &[(String, String)]) -> Result<usize, StoreError> {
        let entries = last_write_wins(entries);
        if entries.is_empty() {
            return Ok(0);
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, StoreError> {
            let mut statement = connection.prepare_cached(
                "INSERT INTO products (product_key, name, updated_at) \
                 VALUES (?, ?, CURRENT_TIMESTAMP) \
                 ON CONFLICT (product_key) DO UPDATE \
                 SET name = excluded.name, updated_at = excluded.updated_at",
            )?;
            for (key, name) in &entries {
                let params: [&dyn ToSql; 2] = [key, name];
                statement.execute(params.as_slice())?;
            }
            Ok(entries.len())
        })();

        finalize_transaction(&connection, result)
    }

    /// Number of stored products.
    pub fn count(&self) -> Result<u64, StoreError> {
        let connection = self.manager.acquire()?;
        let count: i64 = connection.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl ProductCache for ProductStore {
    async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        let store = self.clone();
        let keys = keys.to_vec();
        tokio::task::spawn_blocking(move || store.get_many(&keys))
            .await
            .map_err(|error| CacheError::Unavailable(error.to_string()))?
            .map_err(|error| CacheError::Storage(error.to_string()))
    }

    async fn batch_set(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
        let store = self.clone();
        let entries = entries.to_vec();
        tokio::task::spawn_blocking(move || store.upsert_many(&entries))
            .await
            .map_err(|error| CacheError::Unavailable(error.to_string()))?
            .map(|_| ())
            .map_err(|error| CacheError::Storage(error.to_string()))
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &::duckdb::Connection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback) = connection.execute_batch("ROLLBACK") {
                tracing::warn!(error = %rollback, "rollback failed");
            }
            Err(error)
        }
    }
}

/// `?, ?, ...` placeholder list for an `IN` clause of `count` parameters.
fn repeat_vars(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Keep only the last entry per key, in first-seen key order.
fn last_write_wins(entries: &[(String, String)]) -> Vec<(&str, &str)> {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(entries.len());
    let mut unique: Vec<(&str, &str)> = Vec::with_capacity(entries.len());
    for (key, name) in entries {
        match positions.get(key.as_str()) {
            Some(&index) => unique[index].1 = name.as_str(),
            None => {
                positions.insert(key.as_str(), unique.len());
                unique.push((key.as_str(), name.as_str()));
            }
        }
    }
    unique
}

/// Resolve the tradeflow home directory from environment or default.
pub fn resolve_tradeflow_home() -> PathBuf {
    if let Some(path) = env::var_os("TRADEFLOW_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".tradeflow");
    }

    PathBuf::from(".tradeflow")
}
