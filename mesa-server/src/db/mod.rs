//! Database Module
//!
//! Embedded SurrealDB storage: connection setup and schema bootstrap.

pub mod models;
pub mod repository;

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

const NAMESPACE: &str = "mesa";
const DATABASE: &str = "admin";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the on-disk database at `db_path`
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;
        Self::init(db).await
    }

    /// Open a throwaway in-memory database (tests)
    pub async fn new_in_memory() -> Result<Self, AppError> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;
        Self::init(db).await
    }

    async fn init(db: Surreal<Db>) -> Result<Self, AppError> {
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        bootstrap_schema(&db).await?;

        tracing::info!("Database connection established (SurrealDB embedded)");
        Ok(Self { db })
    }
}

/// Schema bootstrap, applied on every startup (idempotent).
///
/// The unique index on `(restaurant, table_no)` is the authoritative
/// uniqueness guard: the application-level pre-check in the conflict guard is
/// only a fast path, a racing duplicate write is rejected here.
async fn bootstrap_schema(db: &Surreal<Db>) -> Result<(), AppError> {
    db.query(
        "
        DEFINE TABLE IF NOT EXISTS dining_table SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS dining_table_restaurant_no
            ON TABLE dining_table FIELDS restaurant, table_no UNIQUE;
        DEFINE TABLE IF NOT EXISTS restaurant SCHEMALESS;
        DEFINE TABLE IF NOT EXISTS order SCHEMALESS;
        ",
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to bootstrap schema: {e}")))?
    .check()
    .map_err(|e| AppError::database(format!("Failed to bootstrap schema: {e}")))?;
    Ok(())
}
