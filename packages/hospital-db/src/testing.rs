//! Utilitários de teste: pools SQLite em memória
//!
//! Disponível com a feature `test-utils`. Cada pool usa uma única conexão,
//! pois cada conexão `:memory:` abre um banco independente.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::migrations;

/// Pool em memória ainda sem esquema
pub async fn memory_pool_without_migrations() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Pool em memória com todas as migrações aplicadas
pub async fn memory_pool() -> Result<SqlitePool> {
    let pool = memory_pool_without_migrations().await?;
    migrations::run_migrations(&pool).await?;
    Ok(pool)
}
