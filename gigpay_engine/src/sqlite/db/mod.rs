//! Low-level SQLite interactions.
//!
//! These are simple functions (rather than stateful structs) that accept a `&mut SqliteConnection`. Callers obtain a
//! connection from the pool, or open a transaction and pass `&mut *tx`, so any combination of them can be made
//! atomic without changing this module.

use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod audit;
pub mod contracts;
pub mod payments;

const SQLITE_DB_URL: &str = "sqlite://data/gigpay.db";

pub fn db_url() -> String {
    let result = env::var("GIGPAY_DATABASE_URL").unwrap_or_else(|_| {
        info!("GIGPAY_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
