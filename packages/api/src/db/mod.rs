//! # Database module — PostgreSQL adapter
//!
//! The production implementation of the `store::Store` contract:
//!
//! - [`connect`] — opens a connection pool for an explicit database URL. The
//!   pool is constructed once at startup and injected into [`PgStore`]; there
//!   is no ambient global handle.
//! - [`migrate`] — applies the SQL migrations embedded from `migrations/`.
//! - [`PgStore`] — the `sqlx`-backed [`store::Store`] implementation.

mod pool;
mod postgres;

pub use pool::connect;
pub use postgres::PgStore;

/// Apply the embedded migrations.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
