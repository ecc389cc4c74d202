//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! fc-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DISPATCH_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Stored in `crates/dispatch/migrations/`, applied in filename order and
//! recorded in `_sqlx_migrations`.

use sqlx::PgPool;

use foodcart_dispatch::db;
use foodcart_dispatch::error::Result;

/// Apply pending dispatch migrations.
pub async fn run(pool: &PgPool) -> Result<()> {
    tracing::info!("Running dispatch migrations...");
    db::run_migrations(pool).await?;
    tracing::info!("Dispatch migrations complete!");
    Ok(())
}
