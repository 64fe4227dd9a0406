//! Database Migrations
//!
//! Embedded SQL migrations run with refinery over tokio-postgres at
//! startup, before the pool serves any request.

use anyhow::{Context, Result};
use std::ops::DerefMut;

use crate::database::connection::DatabaseConnection;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the pool.
pub async fn run(db: &DatabaseConnection) -> Result<()> {
    tracing::info!("🔄 Running database migrations...");

    let mut client = db
        .pool()
        .get()
        .await
        .context("Failed to get connection for migrations")?;

    let report = embedded::migrations::runner()
        .run_async(client.deref_mut().deref_mut())
        .await
        .context("Migration run failed")?;

    for migration in report.applied_migrations() {
        tracing::info!("applied migration {}", migration);
    }
    tracing::info!("✅ Database migrations completed successfully");
    Ok(())
}
