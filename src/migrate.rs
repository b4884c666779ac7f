//! SQL migration runner for the provider's Postgres database.
//!
//! Files ending in `.sql` are applied in lexical order, each in its own
//! transaction. Applied names are recorded in [`LEDGER_TABLE`] so a re-run
//! only applies new files.

use anyhow::{Context, Result};
use sqlx::{Connection, PgConnection, Row};
use std::{collections::HashSet, fs, path::Path};
use tracing::{info, instrument};

pub const LEDGER_TABLE: &str = "menuviz_schema_migrations";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Migration {
    pub name: String,
    pub sql: String,
}

/// Read every `*.sql` file in `dir`, sorted by file name.
///
/// # Errors
///
/// Fails when the directory or a file can't be read.
pub fn discover(dir: &Path) -> Result<Vec<Migration>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

    let mut migrations = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("sql") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let sql = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        migrations.push(Migration {
            name: name.to_string(),
            sql,
        });
    }

    migrations.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(migrations)
}

/// Apply the migrations not yet recorded; returns the names applied now.
///
/// # Errors
///
/// Stops at the first failing migration; earlier ones stay applied.
#[instrument(skip_all, fields(count = migrations.len()))]
pub async fn apply(dsn: &str, migrations: &[Migration]) -> Result<Vec<String>> {
    let mut connection = PgConnection::connect(dsn)
        .await
        .context("Failed to connect to the database")?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
            name TEXT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"
    ))
    .execute(&mut connection)
    .await
    .context("Failed to create the migration ledger")?;

    let applied: HashSet<String> = sqlx::query(&format!("SELECT name FROM {LEDGER_TABLE}"))
        .fetch_all(&mut connection)
        .await
        .context("Failed to read the migration ledger")?
        .iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect::<Result<_, _>>()?;

    let mut newly_applied = Vec::new();
    for migration in migrations {
        if applied.contains(&migration.name) {
            info!("Skipping migration {} (already applied)", migration.name);
            continue;
        }

        info!("Applying migration: {}", migration.name);
        let mut tx = connection.begin().await?;
        sqlx::raw_sql(&migration.sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Error applying migration {}", migration.name))?;
        sqlx::query(&format!("INSERT INTO {LEDGER_TABLE} (name) VALUES ($1)"))
            .bind(&migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Successfully applied migration: {}", migration.name);
        newly_applied.push(migration.name.clone());
    }

    connection.close().await?;
    Ok(newly_applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_sorts_and_filters() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("menuviz-migrations-{}", ulid::Ulid::new()));
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("20240102_menus.sql"), "SELECT 2;")?;
        fs::write(dir.join("20240101_restaurants.sql"), "SELECT 1;")?;
        fs::write(dir.join("README.md"), "notes")?;

        let migrations = discover(&dir)?;

        let names: Vec<&str> = migrations.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["20240101_restaurants.sql", "20240102_menus.sql"]);
        assert_eq!(migrations[0].sql, "SELECT 1;");
        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn discover_missing_dir_fails() {
        let dir = std::env::temp_dir().join(format!("menuviz-missing-{}", ulid::Ulid::new()));
        assert!(discover(&dir).is_err());
    }
}
