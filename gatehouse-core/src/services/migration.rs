//! Schema upgrades for the gatehouse database
//!
//! The schema lives in numbered SQL files compiled into the binary:
//! `000` creates the `sys_migrations` ledger, `001` the `users` table and
//! `002` the server-side `sessions` table. A file name recorded in the
//! ledger is never executed again.

use duckdb::Connection;

use crate::domain::result::Result;
use crate::migrations::MIGRATIONS;

/// Creates `sys_migrations`; has to run before the ledger can be read
const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";

/// Outcome of one upgrade pass
#[derive(Debug)]
pub struct MigrationResult {
    /// Files executed during this pass, in order
    pub applied: Vec<String>,
    /// Files skipped because the ledger already listed them
    pub already_applied: usize,
}

/// Applies embedded schema files to a borrowed connection
pub struct MigrationService<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Bring the schema up to date
    ///
    /// On an empty database the ledger is created first; afterwards users
    /// and sessions tables are added by whichever files the ledger lacks.
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut newly_applied = Vec::new();

        let bootstrap_ran = self.bootstrap_ledger()?;
        if bootstrap_ran {
            newly_applied.push(BOOTSTRAP_MIGRATION.to_string());
        }

        let applied_set = self.get_applied()?;
        let already_applied = if bootstrap_ran {
            applied_set.len().saturating_sub(1)
        } else {
            applied_set.len()
        };

        for (name, sql) in MIGRATIONS.iter() {
            if *name == BOOTSTRAP_MIGRATION {
                continue;
            }
            if !applied_set.iter().any(|a| a.as_str() == *name) {
                self.conn.execute_batch(sql)?;
                self.record_migration(name)?;
                tracing::info!(migration = %name, "applied migration");
                newly_applied.push(name.to_string());
            }
        }

        Ok(MigrationResult {
            applied: newly_applied,
            already_applied,
        })
    }

    fn bootstrap_ledger(&self) -> Result<bool> {
        if self.migrations_table_exists()? {
            return Ok(false);
        }
        let Some((name, sql)) = MIGRATIONS.iter().find(|(n, _)| *n == BOOTSTRAP_MIGRATION) else {
            return Ok(false);
        };
        self.conn.execute_batch(sql)?;
        self.record_migration(name)?;
        tracing::debug!("created sys_migrations ledger");
        Ok(true)
    }

    fn migrations_table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// File names recorded in `sys_migrations`; empty before bootstrap
    pub fn get_applied(&self) -> Result<Vec<String>> {
        if !self.migrations_table_exists()? {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut result = Vec::new();
        for name in names {
            result.push(name?);
        }
        Ok(result)
    }

    /// Embedded files the ledger does not list yet
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = self.get_applied()?;
        Ok(MIGRATIONS
            .iter()
            .filter(|(name, _)| !applied.iter().any(|a| a.as_str() == *name))
            .map(|(name, _)| name.to_string())
            .collect())
    }

    fn record_migration(&self, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [name],
        )?;
        Ok(())
    }
}
