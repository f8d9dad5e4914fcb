//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{normalize_email, SessionRecord, User, UserType};
use crate::ports::UserRepository;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const USER_COLUMNS: &str = "id, username, email, password, name, surname, user_type, active,
                            created_at, updated_at, password_changed_at";

/// Check if an error message indicates a file locking issue that should be retried
pub(crate) fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// Check if an insert failed because of a uniqueness clash
fn is_uniqueness_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("constraint")
        || lower.contains("duplicate key")
        || lower.contains("conflict")
}

/// Precondition checked inside the insert transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertGuard {
    /// No user shares the email or username
    Absent,
    /// The users table is empty
    FirstUser,
}

/// Fixed-width UTC timestamp, so stored values also sort chronologically
fn session_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// DuckDB-backed user store
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff on file locking errors, which show up
    /// when another process holds the database briefly.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max_attempts = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.map(Error::from).unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a private in-memory database (tests, throwaway tooling)
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn try_open_connection(db_path: &Path) -> std::result::Result<Connection, duckdb::Error> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run database migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Names of migrations not yet applied
    pub fn pending_migrations(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        MigrationService::new(&conn).get_pending()
    }

    fn find_one(&self, condition: &str, value: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM users WHERE {} LIMIT 1", USER_COLUMNS, condition);
        let row = conn.query_row(&sql, params![value], UserRow::from_row);
        match row {
            Ok(row) => row.into_user().map(Some),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn user_exists(conn: &Connection, email: &str, username: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ? OR lower(username) = lower(?)",
            params![email, username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn guard_holds(conn: &Connection, guard: InsertGuard, email: &str, username: &str) -> Result<bool> {
        match guard {
            InsertGuard::Absent => Ok(!Self::user_exists(conn, email, username)?),
            InsertGuard::FirstUser => {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
                Ok(count == 0)
            }
        }
    }

    fn insert_user_guarded(&self, user: &User, guard: InsertGuard) -> Result<bool> {
        let mut conn = self.lock()?;
        let email = normalize_email(&user.email);

        let outcome = {
            let tx = conn.transaction()?;
            if !Self::guard_holds(&tx, guard, &email, &user.username)? {
                tx.rollback()?;
                return Ok(false);
            }

            let inserted = tx.execute(
                "INSERT INTO users (id, username, email, password, name, surname, user_type,
                                    active, created_at, updated_at, password_changed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    user.id.to_string(),
                    user.username,
                    email,
                    user.password_hash,
                    user.name,
                    user.surname,
                    user.user_type.as_str(),
                    user.active,
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                    user.password_changed_at.map(|t| t.to_rfc3339()),
                ],
            );

            // Dropping an uncommitted transaction rolls it back
            match inserted {
                Ok(_) => tx.commit(),
                Err(e) => Err(e),
            }
        };

        match outcome {
            Ok(()) => Ok(true),
            Err(e) if is_uniqueness_error(&e.to_string()) => {
                // A concurrent writer got there first; confirm before reporting a clash
                if Self::guard_holds(&conn, guard, &email, &user.username)? {
                    Err(e.into())
                } else {
                    Ok(false)
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl UserRepository for DuckDbRepository {
    fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email = ?", &normalize_email(email))
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("lower(username) = lower(?)", username.trim())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.find_one("id = ?", &id.to_string())
    }

    fn insert_user_if_absent(&self, user: &User) -> Result<bool> {
        self.insert_user_guarded(user, InsertGuard::Absent)
    }

    fn insert_first_user(&self, user: &User) -> Result<bool> {
        self.insert_user_guarded(user, InsertGuard::FirstUser)
    }

    fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.lock()?;
        let stamp = changed_at.to_rfc3339();
        let rows = conn.execute(
            "UPDATE users SET password = ?, password_changed_at = ?, updated_at = ? WHERE id = ?",
            params![password_hash, stamp, stamp, id.to_string()],
        )?;
        Ok(rows > 0)
    }

    fn set_active(&self, id: Uuid, active: bool) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE users SET active = ?, updated_at = ? WHERE id = ?",
            params![active, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(rows > 0)
    }

    fn insert_session(&self, record: &SessionRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at) VALUES (?, ?, ?)",
            params![
                record.token_hash,
                record.user_id.to_string(),
                session_timestamp(record.created_at),
            ],
        )?;
        Ok(())
    }

    fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>> {
        let conn = self.lock()?;
        let row = conn.query_row(
            "SELECT token_hash, user_id, created_at FROM sessions WHERE token_hash = ?",
            params![token_hash],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        );
        let (token_hash, user_id, created_at) = match row {
            Ok(values) => values,
            Err(duckdb::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let user_id = Uuid::parse_str(&user_id)
            .map_err(|e| Error::database(format!("Corrupt session user id '{}': {}", user_id, e)))?;
        Ok(Some(SessionRecord {
            token_hash,
            user_id,
            created_at: parse_timestamp(&created_at)?,
        }))
    }

    fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM sessions WHERE token_hash = ?", params![token_hash])?;
        Ok(rows > 0)
    }

    fn delete_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM sessions WHERE created_at < ?",
            params![session_timestamp(cutoff)],
        )?;
        Ok(rows)
    }

    fn count_users(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        let one: i32 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        if one != 1 {
            return Err(Error::database("Liveness query returned an unexpected value"));
        }
        Ok(())
    }
}

/// Raw column values, converted to a [`User`] outside the row callback
struct UserRow {
    id: String,
    username: String,
    email: String,
    password: String,
    name: String,
    surname: String,
    user_type: String,
    active: bool,
    created_at: String,
    updated_at: String,
    password_changed_at: Option<String>,
}

impl UserRow {
    fn from_row(row: &duckdb::Row) -> std::result::Result<Self, duckdb::Error> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            name: row.get(4)?,
            surname: row.get(5)?,
            user_type: row.get(6)?,
            active: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
            password_changed_at: row.get(10)?,
        })
    }

    fn into_user(self) -> Result<User> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::database(format!("Corrupt user id '{}': {}", self.id, e)))?;
        let user_type = self
            .user_type
            .parse::<UserType>()
            .map_err(|e| Error::database(format!("Corrupt user row {}: {}", id, e)))?;

        Ok(User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password,
            name: self.name,
            surname: self.surname,
            user_type,
            active: self.active,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            password_changed_at: self
                .password_changed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::database(format!("Corrupt timestamp '{}': {}", s, e)))
}
