//! Doctor service - database health checks

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;
use crate::ports::UserRepository;

/// Doctor service for health checks
pub struct DoctorService {
    repository: Arc<DuckDbRepository>,
}

impl DoctorService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Run all health checks
    ///
    /// A failing check is reported in the result, not returned as an error.
    pub fn run_checks(&self) -> Result<DoctorResult> {
        let mut checks = BTreeMap::new();

        let connection = match self.repository.ping() {
            Ok(()) => CheckResult::pass(format!(
                "Connected to {}",
                self.repository.db_path().display()
            )),
            Err(e) => CheckResult::error(format!("Database is not reachable: {}", e)),
        };
        checks.insert("database_connection".to_string(), connection);

        let migrations = match self.repository.pending_migrations() {
            Ok(pending) if pending.is_empty() => CheckResult::pass("Schema is up to date"),
            Ok(pending) => CheckResult {
                status: CheckStatus::Warning,
                message: format!("{} migration(s) not applied", pending.len()),
                details: Some(pending.iter().map(|name| json!({ "migration": name })).collect()),
            },
            Err(e) => CheckResult::error(format!("Could not read migration state: {}", e)),
        };
        checks.insert("schema_migrations".to_string(), migrations);

        let users = match self.repository.count_users() {
            Ok(0) => CheckResult {
                status: CheckStatus::Warning,
                message: "No user accounts registered yet".to_string(),
                details: None,
            },
            Ok(count) => CheckResult {
                status: CheckStatus::Pass,
                message: format!("{} user account(s)", count),
                details: Some(vec![json!({ "user_count": count })]),
            },
            Err(e) => CheckResult::error(format!("Users table is not readable: {}", e)),
        };
        checks.insert("users_table".to_string(), users);

        let count = |status: CheckStatus| checks.values().filter(|c| c.status == status).count() as i64;
        let summary = DoctorSummary {
            passed: count(CheckStatus::Pass),
            warnings: count(CheckStatus::Warning),
            errors: count(CheckStatus::Error),
        };

        Ok(DoctorResult { checks, summary })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Error,
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: BTreeMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

impl DoctorResult {
    pub fn is_healthy(&self) -> bool {
        self.summary.errors == 0
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

impl CheckResult {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Pass,
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Error,
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}
