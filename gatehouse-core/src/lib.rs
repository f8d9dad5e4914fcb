//! Gatehouse Core - user registration, authentication and sessions
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (User, Session, OperationResult)
//! - **ports**: Trait definitions for external dependencies (UserRepository, SessionStore)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, file and in-memory session stores)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::{DoctorService, UserService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{NewUser, Session, User, UserProfile, UserType};
pub use ports::{SessionStore, UserRepository};

/// Main context for Gatehouse operations
///
/// Holds the database connection, configuration, and all services.
pub struct GatehouseContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub user_service: UserService,
    pub doctor_service: DoctorService,
}

impl GatehouseContext {
    /// Create a new Gatehouse context rooted at `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let db_path = data_dir.join(&config.db_filename);
        let repository = Arc::new(DuckDbRepository::new(&db_path)?);

        // Initialize schema
        repository.ensure_schema()?;

        let user_service = UserService::new(repository.clone(), config.auth.clone());
        let doctor_service = DoctorService::new(Arc::clone(&repository));

        tracing::debug!(db_path = %db_path.display(), "gatehouse context ready");

        Ok(Self {
            config,
            repository,
            user_service,
            doctor_service,
        })
    }
}
