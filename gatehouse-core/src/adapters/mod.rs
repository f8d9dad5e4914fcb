//! Adapter implementations (hexagonal architecture)
//!
//! Concrete implementations of the port traits.

pub mod duckdb;
pub mod file_session;
pub mod memory_session;

pub use self::duckdb::DuckDbRepository;
pub use file_session::FileSessionStore;
pub use memory_session::MemorySessionStore;
