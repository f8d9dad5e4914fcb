//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on concrete implementations.

mod repository;
mod session_store;

pub use repository::UserRepository;
pub use session_store::SessionStore;
