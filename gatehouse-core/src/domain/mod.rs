//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic; storage lives behind the ports.

mod password;
pub mod result;
pub mod session;
mod user;

pub use password::{Argon2Params, PasswordPolicy, MAX_PASSWORD_BYTES};
pub use session::{hash_token, Session, SessionRecord};
pub use user::{normalize_email, NewUser, User, UserProfile, UserType};
