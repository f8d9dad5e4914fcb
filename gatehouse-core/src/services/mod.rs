//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod doctor;
pub mod migration;
pub mod password;
mod user;

pub use doctor::{CheckResult, CheckStatus, DoctorResult, DoctorService, DoctorSummary};
pub use migration::{MigrationResult, MigrationService};
pub use password::PasswordHasher;
pub use user::{is_valid_email, UserService};
