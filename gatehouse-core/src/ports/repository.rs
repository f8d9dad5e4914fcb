//! Repository port - user store abstraction

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{SessionRecord, User};

/// User store abstraction
///
/// Every method is a blocking round trip. Errors are infrastructure faults;
/// "not found" is `Ok(None)` / `Ok(false)`.
pub trait UserRepository: Send + Sync {
    /// Find a user by email (exact match on the normalized, lower-cased form)
    fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find a user by username, ignoring case
    fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Find a user by id
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Insert a user unless one with the same email or username exists
    ///
    /// The existence check and insert must be one atomic unit. Returns
    /// `false` when a conflicting user was found and nothing was written.
    fn insert_user_if_absent(&self, user: &User) -> Result<bool>;

    /// Insert a user only while no users exist at all
    ///
    /// Atomic like [`insert_user_if_absent`](Self::insert_user_if_absent).
    /// Returns `false` when the store already holds any user.
    fn insert_first_user(&self, user: &User) -> Result<bool>;

    /// Replace a user's password hash. Returns `false` if the user is unknown.
    fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Enable or disable an account. Returns `false` if the user is unknown.
    fn set_active(&self, id: Uuid, active: bool) -> Result<bool>;

    /// Persist the server-side half of a new session
    fn insert_session(&self, record: &SessionRecord) -> Result<()>;

    /// Look a session up by the hash of its token
    fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>>;

    /// Remove a session. Returns `false` if it did not exist.
    fn delete_session(&self, token_hash: &str) -> Result<bool>;

    /// Remove sessions created before `cutoff`; returns how many went
    fn delete_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Total number of stored users
    fn count_users(&self) -> Result<i64>;

    /// Liveness check: a trivial round trip to the database
    fn ping(&self) -> Result<()>;
}
