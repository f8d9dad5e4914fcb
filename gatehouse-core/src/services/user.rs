//! User service - registration, authentication and session lifecycle
//!
//! Business outcomes (bad credentials, duplicate registration, weak
//! password) come back as [`OperationResult`]. Only infrastructure faults
//! are returned as `Err`.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::domain::result::{OperationResult, Result};
use crate::domain::{NewUser, Session, User, UserProfile, UserType};
use crate::ports::{SessionStore, UserRepository};
use crate::services::password::PasswordHasher;

const INVALID_CREDENTIALS: &str = "Invalid credentials provided.";
const ADMIN_REQUIRED: &str = "Administrator access required";
const ACCOUNT_DEACTIVATED: &str =
    "Your account has been deactivated. Please contact an administrator.";

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

/// Syntactic email check
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// User management service
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    config: AuthConfig,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, config: AuthConfig) -> Self {
        let hasher = PasswordHasher::new(config.argon2);
        Self {
            repository,
            config,
            hasher,
        }
    }

    /// Authenticate by email or username and bind the session on success
    ///
    /// Any previous session in the store is revoked first, so any outcome
    /// other than success leaves no valid session behind.
    pub fn authenticate(
        &self,
        session: &dyn SessionStore,
        identifier: &str,
        password: &str,
    ) -> Result<OperationResult> {
        tracing::info!(identifier = %identifier, "authenticate attempt");

        self.revoke(session)?;

        let outcome = self.check_credentials(identifier, password)?;
        let user = match outcome {
            Ok(user) => user,
            Err(failure) => return Ok(failure),
        };

        let new_session = Session::start(user.id);
        self.repository.insert_session(&new_session.record())?;
        new_session.save(session)?;

        if let Some(cutoff) = new_session
            .authenticated_at
            .checked_sub_signed(self.config.session_lifetime)
        {
            let purged = self.repository.delete_sessions_before(cutoff)?;
            if purged > 0 {
                tracing::debug!(purged, "expired sessions removed");
            }
        }

        tracing::info!(
            user_id = %user.id,
            session_token = %new_session.token_hint(),
            "authenticate success"
        );
        Ok(OperationResult::ok("Authentication successful"))
    }

    /// Resolve the user behind a credential pair, or the failure to report
    fn check_credentials(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<std::result::Result<User, OperationResult>> {
        let Some(user) = self.find_by_identifier(identifier)? else {
            self.hasher.verify_dummy(password);
            tracing::debug!(identifier = %identifier, "authenticate failed: unknown identifier");
            return Ok(Err(OperationResult::fail(INVALID_CREDENTIALS)));
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, reason = "invalid_password", "authenticate failed");
            return Ok(Err(OperationResult::fail(INVALID_CREDENTIALS)));
        }

        if !user.active {
            tracing::info!(user_id = %user.id, reason = "inactive", "authenticate failed");
            return Ok(Err(OperationResult::fail(ACCOUNT_DEACTIVATED)));
        }

        Ok(Ok(user))
    }

    /// Whether the store holds a live session for an existing, active user
    ///
    /// Read-only: never renews or clears the session.
    pub fn validate_session(&self, session: &dyn SessionStore) -> Result<bool> {
        self.validate_session_at(session, Utc::now())
    }

    /// [`validate_session`](Self::validate_session) against an explicit clock
    pub fn validate_session_at(&self, session: &dyn SessionStore, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.session_user(session, now)?.is_some())
    }

    /// The active user behind a session whose token is known server-side
    fn session_user(&self, session: &dyn SessionStore, now: DateTime<Utc>) -> Result<Option<User>> {
        let Some(current) = Session::load(session)? else {
            return Ok(None);
        };

        let Some(record) = self.repository.find_session(&current.token_hash())? else {
            tracing::debug!(user_id = %current.user_id, "session token not recognised");
            return Ok(None);
        };
        if record.user_id != current.user_id {
            tracing::debug!(user_id = %current.user_id, "session token bound to another user");
            return Ok(None);
        }
        if record.is_expired(self.config.session_lifetime, now)
            || current.is_expired(self.config.session_lifetime, now)
        {
            tracing::debug!(user_id = %current.user_id, "session expired");
            return Ok(None);
        }

        Ok(self
            .repository
            .find_by_id(record.user_id)?
            .filter(|user| user.active))
    }

    /// End the session, if any. Always `true` once the store is cleared.
    pub fn destroy_session(&self, session: &dyn SessionStore) -> Result<bool> {
        self.revoke(session)?;
        Ok(true)
    }

    /// Drop the server-side record of whatever the store holds, then clear it
    fn revoke(&self, session: &dyn SessionStore) -> Result<()> {
        if let Some(current) = Session::load(session)? {
            if self.repository.delete_session(&current.token_hash())? {
                tracing::info!(user_id = %current.user_id, "session destroyed");
            }
        }
        session.clear()
    }

    /// Register a new account
    ///
    /// Open registration creates students. Any other user type is accepted
    /// only for the very first account; afterwards it takes an administrator
    /// (see [`create_user_as_admin`](Self::create_user_as_admin)).
    pub fn create_user(&self, data: &NewUser) -> Result<OperationResult> {
        self.register(data, false)
    }

    /// Register an account on behalf of the administrator holding `session`
    pub fn create_user_as_admin(
        &self,
        session: &dyn SessionStore,
        data: &NewUser,
    ) -> Result<OperationResult> {
        let is_admin = self
            .session_user(session, Utc::now())?
            .is_some_and(|user| user.user_type == UserType::Admin);
        if !is_admin {
            return Ok(OperationResult::fail(ADMIN_REQUIRED));
        }
        self.register(data, true)
    }

    fn register(&self, data: &NewUser, by_admin: bool) -> Result<OperationResult> {
        let data = data.trimmed();
        tracing::info!(email = %data.email, "user creation attempt");

        if let Some(field) = data.first_missing_field() {
            return Ok(OperationResult::fail(format!("Required field missing: {}", field)));
        }
        if !is_valid_email(&data.email) {
            return Ok(OperationResult::fail("Invalid email format"));
        }
        if let Some(reason) = self.config.password_policy.check(&data.password) {
            return Ok(OperationResult::fail(reason));
        }
        let user_type = match data.user_type.as_deref().filter(|t| !t.is_empty()) {
            Some(raw) => match raw.parse::<UserType>() {
                Ok(user_type) => user_type,
                Err(reason) => return Ok(OperationResult::fail(reason)),
            },
            None => UserType::default(),
        };
        let needs_empty_store = user_type != UserType::default() && !by_admin;
        if needs_empty_store && self.repository.count_users()? > 0 {
            tracing::info!(user_type = %user_type, "user creation rejected: role requires admin");
            return Ok(OperationResult::fail(ADMIN_REQUIRED));
        }

        let password_hash = self.hasher.hash(&data.password)?;
        let user = User::new(
            data.username,
            data.email,
            password_hash,
            data.name,
            data.surname,
            user_type,
        );

        if needs_empty_store {
            // Lost a race for the first account
            if !self.repository.insert_first_user(&user)? {
                tracing::info!(user_type = %user_type, "user creation rejected: role requires admin");
                return Ok(OperationResult::fail(ADMIN_REQUIRED));
            }
        } else if !self.repository.insert_user_if_absent(&user)? {
            tracing::info!(email = %user.email, "user creation rejected: duplicate");
            return Ok(OperationResult::fail("Username or email already exists"));
        }

        tracing::info!(
            user_id = %user.id,
            username = %user.username,
            user_type = %user.user_type,
            "user created"
        );
        Ok(OperationResult::ok("User account created successfully"))
    }

    /// Change a password after checking the current one
    pub fn update_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<OperationResult> {
        let Some(user) = self.repository.find_by_id(user_id)? else {
            return Ok(OperationResult::fail("User not found"));
        };

        if !self.hasher.verify(current_password, &user.password_hash)? {
            return Ok(OperationResult::fail("Current password is incorrect"));
        }
        if let Some(reason) = self.config.password_policy.check(new_password) {
            return Ok(OperationResult::fail(reason));
        }

        let password_hash = self.hasher.hash(new_password)?;
        if !self
            .repository
            .update_password_hash(user_id, &password_hash, Utc::now())?
        {
            return Ok(OperationResult::fail("User not found"));
        }

        tracing::info!(user_id = %user_id, "password updated");
        Ok(OperationResult::ok("Password updated successfully"))
    }

    /// Password-free view of a user
    pub fn get_user_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        Ok(self.repository.find_by_id(user_id)?.map(|u| u.profile()))
    }

    /// Profile of the user bound to a valid session
    pub fn current_user(&self, session: &dyn SessionStore) -> Result<Option<UserProfile>> {
        Ok(self.session_user(session, Utc::now())?.map(|u| u.profile()))
    }

    /// Look a user up by email or username
    pub fn find_user(&self, identifier: &str) -> Result<Option<UserProfile>> {
        Ok(self.find_by_identifier(identifier)?.map(|u| u.profile()))
    }

    /// Whether the user holds one of the given roles; false for unknown users
    pub fn has_role(&self, user_id: Uuid, roles: &[UserType]) -> Result<bool> {
        Ok(self
            .repository
            .find_by_id(user_id)?
            .is_some_and(|user| roles.contains(&user.user_type)))
    }

    /// Enable or disable an account
    pub fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<OperationResult> {
        if !self.repository.set_active(user_id, active)? {
            return Ok(OperationResult::fail("User not found"));
        }
        tracing::info!(user_id = %user_id, active, "user active flag changed");
        Ok(OperationResult::ok(if active {
            "User account enabled"
        } else {
            "User account disabled"
        }))
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }
        if let Some(user) = self.repository.find_by_email(identifier)? {
            return Ok(Some(user));
        }
        self.repository.find_by_username(identifier)
    }
}
