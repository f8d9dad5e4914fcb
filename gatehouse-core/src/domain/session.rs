//! Session domain model

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::result::Result;
use crate::ports::SessionStore;

/// Store key holding the bound user id
pub const KEY_USER_ID: &str = "user_id";
/// Store key holding the random session token
pub const KEY_SESSION_TOKEN: &str = "session_token";
/// Store key holding the RFC 3339 authentication time
pub const KEY_AUTHENTICATED_AT: &str = "authenticated_at";

/// SHA-256 of a session token, hex encoded
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Server-side half of a session, keyed by the token hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the record is outside its lifetime at `now`
    ///
    /// A creation time in the future is never valid.
    pub fn is_expired(&self, lifetime: Duration, now: DateTime<Utc>) -> bool {
        expired(self.created_at, lifetime, now)
    }
}

fn expired(started: DateTime<Utc>, lifetime: Duration, now: DateTime<Utc>) -> bool {
    let age = now.signed_duration_since(started);
    age < Duration::zero() || age > lifetime
}

/// An authenticated session bound to exactly one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub token: String,
    pub authenticated_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for a user with a fresh 32-byte token
    pub fn start(user_id: Uuid) -> Self {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        Self {
            user_id,
            token: hex::encode(bytes),
            // Microsecond precision survives the database round trip
            authenticated_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Whether the session is older than `lifetime` at `now`, or dated in the future
    pub fn is_expired(&self, lifetime: Duration, now: DateTime<Utc>) -> bool {
        expired(self.authenticated_at, lifetime, now)
    }

    pub fn token_hash(&self) -> String {
        hash_token(&self.token)
    }

    /// The record to persist server-side for this session
    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            token_hash: self.token_hash(),
            user_id: self.user_id,
            created_at: self.authenticated_at,
        }
    }

    /// Token prefix safe to put in logs
    pub fn token_hint(&self) -> String {
        format!("{}...", self.token.chars().take(8).collect::<String>())
    }

    /// Read the session out of a store
    ///
    /// Returns `None` unless every key is present and parses.
    pub fn load(store: &dyn SessionStore) -> Result<Option<Self>> {
        let user_id = store.get(KEY_USER_ID)?;
        let token = store.get(KEY_SESSION_TOKEN)?;
        let authenticated_at = store.get(KEY_AUTHENTICATED_AT)?;

        let (Some(user_id), Some(token), Some(authenticated_at)) = (user_id, token, authenticated_at)
        else {
            return Ok(None);
        };

        let Ok(user_id) = Uuid::parse_str(&user_id) else {
            return Ok(None);
        };
        let Ok(authenticated_at) = DateTime::parse_from_rfc3339(&authenticated_at) else {
            return Ok(None);
        };
        if token.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            user_id,
            token,
            authenticated_at: authenticated_at.with_timezone(&Utc),
        }))
    }

    /// Replace whatever the store holds with this session
    pub fn save(&self, store: &dyn SessionStore) -> Result<()> {
        store.clear()?;
        store.set(KEY_USER_ID, &self.user_id.to_string())?;
        store.set(KEY_SESSION_TOKEN, &self.token)?;
        store.set(KEY_AUTHENTICATED_AT, &self.authenticated_at.to_rfc3339())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_session::MemorySessionStore;

    #[test]
    fn test_start_generates_hex_token() {
        let session = Session::start(Uuid::new_v4());
        assert_eq!(session.token.len(), 64);
        assert!(session.token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(session.token, Session::start(session.user_id).token);
    }

    #[test]
    fn test_save_and_load() {
        let store = MemorySessionStore::new();
        let session = Session::start(Uuid::new_v4());
        session.save(&store).unwrap();

        let loaded = Session::load(&store).unwrap().unwrap();
        assert_eq!(loaded.user_id, session.user_id);
        assert_eq!(loaded.token, session.token);
    }

    #[test]
    fn test_partial_store_reads_as_absent() {
        let store = MemorySessionStore::new();
        store.set(KEY_USER_ID, &Uuid::new_v4().to_string()).unwrap();
        assert!(Session::load(&store).unwrap().is_none());

        store.set(KEY_SESSION_TOKEN, "abc").unwrap();
        store.set(KEY_AUTHENTICATED_AT, "not a date").unwrap();
        assert!(Session::load(&store).unwrap().is_none());
    }

    #[test]
    fn test_expiry() {
        let mut session = Session::start(Uuid::new_v4());
        let now = Utc::now();
        session.authenticated_at = now - Duration::minutes(121);
        assert!(session.is_expired(Duration::minutes(120), now));
        assert!(!session.is_expired(Duration::minutes(180), now));
    }

    #[test]
    fn test_future_dated_session_is_expired() {
        let mut session = Session::start(Uuid::new_v4());
        let now = Utc::now();
        session.authenticated_at = now + Duration::days(3650);
        assert!(session.is_expired(Duration::minutes(120), now));
        assert!(session.record().is_expired(Duration::minutes(120), now));
    }

    #[test]
    fn test_record_keeps_only_token_hash() {
        let session = Session::start(Uuid::new_v4());
        let record = session.record();
        assert_eq!(record.token_hash, hash_token(&session.token));
        assert_eq!(record.token_hash.len(), 64);
        assert_ne!(record.token_hash, session.token);
        assert_eq!(record.created_at, session.authenticated_at);
    }

    #[test]
    fn test_token_hint_is_short() {
        let session = Session::start(Uuid::new_v4());
        assert_eq!(session.token_hint().len(), 11);
        assert!(session.token.starts_with(session.token_hint().trim_end_matches("...")));
    }
}
