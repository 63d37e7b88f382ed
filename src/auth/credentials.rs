use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Tokens issued without an expiry are treated as expiring this far in the
/// future, keeping the staleness comparison uniform.
const NEVER_EXPIRES_YEARS: i64 = 100;

#[derive(Debug, Clone)]
struct Credential {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Holds the current bearer token and its expiry.
///
/// Token and expiry live in one slot behind one lock: a reader never
/// observes a token paired with a stale expiry. `is_expired` is the single
/// source of truth for "must (re)authenticate".
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the stored credential. A missing expiry means the
    /// token never expires and is normalized to the far-future sentinel.
    pub fn set(&self, token: String, expires_at: Option<DateTime<Utc>>) {
        let expires_at =
            expires_at.unwrap_or_else(|| Utc::now() + Duration::days(365 * NEVER_EXPIRES_YEARS));
        *self.current.write() = Some(Credential { token, expires_at });
    }

    /// Drop the credential so the next staleness check reports expired.
    /// Used on authentication failure.
    pub fn clear(&self) {
        *self.current.write() = None;
    }

    /// True when no token is set or the expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Staleness check against an explicit clock.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.current.read().as_ref() {
            Some(credential) => credential.expires_at <= now,
            None => true,
        }
    }

    /// The current bearer token, if one is set.
    pub fn token(&self) -> Option<String> {
        self.current.read().as_ref().map(|c| c.token.clone())
    }

    /// Expiry of the current token, if one is set.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.current.read().as_ref().map(|c| c.expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_is_expired() {
        let store = CredentialStore::new();
        assert!(store.is_expired());
        assert!(store.token().is_none());
    }

    #[test]
    fn test_future_expiry_is_valid() {
        let store = CredentialStore::new();
        store.set("tok".to_string(), Some(Utc::now() + Duration::hours(1)));
        assert!(!store.is_expired());
        assert_eq!(store.token().as_deref(), Some("tok"));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let store = CredentialStore::new();
        store.set("tok".to_string(), Some(Utc::now() - Duration::seconds(1)));
        assert!(store.is_expired());
        // Token is still readable; staleness is a separate question.
        assert_eq!(store.token().as_deref(), Some("tok"));
    }

    #[test]
    fn test_never_expires_sentinel() {
        let store = CredentialStore::new();
        store.set("tok".to_string(), None);
        assert!(!store.is_expired());
        // Still valid across a simulated 50-year clock jump.
        assert!(!store.is_expired_at(Utc::now() + Duration::days(365 * 50)));
    }

    #[test]
    fn test_clear_forces_expired() {
        let store = CredentialStore::new();
        store.set("tok".to_string(), Some(Utc::now() + Duration::hours(1)));
        store.clear();
        assert!(store.is_expired());
        assert!(store.token().is_none());
    }

    #[test]
    fn test_set_replaces_previous_credential() {
        let store = CredentialStore::new();
        store.set("old".to_string(), Some(Utc::now() - Duration::hours(1)));
        store.set("new".to_string(), Some(Utc::now() + Duration::hours(1)));
        assert!(!store.is_expired());
        assert_eq!(store.token().as_deref(), Some("new"));
    }
}
