use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use tracing::debug;

pub type UserId = i64;

/// Opaque value handed to the client to correlate later requests with an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self(B64.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

struct SessionEntry {
    user_id: UserId,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl SessionEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Server-side session table: token -> identity.
pub struct SessionManager {
    sessions: Mutex<HashMap<SessionToken, SessionEntry>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    // Every mutation is a single map operation, so a poisoned table is still consistent.
    fn table(&self) -> MutexGuard<'_, HashMap<SessionToken, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn establish(&self, user_id: UserId) -> SessionToken {
        let token = SessionToken::generate();
        let now = Instant::now();

        let mut table = self.table();
        table.retain(|_, entry| entry.is_live(now));
        table.insert(
            token.clone(),
            SessionEntry {
                user_id,
                expires_at: now.checked_add(self.ttl),
            },
        );

        debug!("Session established for user {} ({} active)", user_id, table.len());
        token
    }

    /// `None` for unknown or expired tokens. Expired entries are dropped here.
    pub fn current_identity(&self, token: &str) -> Option<UserId> {
        let key = SessionToken(token.to_string());
        let mut table = self.table();

        match table.get(&key) {
            Some(entry) if entry.is_live(Instant::now()) => Some(entry.user_id),
            Some(_) => {
                table.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn is_authenticated(&self, token: &str) -> bool {
        self.current_identity(token).is_some()
    }

    pub fn terminate(&self, token: &str) {
        if let Some(entry) = self.table().remove(&SessionToken(token.to_string())) {
            debug!("Session terminated for user {}", entry.user_id);
        }
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn establish_then_resolve() {
        let sessions = SessionManager::new(Duration::from_secs(60));
        let token = sessions.establish(7);

        assert_eq!(sessions.current_identity(token.as_str()), Some(7));
        assert!(sessions.is_authenticated(token.as_str()));
        assert_eq!(sessions.current_identity("bogus"), None);
    }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let sessions = SessionManager::new(Duration::from_secs(60));
        let a = sessions.establish(1);
        let b = sessions.establish(1);

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn terminate_is_idempotent() {
        let sessions = SessionManager::new(Duration::from_secs(60));
        let token = sessions.establish(3);

        sessions.terminate(token.as_str());
        sessions.terminate(token.as_str());

        assert_eq!(sessions.current_identity(token.as_str()), None);
        assert!(sessions.is_empty());
    }

    #[test]
    fn expired_sessions_resolve_to_none() {
        let sessions = SessionManager::new(Duration::ZERO);
        let token = sessions.establish(9);

        assert_eq!(sessions.current_identity(token.as_str()), None);
        assert!(sessions.is_empty());
    }

    #[test]
    fn establish_purges_expired_entries() {
        let sessions = SessionManager::new(Duration::ZERO);
        sessions.establish(1);
        sessions.establish(2);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn oversized_ttl_never_expires() {
        let sessions = SessionManager::new(Duration::from_secs((u64::MAX / 3600) * 3600));
        let token = sessions.establish(1);

        assert_eq!(sessions.current_identity(token.as_str()), Some(1));
        sessions.establish(2);
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn concurrent_establish_and_terminate() {
        let sessions = SessionManager::new(Duration::from_secs(60));

        thread::scope(|s| {
            for worker in 0..8 {
                let sessions = &sessions;
                s.spawn(move || {
                    for i in 0..50 {
                        let token = sessions.establish(worker * 100 + i);
                        assert_eq!(sessions.current_identity(token.as_str()), Some(worker * 100 + i));
                        // Every worker keeps its even-numbered sessions.
                        if i % 2 == 1 {
                            sessions.terminate(token.as_str());
                        }
                    }
                });
            }
        });

        assert_eq!(sessions.len(), 8 * 25);
    }
}
