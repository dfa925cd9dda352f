//! Profile changes awaiting email confirmation.
//!
//! Entries are keyed by the account's current email address, compared
//! case-insensitively. At most one entry exists per address; a new request
//! replaces the old one. Reading an entry for confirmation removes it, so a
//! code can be tried exactly once.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use agora_types::models::{ProfileChanges, email_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub email: String,
    pub changes: ProfileChanges,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingUpdate {
    pub fn is_valid(&self, code: &str, now: DateTime<Utc>) -> bool {
        self.code == code && now <= self.expires_at
    }
}

pub trait PendingUpdateStore: Send + Sync {
    /// Insert or replace the entry for `update.email`.
    fn put(&self, update: PendingUpdate);

    /// Remove and return the entry for `email`, if any.
    fn take(&self, email: &str) -> Option<PendingUpdate>;
}

/// Process-local store. Entries do not survive a restart.
#[derive(Default)]
pub struct InMemoryPendingUpdates {
    entries: Mutex<HashMap<String, PendingUpdate>>,
}

impl InMemoryPendingUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn peek(&self, email: &str) -> Option<PendingUpdate> {
        self.lock().get(&email_key(email)).cloned()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingUpdate>> {
        // A panic mid-insert cannot leave the map half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PendingUpdateStore for InMemoryPendingUpdates {
    fn put(&self, update: PendingUpdate) {
        self.lock().insert(email_key(&update.email), update);
    }

    fn take(&self, email: &str) -> Option<PendingUpdate> {
        self.lock().remove(&email_key(email))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::Duration;

    use super::*;

    fn update(email: &str, code: &str) -> PendingUpdate {
        PendingUpdate {
            email: email.to_string(),
            changes: ProfileChanges {
                username: "newname".into(),
                email_address: "new@example.com".into(),
            },
            code: code.to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn take_removes_the_entry() {
        let store = InMemoryPendingUpdates::new();
        store.put(update("a@example.com", "123456"));

        assert!(store.take("a@example.com").is_some());
        assert!(store.take("a@example.com").is_none());
    }

    #[test]
    fn keys_ignore_case_and_latest_wins() {
        let store = InMemoryPendingUpdates::new();
        store.put(update("Alice@Example.com", "111111"));
        store.put(update("alice@example.com", "222222"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.take("ALICE@example.COM").unwrap().code, "222222");
    }

    #[test]
    fn validity_checks_code_and_expiry() {
        let entry = update("a@example.com", "123456");
        let now = Utc::now();

        assert!(entry.is_valid("123456", now));
        assert!(!entry.is_valid("654321", now));
        assert!(!entry.is_valid("123456", entry.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn concurrent_writers_do_not_lose_entries() {
        let store = Arc::new(InMemoryPendingUpdates::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for j in 0..50 {
                        store.put(update(&format!("user{}-{}@example.com", i, j), "123456"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 400);
    }

    #[test]
    fn only_one_concurrent_take_wins() {
        let store = Arc::new(InMemoryPendingUpdates::new());
        store.put(update("race@example.com", "123456"));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                let email = if i % 2 == 0 { "race@example.com" } else { "RACE@example.com" };
                thread::spawn(move || store.take(email).is_some())
            })
            .collect();
        let winners = handles.into_iter().map(|h| h.join().unwrap()).filter(|won| *won).count();

        assert_eq!(winners, 1);
        assert!(store.is_empty());
    }
}
