//! Single-use login tokens.
//!
//! The web front end writes a token record when a user logs in; the gateway consumes it
//! on `clientInfo` to learn the user id behind a connection. A token can be exchanged
//! only once.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("no login record for token")]
    NotFound,
    #[error("{0} login records share the token")]
    MultipleMatches(usize),
}

/// Resolves a token to a user id, invalidating it.
pub trait CredentialStore: Send + Sync {
    fn consume(&self, token: &str) -> Result<i64, LookupError>;
}

/// One login record.
#[derive(Deserialize, Debug, Clone)]
pub struct TokenRecord {
    pub token: String,
    pub user_id: i64,
}

/// In-memory token table.
#[derive(Default)]
pub struct TokenStore {
    records: Mutex<HashMap<String, Vec<i64>>>,
}

impl TokenStore {
    pub fn new(records: impl IntoIterator<Item = TokenRecord>) -> Self {
        let store = Self::default();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Loads a JSON array of `{"token", "user_id"}` records.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<TokenRecord> = serde_json::from_str(&raw)?;
        info!(
            "[Auth] Loaded {} login records from {}",
            records.len(),
            path.display()
        );
        Ok(Self::new(records))
    }

    pub fn insert(&self, record: TokenRecord) {
        self.lock()
            .entry(record.token)
            .or_default()
            .push(record.user_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<i64>>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for TokenStore {
    fn consume(&self, token: &str) -> Result<i64, LookupError> {
        let mut records = self.lock();
        match records.get(token).map_or(0, Vec::len) {
            0 => Err(LookupError::NotFound),
            1 => {
                let user_id = records
                    .remove(token)
                    .and_then(|ids| ids.first().copied())
                    .ok_or(LookupError::NotFound)?;
                debug!("[Auth] Token consumed for user {user_id}");
                Ok(user_id)
            }
            count => Err(LookupError::MultipleMatches(count)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(token: &str, user_id: i64) -> TokenRecord {
        TokenRecord {
            token: token.to_string(),
            user_id,
        }
    }

    #[test]
    fn token_resolves_once() {
        let store = TokenStore::new([record("abc", 7)]);
        assert_eq!(store.consume("abc"), Ok(7));
        assert_eq!(store.consume("abc"), Err(LookupError::NotFound));
    }

    #[test]
    fn unknown_token_is_not_found() {
        let store = TokenStore::new([record("abc", 7)]);
        assert_eq!(store.consume("nope"), Err(LookupError::NotFound));
        // The real token is untouched.
        assert_eq!(store.consume("abc"), Ok(7));
    }

    #[test]
    fn duplicated_token_is_ambiguous_and_kept() {
        let store = TokenStore::new([record("dup", 1), record("dup", 2)]);
        assert_eq!(store.consume("dup"), Err(LookupError::MultipleMatches(2)));
        assert_eq!(store.consume("dup"), Err(LookupError::MultipleMatches(2)));
    }

    #[test]
    fn load_reads_json_records() {
        let path = std::env::temp_dir().join(format!("tokens-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"[{"token":"t1","user_id":11},{"token":"t2","user_id":12}]"#)
            .unwrap();
        let store = TokenStore::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(store.consume("t2"), Ok(12));
        assert_eq!(store.consume("t1"), Ok(11));
    }
}
