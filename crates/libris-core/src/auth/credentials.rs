//! The three persisted session entries.
//!
//! Access token, refresh token and the JSON-serialized identity live under
//! fixed keys. A session is only restorable when all three are present, and
//! they are always cleared together.

use anyhow::{Context, Result};

use crate::models::{Credential, Identity};
use crate::storage::KeyValueStore;

use super::session::Session;

pub const ACCESS_TOKEN_KEY: &str = "auth_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const IDENTITY_KEY: &str = "user";

const ALL_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, IDENTITY_KEY];

/// Read the stored session. `Ok(None)` when any entry is missing; an error
/// when all are present but do not form a valid session.
pub fn load<S: KeyValueStore + ?Sized>(storage: &S) -> Result<Option<Session>> {
    let access_token = storage.get(ACCESS_TOKEN_KEY)?;
    let refresh_token = storage.get(REFRESH_TOKEN_KEY)?;
    let identity = storage.get(IDENTITY_KEY)?;

    let (Some(access_token), Some(refresh_token), Some(identity)) =
        (access_token, refresh_token, identity)
    else {
        return Ok(None);
    };

    let identity: Identity =
        serde_json::from_str(&identity).context("Failed to parse stored identity")?;
    let session = Session::new(
        identity,
        Credential {
            access_token,
            refresh_token,
        },
    )
    .context("Stored session is incomplete")?;
    Ok(Some(session))
}

pub fn save<S: KeyValueStore + ?Sized>(storage: &S, session: &Session) -> Result<()> {
    let identity = serde_json::to_string(session.identity())?;
    storage.set(ACCESS_TOKEN_KEY, &session.credential().access_token)?;
    storage.set(REFRESH_TOKEN_KEY, &session.credential().refresh_token)?;
    storage.set(IDENTITY_KEY, &identity)?;
    Ok(())
}

/// Remove all three entries. Every key is attempted; the first failure is
/// returned.
pub fn clear<S: KeyValueStore + ?Sized>(storage: &S) -> Result<()> {
    let mut first_error = None;
    for key in ALL_KEYS {
        if let Err(e) = storage.remove(key) {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e.context("Failed to clear stored session")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::storage::MemoryStore;

    fn sample() -> Session {
        Session::new(
            Identity {
                id: "1".to_string(),
                username: "u".to_string(),
                role: Role::User,
                email: Some("u@x.com".to_string()),
            },
            Credential {
                access_token: "T".to_string(),
                refresh_token: "R".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_save_writes_three_entries() {
        let store = MemoryStore::new();
        save(&store, &sample()).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("T"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R"));
        assert_eq!(
            store.get(IDENTITY_KEY).unwrap().as_deref(),
            Some(r#"{"_id":"1","username":"u","role":"user","email":"u@x.com"}"#)
        );
        assert_eq!(load(&store).unwrap(), Some(sample()));
    }

    #[test]
    fn test_load_requires_all_entries() {
        let store = MemoryStore::new();
        save(&store, &sample()).unwrap();
        store.remove(REFRESH_TOKEN_KEY).unwrap();
        assert_eq!(load(&store).unwrap(), None);
    }

    #[test]
    fn test_load_rejects_bad_identity() {
        let store = MemoryStore::new();
        store.set(ACCESS_TOKEN_KEY, "T").unwrap();
        store.set(REFRESH_TOKEN_KEY, "R").unwrap();
        store.set(IDENTITY_KEY, "{not json").unwrap();
        assert!(load(&store).is_err());

        store.set(ACCESS_TOKEN_KEY, "").unwrap();
        store
            .set(IDENTITY_KEY, r#"{"_id":"1","username":"u","role":"user"}"#)
            .unwrap();
        assert!(load(&store).is_err());
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = MemoryStore::new();
        save(&store, &sample()).unwrap();
        clear(&store).unwrap();
        assert!(store.is_empty());
    }
}
