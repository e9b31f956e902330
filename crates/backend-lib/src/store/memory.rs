// ============================
// crates/backend-lib/src/store/memory.rs
// ============================
//! In-process credential store.
//!
//! A single mutex guards the rows and both identity indexes, so every
//! check-then-write sequence is atomic.

use super::{CredentialStore, Identity, IdentityField, Principal, PrincipalId, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    last_id: i64,
    rows: BTreeMap<PrincipalId, Principal>,
    usernames: HashMap<String, PrincipalId>,
    emails: HashMap<String, PrincipalId>,
}

impl Inner {
    fn next_id(&mut self) -> PrincipalId {
        self.last_id += 1;
        PrincipalId(self.last_id)
    }

    /// Reject identity values held by any row other than `owner`
    fn check_free(
        &self,
        username: &str,
        email: &str,
        owner: Option<PrincipalId>,
    ) -> Result<(), StoreError> {
        if self
            .usernames
            .get(username)
            .is_some_and(|holder| Some(*holder) != owner)
        {
            return Err(StoreError::DuplicateIdentity(IdentityField::Username));
        }
        if self
            .emails
            .get(email)
            .is_some_and(|holder| Some(*holder) != owner)
        {
            return Err(StoreError::DuplicateIdentity(IdentityField::Email));
        }
        Ok(())
    }
}

/// Credential store kept in process memory
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a principal, releasing its username and email
    pub fn remove(&self, id: PrincipalId) -> Option<Principal> {
        let mut inner = self.inner.lock();
        let removed = inner.rows.remove(&id)?;
        if let Some(username) = removed.username() {
            inner.usernames.remove(username);
        }
        if let Some(email) = removed.email() {
            inner.emails.remove(email);
        }
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        Ok(self.inner.lock().rows.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .usernames
            .get(username)
            .and_then(|id| inner.rows.get(id))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.rows.get(id))
            .cloned())
    }

    async fn insert_temporary(&self) -> Result<Principal, StoreError> {
        let mut inner = self.inner.lock();
        let principal = Principal {
            id: inner.next_id(),
            identity: Identity::Temporary,
            created_at: Utc::now(),
            is_premium: false,
            premium_until: None,
        };
        inner.rows.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn insert_permanent(
        &self,
        username: &str,
        email: &str,
        secret_hash: &str,
    ) -> Result<Principal, StoreError> {
        let mut inner = self.inner.lock();
        inner.check_free(username, email, None)?;

        let principal = Principal {
            id: inner.next_id(),
            identity: Identity::Permanent {
                username: username.to_string(),
                email: email.to_string(),
                secret_hash: secret_hash.to_string(),
            },
            created_at: Utc::now(),
            is_premium: false,
            premium_until: None,
        };
        inner.usernames.insert(username.to_string(), principal.id);
        inner.emails.insert(email.to_string(), principal.id);
        inner.rows.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn convert_to_permanent(
        &self,
        id: PrincipalId,
        username: &str,
        email: &str,
        secret_hash: &str,
    ) -> Result<Principal, StoreError> {
        let mut inner = self.inner.lock();
        match inner.rows.get(&id) {
            Some(row) if row.is_temporary() => {}
            _ => return Err(StoreError::NotTemporary),
        }
        inner.check_free(username, email, Some(id))?;

        inner.usernames.insert(username.to_string(), id);
        inner.emails.insert(email.to_string(), id);
        let row = inner.rows.get_mut(&id).ok_or(StoreError::NotTemporary)?;
        row.identity = Identity::Permanent {
            username: username.to_string(),
            email: email.to_string(),
            secret_hash: secret_hash.to_string(),
        };
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temporary_rows_do_not_collide() {
        let store = MemoryCredentialStore::new();
        let a = store.insert_temporary().await.unwrap();
        let b = store.insert_temporary().await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(a.is_temporary() && b.is_temporary());
        assert!(a.username().is_none() && a.email().is_none() && a.secret_hash().is_none());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_permanent_rejects_duplicates() {
        let store = MemoryCredentialStore::new();
        store
            .insert_permanent("alice", "alice@example.com", "h1")
            .await
            .unwrap();

        let err = store
            .insert_permanent("alice", "other@example.com", "h2")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentity(IdentityField::Username)));

        let err = store
            .insert_permanent("alice2", "alice@example.com", "h2")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentity(IdentityField::Email)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_convert_happens_once() {
        let store = MemoryCredentialStore::new();
        let temp = store.insert_temporary().await.unwrap();

        let converted = store
            .convert_to_permanent(temp.id, "bob", "bob@example.com", "hash")
            .await
            .unwrap();
        assert_eq!(converted.id, temp.id);
        assert!(!converted.is_temporary());
        assert_eq!(converted.created_at, temp.created_at);

        let err = store
            .convert_to_permanent(temp.id, "bob2", "bob2@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotTemporary));

        let found = store.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(found.id, temp.id);
        assert!(store.find_by_username("bob2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_convert_missing_row_is_not_temporary() {
        let store = MemoryCredentialStore::new();
        let err = store
            .convert_to_permanent(PrincipalId(42), "x", "x@example.com", "h")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotTemporary));
    }

    #[tokio::test]
    async fn test_convert_collides_with_other_row() {
        let store = MemoryCredentialStore::new();
        store
            .insert_permanent("carol", "carol@example.com", "h")
            .await
            .unwrap();
        let temp = store.insert_temporary().await.unwrap();

        let err = store
            .convert_to_permanent(temp.id, "carol", "new@example.com", "h")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentity(IdentityField::Username)));

        // the failed attempt leaves the row temporary
        let row = store.find_by_id(temp.id).await.unwrap().unwrap();
        assert!(row.is_temporary());
        assert!(store.find_by_email("new@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_racing_registrations_have_one_winner() {
        let store = MemoryCredentialStore::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert_permanent("alice", &format!("alice{i}@example.com"), "h")
                    .await
            }));
        }

        let mut ok = 0;
        let mut dup = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::DuplicateIdentity(IdentityField::Username)) => dup += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(dup, 7);
    }

    #[tokio::test]
    async fn test_remove_releases_identity() {
        let store = MemoryCredentialStore::new();
        let p = store
            .insert_permanent("dave", "dave@example.com", "h")
            .await
            .unwrap();
        assert!(store.remove(p.id).is_some());
        assert!(store.find_by_id(p.id).await.unwrap().is_none());

        store
            .insert_permanent("dave", "dave@example.com", "h")
            .await
            .unwrap();
    }
}
