use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::codec::{TokenCodec, TokenKind};
use super::password::Hasher;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::Identity;

/// Input to registration. Avatar and cover refs point into the external
/// object store; uploading is not this crate's concern.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
}

/// A freshly issued access/refresh pair plus the identity it belongs to.
pub struct SessionPair {
    pub identity: Identity,
    pub access_token: String,
    pub refresh_token: String,
}

/// The result of a refresh-token rotation.
pub struct RotatedPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues access/refresh pairs, authorizes requests, and rotates refresh
/// tokens. Exactly one refresh token is valid per identity at any instant;
/// login overwrites it and refresh replaces it through a compare-and-swap.
pub struct SessionManager {
    store: Arc<dyn Store>,
    codec: TokenCodec,
    hasher: Hasher,
}

impl SessionManager {
    pub fn new(store: Arc<dyn Store>, codec: TokenCodec) -> Self {
        Self {
            store,
            codec,
            hasher: Hasher::new(),
        }
    }

    pub fn register(&self, new: NewIdentity) -> Result<Identity> {
        let username = new.username.trim().to_lowercase();
        let email = new.email.trim().to_string();
        let full_name = new.full_name.trim().to_string();

        if username.is_empty() || email.is_empty() || full_name.is_empty() {
            return Err(Error::InvalidArgument(
                "username, email, and full name are required".into(),
            ));
        }
        if new.password.is_empty() {
            return Err(Error::InvalidArgument("password is required".into()));
        }

        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            full_name,
            password_hash: self.hasher.hash(&new.password)?,
            avatar_url: new.avatar_url,
            cover_url: new.cover_url,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        self.store.create_identity(&identity)?;
        Ok(identity)
    }

    /// Logs in by username or email. A successful login overwrites the
    /// stored refresh token, invalidating any previous session.
    pub fn login(&self, login: &str, password: &str) -> Result<SessionPair> {
        let identity = self
            .store
            .find_identity_by_login(login)?
            .ok_or(Error::NotFound)?;

        if !self.hasher.verify(password, &identity.password_hash)? {
            return Err(Error::BadCredential);
        }

        let access_token = self.codec.issue(&identity.id, TokenKind::Access)?;
        let refresh_token = self.codec.issue(&identity.id, TokenKind::Refresh)?;
        self.store
            .set_refresh_token(&identity.id, Some(&refresh_token))?;

        Ok(SessionPair {
            identity,
            access_token,
            refresh_token,
        })
    }

    /// Clears the stored refresh token. Idempotent.
    pub fn logout(&self, identity_id: &str) -> Result<()> {
        self.store.set_refresh_token(identity_id, None)
    }

    /// Rotation-on-use. The incoming token must verify as a refresh token
    /// AND exactly equal the stored value; the replacement is installed with
    /// a compare-and-swap so a concurrent rotation loser gets
    /// `Unauthorized`, not a corrupted session. Every token failure mode
    /// collapses into `Unauthorized`.
    pub fn refresh(&self, incoming: &str) -> Result<RotatedPair> {
        let identity_id = self
            .codec
            .verify(incoming, TokenKind::Refresh)
            .map_err(|_| Error::Unauthorized)?;

        let access_token = self.codec.issue(&identity_id, TokenKind::Access)?;
        let refresh_token = self.codec.issue(&identity_id, TokenKind::Refresh)?;

        let swapped = self
            .store
            .swap_refresh_token(&identity_id, incoming, &refresh_token)?;
        if !swapped {
            // Superseded or cleared token: reuse of a rotated-away value.
            return Err(Error::Unauthorized);
        }

        Ok(RotatedPair {
            access_token,
            refresh_token,
        })
    }

    /// The capability gate for every protected operation: verifies an
    /// access token and loads the identity it names.
    pub fn authorize(&self, access_token: &str) -> Result<Identity> {
        let identity_id = self
            .codec
            .verify(access_token, TokenKind::Access)
            .map_err(|_| Error::Unauthorized)?;

        self.store
            .get_identity(&identity_id)?
            .ok_or(Error::Unauthorized)
    }

    pub fn change_password(&self, identity_id: &str, old: &str, new: &str) -> Result<()> {
        if new.is_empty() {
            return Err(Error::InvalidArgument("new password is required".into()));
        }

        let identity = self
            .store
            .get_identity(identity_id)?
            .ok_or(Error::NotFound)?;

        if !self.hasher.verify(old, &identity.password_hash)? {
            return Err(Error::BadCredential);
        }

        let hash = self.hasher.hash(new)?;
        self.store.update_password(identity_id, &hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::store::SqliteStore;

    fn manager() -> SessionManager {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        let codec = TokenCodec::new(&AuthConfig {
            access_secret: "test-access".to_string(),
            refresh_secret: "test-refresh".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 864_000,
        })
        .unwrap();
        SessionManager::new(Arc::new(store), codec)
    }

    fn register(manager: &SessionManager, username: &str) -> Identity {
        manager
            .register(NewIdentity {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                full_name: username.to_string(),
                password: "hunter2".to_string(),
                avatar_url: None,
                cover_url: None,
            })
            .unwrap()
    }

    #[test]
    fn register_lowercases_username_and_rejects_duplicates() {
        let manager = manager();
        let identity = manager
            .register(NewIdentity {
                username: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                full_name: "Alice".to_string(),
                password: "hunter2".to_string(),
                avatar_url: None,
                cover_url: None,
            })
            .unwrap();
        assert_eq!(identity.username, "alice");

        let dup = manager.register(NewIdentity {
            username: "alice".to_string(),
            email: "alice2@example.com".to_string(),
            full_name: "Alice".to_string(),
            password: "hunter2".to_string(),
            avatar_url: None,
            cover_url: None,
        });
        assert!(matches!(dup, Err(Error::Conflict(_))));
    }

    #[test]
    fn login_round_trip_preserves_identity() {
        let manager = manager();
        let registered = register(&manager, "alice");

        let session = manager.login("alice", "hunter2").unwrap();
        assert_eq!(session.identity.id, registered.id);

        let rotated = manager.refresh(&session.refresh_token).unwrap();
        let authorized = manager.authorize(&rotated.access_token).unwrap();
        assert_eq!(authorized.id, registered.id);
    }

    #[test]
    fn login_failures_distinguish_missing_and_wrong() {
        let manager = manager();
        register(&manager, "alice");

        assert!(matches!(
            manager.login("nobody", "hunter2"),
            Err(Error::NotFound)
        ));
        assert!(matches!(
            manager.login("alice", "wrong"),
            Err(Error::BadCredential)
        ));
        // Email works as the login too.
        assert!(manager.login("alice@example.com", "hunter2").is_ok());
    }

    #[test]
    fn rotated_away_refresh_token_is_rejected() {
        let manager = manager();
        register(&manager, "alice");

        let session = manager.login("alice", "hunter2").unwrap();
        let r1 = session.refresh_token;

        let rotated = manager.refresh(&r1).unwrap();
        let r2 = rotated.refresh_token;

        // R1 was superseded by the rotation; only R2 is live.
        assert!(matches!(manager.refresh(&r1), Err(Error::Unauthorized)));
        assert!(manager.refresh(&r2).is_ok());
    }

    #[test]
    fn refresh_after_logout_is_unauthorized() {
        let manager = manager();
        let identity = register(&manager, "alice");

        let session = manager.login("alice", "hunter2").unwrap();
        manager.logout(&identity.id).unwrap();
        // Logout twice is fine.
        manager.logout(&identity.id).unwrap();

        assert!(matches!(
            manager.refresh(&session.refresh_token),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn second_login_invalidates_first_session() {
        let manager = manager();
        register(&manager, "alice");

        let first = manager.login("alice", "hunter2").unwrap();
        let second = manager.login("alice", "hunter2").unwrap();

        assert!(matches!(
            manager.refresh(&first.refresh_token),
            Err(Error::Unauthorized)
        ));
        assert!(manager.refresh(&second.refresh_token).is_ok());
    }

    #[test]
    fn authorize_rejects_refresh_tokens() {
        let manager = manager();
        register(&manager, "alice");
        let session = manager.login("alice", "hunter2").unwrap();

        assert!(matches!(
            manager.authorize(&session.refresh_token),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn change_password_requires_current_password() {
        let manager = manager();
        let identity = register(&manager, "alice");

        assert!(matches!(
            manager.change_password(&identity.id, "wrong", "next"),
            Err(Error::BadCredential)
        ));

        manager
            .change_password(&identity.id, "hunter2", "correct-horse")
            .unwrap();
        assert!(manager.login("alice", "correct-horse").is_ok());
        assert!(matches!(
            manager.login("alice", "hunter2"),
            Err(Error::BadCredential)
        ));
    }
}
