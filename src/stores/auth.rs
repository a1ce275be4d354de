//! Authenticated session, persisted across restarts.
//!
//! The whole session lives under the `auth` key; the bearer token is also
//! mirrored under `access_token` so request code can read it on its own.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Store;
use crate::models::AuthUser;
use crate::storage::{self, keys, KeyValueStorage, StorageError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    #[serde(default)]
    pub user: Option<AuthUser>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl AuthSession {
    /// Logged in means both a user and a token are present.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token().is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

pub struct AuthStore {
    session: Store<AuthSession>,
    storage: Arc<dyn KeyValueStorage>,
}

impl AuthStore {
    /// Restore the persisted session, if any.
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        let session = load_session(storage.as_ref());
        if session.is_authenticated() {
            tracing::debug!("restored persisted session");
        }
        Self {
            session: Store::new(session),
            storage,
        }
    }

    /// Reload from storage, picking up changes made by another process.
    pub fn restore(&self) {
        self.session.set(load_session(self.storage.as_ref()));
    }

    pub fn session(&self) -> AuthSession {
        self.session.get()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.session.with(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.session.with(|s| s.token().map(str::to_string))
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.with(AuthSession::is_authenticated)
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<AuthSession> {
        self.session.subscribe()
    }

    pub fn login(&self, user: AuthUser, access_token: String) -> Result<(), StorageError> {
        let session = AuthSession {
            user: Some(user),
            access_token: Some(access_token),
        };
        self.persist(&session)?;
        self.session.set(session);
        Ok(())
    }

    /// Replace the user profile, keeping the token (e.g. after `/auth/me`).
    pub fn set_user(&self, user: AuthUser) -> Result<(), StorageError> {
        let mut session = self.session.get();
        session.user = Some(user);
        self.persist(&session)?;
        self.session.set(session);
        Ok(())
    }

    pub fn logout(&self) -> Result<(), StorageError> {
        self.session.set(AuthSession::default());
        self.storage.remove_item(keys::AUTH)?;
        self.storage.remove_item(keys::ACCESS_TOKEN)
    }

    fn persist(&self, session: &AuthSession) -> Result<(), StorageError> {
        storage::save_json(self.storage.as_ref(), keys::AUTH, session)?;
        match session.token() {
            Some(token) => self.storage.set_item(keys::ACCESS_TOKEN, token),
            None => self.storage.remove_item(keys::ACCESS_TOKEN),
        }
    }
}

fn load_session(storage: &dyn KeyValueStorage) -> AuthSession {
    let mut session = match storage::load_json::<AuthSession>(storage, keys::AUTH) {
        Ok(Some(session)) => session,
        Ok(None) => AuthSession::default(),
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable auth session");
            AuthSession::default()
        }
    };

    if session.token().is_none() {
        match storage.get_item(keys::ACCESS_TOKEN) {
            Ok(Some(token)) if !token.trim().is_empty() => session.access_token = Some(token),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "failed to read stored access token"),
        }
    }
    session
}
