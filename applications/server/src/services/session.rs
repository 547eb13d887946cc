/// Login, registration and single-active-session checks
use crate::error::{Result, ServerError};
use crate::services::{PasswordHasher, TokenService};
use serde::Serialize;
use std::sync::Arc;
use tape_core::{CoreError, CredentialStore, User, UserId};

/// Identity returned by every successful authentication step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub token: String,
}

impl Session {
    fn new(user: &User, token: String) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            token,
        }
    }
}

/// Combines token verification with the stored current token
///
/// A token passes only when it is cryptographically valid *and* equal to the
/// user's `current_token`. Logging in again overwrites that field, so older
/// tokens stop working before they expire.
#[derive(Clone)]
pub struct SessionGuard {
    users: Arc<dyn CredentialStore>,
    tokens: TokenService,
    hasher: PasswordHasher,
}

impl SessionGuard {
    pub fn new(users: Arc<dyn CredentialStore>, tokens: TokenService, hasher: PasswordHasher) -> Self {
        Self {
            users,
            tokens,
            hasher,
        }
    }

    /// Emails are matched after trimming, as stored by [`Self::register`]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let user = self
            .users
            .find_user_by_email(email.trim())
            .await?
            .ok_or(ServerError::UserNotFound)?;

        if !self.hasher.verify(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(ServerError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.email, &user.id)?;
        self.users.set_current_token(&user.id, Some(&token)).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(Session::new(&user, token))
    }

    /// Check that `token` is `user_id`'s current, unexpired session
    pub async fn verify_session(&self, user_id: &UserId, token: &str) -> Result<Session> {
        let user = self
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServerError::UserNotFound)?;

        if user.current_token.as_deref() != Some(token) {
            return Err(ServerError::SessionMismatch);
        }

        self.tokens.verify(token)?;

        Ok(Session::new(&user, token.to_string()))
    }

    /// Create an account and log it in
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<Session> {
        let email = email.trim();
        validate_email(email)?;

        if name.trim().is_empty() {
            return Err(ServerError::Validation("Name is required".to_string()));
        }
        if password.is_empty() {
            return Err(ServerError::Validation("Password is required".to_string()));
        }

        if self.users.find_user_by_email(email).await?.is_some() {
            return Err(ServerError::EmailTaken);
        }

        let id = UserId::generate();
        let token = self.tokens.issue(email, &id)?;
        let user = User {
            id,
            email: email.to_string(),
            name: name.trim().to_string(),
            password_hash: self.hasher.hash(password)?,
            current_token: Some(token.clone()),
        };

        match self.users.insert_user(user.clone()).await {
            Ok(()) => {}
            Err(CoreError::Duplicate(_)) => return Err(ServerError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.id, "User registered");
        Ok(Session::new(&user, token))
    }

    /// Resolve a bearer token to its session
    ///
    /// The signature and expiry are checked first so the subject can be
    /// trusted for the store lookup.
    pub async fn authenticate(&self, token: &str) -> Result<Session> {
        let claims = self.tokens.verify(token)?;
        self.verify_session(&claims.user_id(), token).await
    }

    pub async fn logout(&self, user_id: &UserId) -> Result<()> {
        self.users.set_current_token(user_id, None).await?;
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<()> {
    let invalid = || ServerError::Validation(format!("Invalid email address: {:?}", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let well_formed = !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, rest)| !host.is_empty() && !rest.is_empty() && !rest.ends_with('.'));

    if well_formed {
        Ok(())
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tape_core::ManualClock;
    use tape_storage::MemoryStore;

    struct Fixture {
        guard: SessionGuard,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tokens = TokenService::new("secret", Duration::minutes(60), clock.clone());
        let guard = SessionGuard::new(store.clone(), tokens, PasswordHasher::new(4));
        Fixture { guard, store, clock }
    }

    #[tokio::test]
    async fn login_after_register_is_accepted() {
        let f = fixture();
        let registered = f.guard.register("a@example.com", "Alice", "pw").await.unwrap();
        assert!(f.guard.verify_session(&registered.user_id, &registered.token).await.is_ok());

        let session = f.guard.login("a@example.com", "pw").await.unwrap();
        assert_eq!(session.user_id, registered.user_id);
        assert_eq!(session.name, "Alice");

        let verified = f.guard.verify_session(&session.user_id, &session.token).await.unwrap();
        assert_eq!(verified, session);
    }

    #[tokio::test]
    async fn login_matches_email_as_registered() {
        let f = fixture();
        let registered = f.guard.register(" a@example.com ", "Alice", "pw").await.unwrap();
        assert_eq!(registered.email, "a@example.com");

        let session = f.guard.login(" a@example.com ", "pw").await.unwrap();
        assert_eq!(session.user_id, registered.user_id);

        let session = f.guard.login("a@example.com", "pw").await.unwrap();
        assert_eq!(session.user_id, registered.user_id);
    }

    #[tokio::test]
    async fn second_login_revokes_first_token() {
        let f = fixture();
        f.guard.register("a@example.com", "Alice", "pw").await.unwrap();

        let first = f.guard.login("a@example.com", "pw").await.unwrap();
        let second = f.guard.login("a@example.com", "pw").await.unwrap();
        assert_ne!(first.token, second.token);

        let result = f.guard.verify_session(&first.user_id, &first.token).await;
        assert!(matches!(result, Err(ServerError::SessionMismatch)));
        assert!(f.guard.authenticate(&second.token).await.is_ok());
        assert!(matches!(
            f.guard.authenticate(&first.token).await,
            Err(ServerError::SessionMismatch)
        ));
    }

    #[tokio::test]
    async fn current_token_expires() {
        let f = fixture();
        let session = f.guard.register("a@example.com", "Alice", "pw").await.unwrap();

        f.clock.advance(Duration::minutes(60));
        let result = f.guard.verify_session(&session.user_id, &session.token).await;
        assert!(matches!(result, Err(ServerError::ExpiredToken)));
    }

    #[tokio::test]
    async fn login_failures() {
        let f = fixture();
        f.guard.register("a@example.com", "Alice", "pw").await.unwrap();

        assert!(matches!(
            f.guard.login("nobody@example.com", "pw").await,
            Err(ServerError::UserNotFound)
        ));
        assert!(matches!(
            f.guard.login("a@example.com", "wrong").await,
            Err(ServerError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn verify_unknown_user() {
        let f = fixture();
        let result = f.guard.verify_session(&UserId::new("ghost"), "token").await;
        assert!(matches!(result, Err(ServerError::UserNotFound)));
    }

    #[tokio::test]
    async fn register_rejects_taken_and_malformed_email() {
        let f = fixture();
        f.guard.register("a@example.com", "Alice", "pw").await.unwrap();

        assert!(matches!(
            f.guard.register("a@example.com", "Other", "pw").await,
            Err(ServerError::EmailTaken)
        ));
        for bad in ["", "plain", "@example.com", "a@", "a@b", "a b@example.com"] {
            assert!(
                matches!(f.guard.register(bad, "X", "pw").await, Err(ServerError::Validation(_))),
                "{bad:?} accepted"
            );
        }
        assert_eq!(f.store.user_count().await, 1);
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let f = fixture();
        let session = f.guard.register("a@example.com", "Alice", "pw").await.unwrap();

        f.guard.logout(&session.user_id).await.unwrap();
        assert!(matches!(
            f.guard.authenticate(&session.token).await,
            Err(ServerError::SessionMismatch)
        ));
    }
}
