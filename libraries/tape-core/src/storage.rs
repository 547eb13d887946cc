//! Collaborator interfaces consumed by the server core

use crate::error::Result;
use crate::types::{AudioId, AudioRecord, AudioUpdate, ShareTicket, TicketId, User, UserId};
use async_trait::async_trait;

/// Persists users and their single current session token
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>>;

    /// Fails with `CoreError::Duplicate` when the id or email is taken
    async fn insert_user(&self, user: User) -> Result<()>;

    /// Overwrite the user's current token in one atomic write.
    ///
    /// `None` clears the session.
    async fn set_current_token(&self, id: &UserId, token: Option<&str>) -> Result<()>;
}

/// Audio metadata storage
#[async_trait]
pub trait AudioCatalog: Send + Sync {
    async fn get_by_id(&self, id: &AudioId) -> Result<Option<AudioRecord>>;

    /// Records owned by `owner`, newest first
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<AudioRecord>>;

    /// All records, of any owner, pointing at the same blob
    async fn list_by_stream_ref(&self, stream_ref: &str) -> Result<Vec<AudioRecord>>;

    async fn insert(&self, record: AudioRecord) -> Result<()>;

    /// No-op when the record does not exist
    async fn update(&self, id: &AudioId, update: AudioUpdate) -> Result<()>;

    /// No-op when the record does not exist
    async fn delete(&self, id: &AudioId) -> Result<()>;
}

/// Share ticket storage
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert_ticket(&self, ticket: ShareTicket) -> Result<()>;

    async fn get_ticket(&self, id: &TicketId) -> Result<Option<ShareTicket>>;
}
