//! `SQLite` implementation of the collaborator traits

use crate::{audio, create_pool, run_migrations, tickets, users, StorageError};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tape_core::types::{AudioId, AudioRecord, AudioUpdate, ShareTicket, TicketId, User, UserId};
use tape_core::{AudioCatalog, CredentialStore, Result, TicketStore};

/// Persistent store backed by one `SQLite` database
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool; migrations must already have run
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and migrate it
    pub async fn connect(database_url: &str) -> std::result::Result<Self, StorageError> {
        let pool = create_pool(database_url).await?;
        run_migrations(&pool).await?;
        tracing::info!(url = %database_url, "SQLite store ready");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(users::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
        Ok(users::find_by_id(&self.pool, id).await?)
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        Ok(users::insert(&self.pool, &user).await?)
    }

    async fn set_current_token(&self, id: &UserId, token: Option<&str>) -> Result<()> {
        Ok(users::set_current_token(&self.pool, id, token).await?)
    }
}

#[async_trait]
impl AudioCatalog for SqliteStore {
    async fn get_by_id(&self, id: &AudioId) -> Result<Option<AudioRecord>> {
        Ok(audio::get_by_id(&self.pool, id).await?)
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<AudioRecord>> {
        Ok(audio::list_by_owner(&self.pool, owner).await?)
    }

    async fn list_by_stream_ref(&self, stream_ref: &str) -> Result<Vec<AudioRecord>> {
        Ok(audio::list_by_stream_ref(&self.pool, stream_ref).await?)
    }

    async fn insert(&self, record: AudioRecord) -> Result<()> {
        Ok(audio::insert(&self.pool, &record).await?)
    }

    async fn update(&self, id: &AudioId, update: AudioUpdate) -> Result<()> {
        Ok(audio::update(&self.pool, id, &update).await?)
    }

    async fn delete(&self, id: &AudioId) -> Result<()> {
        Ok(audio::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl TicketStore for SqliteStore {
    async fn insert_ticket(&self, ticket: ShareTicket) -> Result<()> {
        Ok(tickets::insert(&self.pool, &ticket).await?)
    }

    async fn get_ticket(&self, id: &TicketId) -> Result<Option<ShareTicket>> {
        Ok(tickets::get_by_id(&self.pool, id).await?)
    }
}
