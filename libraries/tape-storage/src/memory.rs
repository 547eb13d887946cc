//! In-memory implementation of the collaborator traits

use async_trait::async_trait;
use std::collections::HashMap;
use tape_core::types::{AudioId, AudioRecord, AudioUpdate, ShareTicket, TicketId, User, UserId};
use tape_core::{AudioCatalog, CoreError, CredentialStore, Result, TicketStore};
use tokio::sync::RwLock;

/// Store holding everything in process memory
///
/// Each write takes one lock, so `set_current_token` is atomic in the same
/// sense as a single-row `UPDATE`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    /// id -> (insertion sequence, record)
    audio: RwLock<AudioTable>,
    tickets: RwLock<HashMap<TicketId, ShareTicket>>,
}

#[derive(Default)]
struct AudioTable {
    next_seq: u64,
    rows: HashMap<AudioId, (u64, AudioRecord)>,
}

impl AudioTable {
    /// Matching rows, newest first with insertion order breaking ties
    fn collect_newest_first(&self, keep: impl Fn(&AudioRecord) -> bool) -> Vec<AudioRecord> {
        let mut matches: Vec<&(u64, AudioRecord)> =
            self.rows.values().filter(|(_, r)| keep(r)).collect();
        matches.sort_by(|(seq_a, a), (seq_b, b)| {
            b.uploaded_at.cmp(&a.uploaded_at).then(seq_b.cmp(seq_a))
        });
        matches.into_iter().map(|(_, r)| r.clone()).collect()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn audio_count(&self) -> usize {
        self.audio.read().await.rows.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(CoreError::duplicate(format!("user id {}", user.id)));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(CoreError::duplicate(format!("email {}", user.email)));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn set_current_token(&self, id: &UserId, token: Option<&str>) -> Result<()> {
        if let Some(user) = self.users.write().await.get_mut(id) {
            user.current_token = token.map(str::to_string);
        }
        Ok(())
    }
}

#[async_trait]
impl AudioCatalog for MemoryStore {
    async fn get_by_id(&self, id: &AudioId) -> Result<Option<AudioRecord>> {
        Ok(self.audio.read().await.rows.get(id).map(|(_, r)| r.clone()))
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<AudioRecord>> {
        let table = self.audio.read().await;
        Ok(table.collect_newest_first(|r| &r.owner_id == owner))
    }

    async fn list_by_stream_ref(&self, stream_ref: &str) -> Result<Vec<AudioRecord>> {
        let table = self.audio.read().await;
        Ok(table.collect_newest_first(|r| r.stream_ref == stream_ref))
    }

    async fn insert(&self, record: AudioRecord) -> Result<()> {
        let mut table = self.audio.write().await;
        if table.rows.contains_key(&record.id) {
            return Err(CoreError::duplicate(format!("audio id {}", record.id)));
        }
        let seq = table.next_seq;
        table.next_seq += 1;
        table.rows.insert(record.id.clone(), (seq, record));
        Ok(())
    }

    async fn update(&self, id: &AudioId, update: AudioUpdate) -> Result<()> {
        if let Some((_, record)) = self.audio.write().await.rows.get_mut(id) {
            update.apply(record);
        }
        Ok(())
    }

    async fn delete(&self, id: &AudioId) -> Result<()> {
        self.audio.write().await.rows.remove(id);
        Ok(())
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert_ticket(&self, ticket: ShareTicket) -> Result<()> {
        let mut tickets = self.tickets.write().await;
        if tickets.contains_key(&ticket.id) {
            return Err(CoreError::duplicate(format!("ticket id {}", ticket.id)));
        }
        tickets.insert(ticket.id.clone(), ticket);
        Ok(())
    }

    async fn get_ticket(&self, id: &TicketId) -> Result<Option<ShareTicket>> {
        Ok(self.tickets.read().await.get(id).cloned())
    }
}
