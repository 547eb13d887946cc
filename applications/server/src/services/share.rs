/// Share ticket creation and redemption
use crate::error::{Result, ServerError};
use crate::services::blob_refs::BlobRefLocks;
use chrono::Duration;
use std::sync::Arc;
use tape_core::{AudioCatalog, AudioId, AudioRecord, Clock, ShareTicket, TicketId, TicketStore, UserId};

#[derive(Clone)]
pub struct ShareService {
    tickets: Arc<dyn TicketStore>,
    catalog: Arc<dyn AudioCatalog>,
    ref_locks: BlobRefLocks,
    clock: Arc<dyn Clock>,
    ticket_ttl: Duration,
}

impl ShareService {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        catalog: Arc<dyn AudioCatalog>,
        ref_locks: BlobRefLocks,
        clock: Arc<dyn Clock>,
        ticket_ttl: Duration,
    ) -> Self {
        Self {
            tickets,
            catalog,
            ref_locks,
            clock,
            ticket_ttl,
        }
    }

    /// Issue a ticket for `audio_id`
    ///
    /// The audio is not looked up here; a ticket for a clip the creator does
    /// not own fails later, at redemption.
    pub async fn create_ticket(&self, audio_id: AudioId, from_user_id: UserId) -> Result<ShareTicket> {
        let ticket = ShareTicket::new(audio_id, from_user_id, self.clock.now(), self.ticket_ttl);
        self.tickets.insert_ticket(ticket.clone()).await?;

        tracing::info!(
            ticket_id = %ticket.id,
            audio_id = %ticket.audio_id,
            from_user_id = %ticket.from_user_id,
            "Share ticket created"
        );
        Ok(ticket)
    }

    /// Copy the ticket's clip into `to_user_id`'s collection
    ///
    /// The ticket stays valid afterwards; each redemption creates a new record
    /// pointing at the same blob.
    pub async fn redeem_ticket(&self, ticket_id: &TicketId, to_user_id: &UserId) -> Result<AudioRecord> {
        let ticket = self
            .tickets
            .get_ticket(ticket_id)
            .await?
            .ok_or(ServerError::TicketNotFound)?;

        let now = self.clock.now();
        if ticket.is_expired_at(now) {
            return Err(ServerError::TicketExpired);
        }

        if &ticket.from_user_id == to_user_id {
            return Err(ServerError::SelfShare);
        }

        let source = self.source(&ticket).await?;

        // Re-read under the blob's lock: a delete that got there first has
        // already decided the blob's fate.
        let _guard = self.ref_locks.lock(&source.stream_ref).await;
        let source = self.source(&ticket).await?;

        let copy = source.shared_copy(to_user_id.clone(), ticket.from_user_id.clone(), now);
        self.catalog.insert(copy.clone()).await?;

        tracing::info!(
            ticket_id = %ticket.id,
            audio_id = %copy.id,
            to_user_id = %to_user_id,
            "Share ticket redeemed"
        );
        Ok(copy)
    }

    async fn source(&self, ticket: &ShareTicket) -> Result<AudioRecord> {
        self.catalog
            .get_by_id(&ticket.audio_id)
            .await?
            .filter(|record| record.owner_id == ticket.from_user_id)
            .ok_or(ServerError::SourceAudioMissing)
    }
}
