//! Share ticket queries

use crate::error::Result;
use crate::timestamp_from_millis;
use sqlx::SqlitePool;
use tape_core::types::{AudioId, ShareTicket, TicketId, UserId};

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: String,
    audio_id: String,
    from_user_id: String,
    created_at: i64,
    expire_at: i64,
}

impl TryFrom<TicketRow> for ShareTicket {
    type Error = crate::StorageError;

    fn try_from(row: TicketRow) -> Result<Self> {
        Ok(ShareTicket {
            id: TicketId::new(row.id),
            audio_id: AudioId::new(row.audio_id),
            from_user_id: UserId::new(row.from_user_id),
            created_at: timestamp_from_millis("created_at", row.created_at)?,
            expire_at: timestamp_from_millis("expire_at", row.expire_at)?,
        })
    }
}

pub async fn insert(pool: &SqlitePool, ticket: &ShareTicket) -> Result<()> {
    sqlx::query(
        "INSERT INTO share_tickets (id, audio_id, from_user_id, created_at, expire_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(ticket.id.as_str())
    .bind(ticket.audio_id.as_str())
    .bind(ticket.from_user_id.as_str())
    .bind(ticket.created_at.timestamp_millis())
    .bind(ticket.expire_at.timestamp_millis())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_by_id(pool: &SqlitePool, id: &TicketId) -> Result<Option<ShareTicket>> {
    let row = sqlx::query_as::<_, TicketRow>(
        "SELECT id, audio_id, from_user_id, created_at, expire_at FROM share_tickets WHERE id = ?",
    )
    .bind(id.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(ShareTicket::try_from).transpose()
}
