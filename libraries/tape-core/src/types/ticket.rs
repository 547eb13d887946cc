/// Share ticket domain type
use super::{AudioId, TicketId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Time-bounded grant to copy one clip into another user's collection
///
/// Redeeming a ticket does not consume it; it stays usable until `expire_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareTicket {
    pub id: TicketId,
    pub audio_id: AudioId,
    pub from_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
}

impl ShareTicket {
    pub fn new(audio_id: AudioId, from_user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: TicketId::generate(),
            audio_id,
            from_user_id,
            created_at: now,
            expire_at: now + ttl,
        }
    }

    /// A ticket is still valid at exactly `expire_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expire_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_boundary() {
        let now = Utc::now();
        let ticket = ShareTicket::new(
            AudioId::new("a1"),
            UserId::new("alice"),
            now,
            Duration::hours(6),
        );

        assert_eq!(ticket.expire_at - ticket.created_at, Duration::hours(6));
        assert!(!ticket.is_expired_at(ticket.expire_at - Duration::seconds(1)));
        assert!(!ticket.is_expired_at(ticket.expire_at));
        assert!(ticket.is_expired_at(ticket.expire_at + Duration::seconds(1)));
    }
}
