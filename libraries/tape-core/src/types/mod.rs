mod audio;
mod ids;
mod ticket;
mod user;

pub use audio::{AudioRecord, AudioUpdate};
pub use ids::{AudioId, TicketId, UserId};
pub use ticket::ShareTicket;
pub use user::User;
