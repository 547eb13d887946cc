/// Background jobs
pub mod reaper;

pub use reaper::BlobReaper;
