/// Server services
pub mod blob_refs;
pub mod blob_store;
pub mod library;
pub mod password;
pub mod relay;
pub mod session;
pub mod share;
pub mod token;

pub use blob_refs::BlobRefLocks;
pub use blob_store::{BlobStore, HttpBlobStore, MemoryBlobStore};
pub use library::{AudioLibrary, NewUpload};
pub use password::PasswordHasher;
pub use relay::{RelayedStream, StreamRelay, StreamRequest};
pub use session::{Session, SessionGuard};
pub use share::ShareService;
pub use token::{Claims, TokenService};
