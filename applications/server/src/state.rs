/// Shared application state
use crate::config::ServerConfig;
use crate::jobs::BlobReaper;
use crate::services::{
    AudioLibrary, BlobRefLocks, BlobStore, PasswordHasher, SessionGuard, ShareService, StreamRelay, TokenService,
};
use std::sync::Arc;
use tape_core::{AudioCatalog, Clock, CredentialStore, TicketStore};
use tokio::task::JoinHandle;

/// The three collaborator stores the services need
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn CredentialStore>,
    pub catalog: Arc<dyn AudioCatalog>,
    pub tickets: Arc<dyn TicketStore>,
}

impl Stores {
    /// Use one backend for all three roles
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: CredentialStore + AudioCatalog + TicketStore + 'static,
    {
        Self {
            users: store.clone(),
            catalog: store.clone(),
            tickets: store,
        }
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionGuard>,
    pub shares: Arc<ShareService>,
    pub library: Arc<AudioLibrary>,
    pub relay: Arc<StreamRelay>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire services together and start the blob reaper
    ///
    /// The returned handle finishes once every clone of the state is dropped.
    pub fn build(
        config: &ServerConfig,
        stores: Stores,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> (Self, JoinHandle<()>) {
        let tokens = TokenService::new(
            &config.auth.jwt_secret,
            config.token_ttl(),
            Arc::clone(&clock),
        );
        let sessions = SessionGuard::new(
            stores.users,
            tokens,
            PasswordHasher::new(config.auth.bcrypt_cost),
        );

        let ref_locks = BlobRefLocks::new();
        let shares = ShareService::new(
            stores.tickets,
            Arc::clone(&stores.catalog),
            ref_locks.clone(),
            Arc::clone(&clock),
            config.ticket_ttl(),
        );

        let (reaper, reaper_task) = BlobReaper::spawn(Arc::clone(&blobs));
        let library = AudioLibrary::new(
            Arc::clone(&stores.catalog),
            Arc::clone(&blobs),
            reaper,
            ref_locks,
            clock,
        );
        let relay = StreamRelay::new(stores.catalog, blobs, config.stream.chunk_size);

        let state = Self {
            sessions: Arc::new(sessions),
            shares: Arc::new(shares),
            library: Arc::new(library),
            relay: Arc::new(relay),
            max_upload_bytes: config.max_upload_bytes(),
        };

        (state, reaper_task)
    }
}
