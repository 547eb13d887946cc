/// Server configuration
use crate::error::{Result, ServerError};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One year
pub const MAX_TOKEN_TTL_MINUTES: u64 = 60 * 24 * 365;
/// One year
pub const MAX_TICKET_TTL_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_auth")]
    pub auth: AuthSettings,

    #[serde(default = "default_share")]
    pub share: ShareSettings,

    #[serde(default = "default_blob")]
    pub blob: BlobSettings,

    #[serde(default = "default_stream")]
    pub stream: StreamSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted upload request body
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSettings {
    pub jwt_secret: String,

    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: u64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShareSettings {
    #[serde(default = "default_ticket_ttl_hours")]
    pub ticket_ttl_hours: u64,
}

/// Remote object service holding the audio bytes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlobSettings {
    /// Base URL for reads (usually a CDN in front of the bucket)
    #[serde(default)]
    pub read_url: String,

    /// Base URL for uploads and deletes
    #[serde(default)]
    pub write_url: String,

    /// Sent as the `AccessKey` header
    #[serde(default)]
    pub access_key: String,

    /// Applies to put/delete; streaming reads only bound the connect phase
    #[serde(default = "default_blob_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamSettings {
    /// Largest chunk forwarded to the client in one piece
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl ServerConfig {
    /// Load configuration from file and environment
    ///
    /// `path` defaults to `config.toml` in the working directory; a missing
    /// file is not an error. Environment variables prefixed with `TAPE_`
    /// override file values, with `__` between section and key
    /// (`TAPE_AUTH__JWT_SECRET`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = path.map_or_else(|| PathBuf::from("config.toml"), Path::to_path_buf);
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        } else if path.is_some() {
            return Err(ServerError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("TAPE")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Validate settings every mode needs
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ServerError::Config(
                "JWT secret is required (set TAPE_AUTH__JWT_SECRET)".to_string(),
            ));
        }

        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&self.auth.token_ttl_minutes) {
            return Err(ServerError::Config(format!(
                "auth.token_ttl_minutes must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_MINUTES, self.auth.token_ttl_minutes
            )));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ServerError::Config(format!(
                "auth.bcrypt_cost must be between 4 and 31, got {}",
                self.auth.bcrypt_cost
            )));
        }

        if !(1..=MAX_TICKET_TTL_HOURS).contains(&self.share.ticket_ttl_hours) {
            return Err(ServerError::Config(format!(
                "share.ticket_ttl_hours must be between 1 and {}, got {}",
                MAX_TICKET_TTL_HOURS, self.share.ticket_ttl_hours
            )));
        }

        if self.stream.chunk_size == 0 {
            return Err(ServerError::Config(
                "stream.chunk_size must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Session token lifetime, capped at [`MAX_TOKEN_TTL_MINUTES`]
    pub fn token_ttl(&self) -> Duration {
        Duration::minutes(self.auth.token_ttl_minutes.min(MAX_TOKEN_TTL_MINUTES) as i64)
    }

    /// Share ticket lifetime, capped at [`MAX_TICKET_TTL_HOURS`]
    pub fn ticket_ttl(&self) -> Duration {
        Duration::hours(self.share.ticket_ttl_hours.min(MAX_TICKET_TTL_HOURS) as i64)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl BlobSettings {
    /// Required only when talking to a remote blob store
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("blob.read_url", &self.read_url), ("blob.write_url", &self.write_url)] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(ServerError::Config(format!(
                    "{} must be an http(s) URL, got {:?}",
                    name, value
                )));
            }
        }

        if self.access_key.is_empty() {
            return Err(ServerError::Config(
                "Blob access key is required (set TAPE_BLOB__ACCESS_KEY)".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: default_port(),
        max_upload_mb: default_max_upload_mb(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_mb() -> usize {
    50
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/tape.db".to_string()
}

fn default_auth() -> AuthSettings {
    AuthSettings {
        jwt_secret: String::new(),
        token_ttl_minutes: default_token_ttl_minutes(),
        bcrypt_cost: default_bcrypt_cost(),
    }
}

fn default_token_ttl_minutes() -> u64 {
    60
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_share() -> ShareSettings {
    ShareSettings {
        ticket_ttl_hours: default_ticket_ttl_hours(),
    }
}

fn default_ticket_ttl_hours() -> u64 {
    6
}

fn default_blob() -> BlobSettings {
    BlobSettings {
        read_url: String::new(),
        write_url: String::new(),
        access_key: String::new(),
        timeout_secs: default_blob_timeout_secs(),
    }
}

fn default_blob_timeout_secs() -> u64 {
    30
}

fn default_stream() -> StreamSettings {
    StreamSettings {
        chunk_size: default_chunk_size(),
    }
}

fn default_chunk_size() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            auth: default_auth(),
            share: default_share(),
            blob: default_blob(),
            stream: default_stream(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_session_and_ticket_lifetimes() {
        let config = ServerConfig::default();
        assert_eq!(config.auth.token_ttl_minutes, 60);
        assert_eq!(config.share.ticket_ttl_hours, 6);
        assert_eq!(config.stream.chunk_size, 65536);
        assert_eq!(config.max_upload_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn empty_secret_is_rejected() {
        let config = ServerConfig::default();
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));

        let mut config = ServerConfig::default();
        config.auth.jwt_secret = "s3cret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = "s3cret".to_string();
        config.stream.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_lifetimes_are_rejected() {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = "s3cret".to_string();
        config.auth.token_ttl_minutes = MAX_TOKEN_TTL_MINUTES;
        config.share.ticket_ttl_hours = MAX_TICKET_TTL_HOURS;
        assert!(config.validate().is_ok());

        config.auth.token_ttl_minutes = u64::MAX;
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));

        config.auth.token_ttl_minutes = 60;
        config.share.ticket_ttl_hours = MAX_TICKET_TTL_HOURS + 1;
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn lifetimes_never_overflow_or_go_negative() {
        let mut config = ServerConfig::default();
        assert_eq!(config.token_ttl(), Duration::minutes(60));
        assert_eq!(config.ticket_ttl(), Duration::hours(6));

        config.auth.token_ttl_minutes = u64::MAX;
        config.share.ticket_ttl_hours = u64::MAX;
        assert_eq!(config.token_ttl(), Duration::minutes(MAX_TOKEN_TTL_MINUTES as i64));
        assert_eq!(config.ticket_ttl(), Duration::hours(MAX_TICKET_TTL_HOURS as i64));
    }

    #[test]
    fn blob_settings_require_urls_and_key() {
        let mut blob = default_blob();
        assert!(blob.validate().is_err());

        blob.read_url = "https://cdn.example.com/clips".to_string();
        blob.write_url = "https://storage.example.com/zone".to_string();
        assert!(blob.validate().is_err());

        blob.access_key = "key".to_string();
        assert!(blob.validate().is_ok());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = ServerConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
