use std::net::SocketAddr;
use std::path::PathBuf;

use crate::store::HistoryPolicy;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub history: HistoryPolicy,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("videotube.db")
    }
}

/// Token signing configuration, injected explicitly rather than read from
/// ambient process state past startup.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl AuthConfig {
    /// 15-minute access tokens, 10-day refresh tokens.
    #[must_use]
    pub fn with_secrets(access_secret: String, refresh_secret: String) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_secs: 15 * 60,
            refresh_ttl_secs: 10 * 24 * 60 * 60,
        }
    }
}
