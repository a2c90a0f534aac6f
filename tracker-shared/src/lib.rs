pub mod error;
pub mod issue;

use error::TrackerError;

pub const DEFAULT_PORT: u16 = 8000;

pub struct AddrInfo {
    pub addr: String,
    pub port: u16,
}

impl AddrInfo {
    pub fn as_url(&self) -> String {
        format!("http://{}:{}", self.addr, self.port)
    }

    pub fn as_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    /// Reads `TRACKER_ADDR` and `TRACKER_PORT`.
    pub fn from_env() -> Result<Self, TrackerError> {
        let port: u16 = match std::env::var("TRACKER_PORT") {
            Ok(val) => val.parse().map_err(|err| {
                TrackerError::Configuration(format!("Invalid TRACKER_PORT {:?}: {}", val, err))
            })?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            addr: std::env::var("TRACKER_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
        })
    }
}
