//! Server configuration.

use std::path::Path;

use broadside_room::RoomConfig;
use broadside_transport::DEFAULT_MAX_LINE_LENGTH;
use serde::{Deserialize, Serialize};

use crate::BroadsideError;

/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 8889;

/// Settings for a [`BroadsideServer`](crate::BroadsideServer).
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```toml
/// bind = "127.0.0.1:9000"
/// default_player_name = "Sailor"
/// log = "broadside=debug"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,

    /// Longest accepted line, in bytes, excluding the newline. A client
    /// exceeding it is disconnected.
    pub max_line_length: usize,

    /// Capacity of each room's command channel.
    pub room_channel_size: usize,

    /// Name given to players whose JOIN has no usable name.
    pub default_player_name: String,

    /// Chat text is truncated to this many characters.
    pub max_chat_length: usize,

    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let room = RoomConfig::default();
        Self {
            bind: format!("0.0.0.0:{DEFAULT_PORT}"),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            room_channel_size: room.channel_size,
            default_player_name: "Player".to_string(),
            max_chat_length: room.max_chat_length,
            log: None,
        }
    }
}

impl ServerConfig {
    /// Parses a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, BroadsideError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BroadsideError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Replaces the port of [`bind`](Self::bind), keeping its host.
    pub fn with_port(mut self, port: u16) -> Self {
        let host = match self.bind.rsplit_once(':') {
            Some((host, _)) => host,
            None => self.bind.as_str(),
        };
        self.bind = format!("{host}:{port}");
        self
    }

    /// The settings each game room is spawned with.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            channel_size: self.room_channel_size,
            max_chat_length: self.max_chat_length,
        }
    }
}
