//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::physics::MovementStats;
use crate::game::r#match::GameMode;

/// How this process takes part in the peer link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// Listens for the other peer and relays shared environment state
    Host,
    /// Connects to a host
    Join,
    /// No networking at all
    Solo,
}

impl FromStr for PeerRole {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "host" => Ok(Self::Host),
            "join" | "client" => Ok(Self::Join),
            "solo" => Ok(Self::Solo),
            _ => Err(ConfigError::Invalid("ROLE")),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Host binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Role in the peer link
    pub role: PeerRole,
    /// Host WebSocket URL, required when joining
    pub peer_url: Option<String>,
    /// Display name shown to the other peer
    pub player_name: String,

    /// Frame loop rate in Hz
    pub frame_rate: u32,
    /// Simulation parameters
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let role: PeerRole = env::var("ROLE")
            .unwrap_or_else(|_| "host".to_string())
            .parse()?;

        let peer_url = env::var("PEER_URL").ok();
        if role == PeerRole::Join && peer_url.is_none() {
            return Err(ConfigError::Missing("PEER_URL"));
        }

        let player_name = env::var("PLAYER_NAME").unwrap_or_else(|_| "Player".to_string());

        let mode: GameMode = env::var("GAME_MODE")
            .unwrap_or_else(|_| "ffa".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("GAME_MODE"))?;

        let environment_actors = match env::var("ENVIRONMENT_ACTORS") {
            Ok(v) => parse_bool(&v).ok_or(ConfigError::Invalid("ENVIRONMENT_ACTORS"))?,
            Err(_) => role == PeerRole::Solo && mode == GameMode::FreeForAll,
        };

        let seed = match env::var("RNG_SEED") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid("RNG_SEED"))?,
            Err(_) => rand::random(),
        };

        let session = SessionConfig {
            player_name: player_name.clone(),
            mode,
            relay: role != PeerRole::Join,
            environment_actors,
            seed,
            time_limit_secs: parse_or("TIME_LIMIT_SECS", 600.0)?,
            score_limit: parse_or("SCORE_LIMIT", 50)?,
            snapshot_interval_ms: parse_or("SNAPSHOT_INTERVAL_MS", 16)?,
            respawn_secs: parse_or("RESPAWN_SECS", 5.0)?,
            ..SessionConfig::default()
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            role,
            peer_url,
            player_name,
            frame_rate: parse_or("FRAME_RATE", 60)?,
            session,
        })
    }
}

/// Simulation parameters handed to a [`crate::game::Session`]
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub player_name: String,
    pub mode: GameMode,
    /// Relay-of-record for shared environment state
    pub relay: bool,
    /// Spawn and simulate environment actors (relay only)
    pub environment_actors: bool,
    /// Seed for spread jitter, spawn choice and actor placement
    pub seed: u64,
    pub time_limit_secs: f32,
    pub score_limit: u32,
    /// Match-end screen duration before the automatic reset
    pub match_cooldown_secs: f32,
    pub snapshot_interval_ms: u64,
    pub world_sync_interval_ms: u64,
    pub respawn_secs: f32,
    pub movement: MovementStats,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            player_name: "Player".to_string(),
            mode: GameMode::FreeForAll,
            relay: true,
            environment_actors: false,
            seed: 0,
            time_limit_secs: 600.0,
            score_limit: 50,
            match_cooldown_secs: 10.0,
            snapshot_interval_ms: 16,
            world_sync_interval_ms: 1000,
            respawn_secs: 5.0,
            movement: MovementStats::default(),
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
