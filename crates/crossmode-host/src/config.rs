//! YAML configuration surface.
//!
//! Keys are camelCase on disk. Every section carries the defaults of a
//! working two-slot setup, so a minimal file only needs the two master
//! addresses, peer ids and passwords.

use std::path::Path;

use serde::Deserialize;

use crate::error::HostError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Run detached (parsed for compatibility; the host stays in the
    /// foreground and warns)
    pub daemon: bool,
    /// Logging setup
    pub log: LogConfig,
    /// Transcoder behaviour
    pub system: SystemConfig,
    /// Source master link
    pub src_network: NetworkSection,
    /// Destination master link
    pub dst_network: NetworkSection,
    /// Network tuning
    pub network: NetworkTuning,
}

/// Logging setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogConfig {
    /// Directory for the log file; empty disables file logging
    pub file_path: String,
    /// Log file base name
    pub file_root: String,
    /// File verbosity (1 debug .. 6 fatal, 0 off)
    pub file_level: u32,
    /// Console verbosity (1 debug .. 6 fatal)
    pub display_level: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: String::new(),
            file_root: "crossmode".to_string(),
            file_level: 0,
            display_level: 2,
        }
    }
}

/// Transcoder behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemConfig {
    /// Transmit timeout in seconds
    pub timeout: u32,
    /// Station identity reported to both masters
    pub identity: String,
    /// Also transcode destination traffic back to the source
    pub two_way_transcode: bool,
    /// Per-call logging
    pub verbose: bool,
    /// Frame-level debug logging
    pub debug: bool,
    /// Encoder gain in dB applied before analysis
    pub gain_adjust: f32,
    /// Station metadata
    pub info: SystemInfo,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            timeout: 180,
            identity: String::new(),
            two_way_transcode: false,
            verbose: true,
            debug: false,
            gain_adjust: 0.0,
            info: SystemInfo::default(),
        }
    }
}

/// Station metadata reported in the RPTC block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemInfo {
    /// Latitude in degrees
    pub latitude: f32,
    /// Longitude in degrees
    pub longitude: f32,
    /// Antenna height in metres
    pub height: i32,
    /// Transmit power in watts
    pub power: u32,
    /// Free-form location text
    pub location: String,
}

/// One master link.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkSection {
    /// Master hostname or address
    pub address: String,
    /// Master port
    pub port: u16,
    /// Local port (0 for ephemeral)
    pub local: u16,
    /// Peer id presented at login
    pub id: u32,
    /// Login password
    pub password: String,
    /// Talkgroup hang time in milliseconds
    pub talkgroup_hang: u32,
    /// Accept slot 1 traffic
    pub slot1: bool,
    /// Accept slot 2 traffic
    pub slot2: bool,
    /// Datagram-level debug logging
    pub debug: bool,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 62031,
            local: 0,
            id: 0,
            password: String::new(),
            talkgroup_hang: 360,
            slot1: true,
            slot2: true,
            debug: false,
        }
    }
}

/// Network tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkTuning {
    /// Inter-packet gap treated as lost audio, in milliseconds
    pub jitter: u32,
}

impl Default for NetworkTuning {
    fn default() -> Self {
        Self { jitter: 360 }
    }
}

impl Config {
    /// Load and parse a YAML configuration file. Unreadable or invalid
    /// files are fatal.
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            HostError::Config(format!("cannot read the configuration file {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            HostError::Config(format!(
                "cannot parse the configuration file {}: {e}",
                path.display()
            ))
        })
    }
}
