//! Persistent configuration: device hosts/ports and the HTTP bind address.
//! Stored as JSON in `<config_dir>/multiviewer/config.json`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host/port of the HDMI matrix's line-protocol connection.
    pub matrix_host: String,
    pub matrix_port: u16,

    /// A *separate* physical iTach unit used purely for IR volume/mute.
    pub ir_bridge_host: String,
    pub ir_bridge_port: u16,

    /// Set-top box hosts, one per TV, in TV1..TV4 order. All four listen
    /// on the same port.
    pub stb_hosts: [String; 4],
    pub stb_port: u16,

    /// HTTP ingress bind address.
    pub http_host: String,
    pub http_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matrix_host: "matrix.local".to_string(),
            matrix_port: 4999,
            ir_bridge_host: "irbridge.local".to_string(),
            ir_bridge_port: 4998,
            stb_hosts: [
                "tv1.local".to_string(),
                "tv2.local".to_string(),
                "tv3.local".to_string(),
                "tv4.local".to_string(),
            ],
            stb_port: 5001,
            http_host: "0.0.0.0".to_string(),
            http_port: 8787,
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|d| d.join("config.json"))
    }

    /// Where the FSM's persisted state lives, alongside the config file.
    pub fn state_path() -> Option<PathBuf> {
        config_dir().map(|d| d.join("state.json"))
    }

    /// Load config from disk, or return defaults if missing or invalid.
    pub fn load() -> Self {
        let path = match Self::config_path() {
            Some(p) => p,
            None => return Self::default(),
        };
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("invalid config at {}: {e}, using defaults", path.display());
                Self::default()
            }),
            Err(e) => {
                log::warn!("cannot read config at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        let path = match Self::config_path() {
            Some(p) => p,
            None => return,
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::warn!("cannot save config to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("cannot serialize config: {e}"),
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").ok()?;
        Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("multiviewer"),
        )
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").ok()?;
        Some(PathBuf::from(appdata).join("multiviewer"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let home = std::env::var("HOME").ok()?;
        Some(PathBuf::from(home).join(".config").join("multiviewer"))
    }
}
