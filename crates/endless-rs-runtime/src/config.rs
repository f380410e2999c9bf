//! Runtime configuration, loaded from an optional `endless.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub portals: PortalSection,
    #[serde(default)]
    pub builds: BuildSection,
}

#[derive(Debug, Deserialize)]
pub struct DataSection {
    /// Root of the persistent data directory.
    #[serde(default = "default_data_dir")]
    pub directory: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            directory: default_data_dir(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PortalSection {
    /// Per-player teleport cooldown in seconds.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
    /// How close a player must be for a dropped book to trigger.
    #[serde(default = "default_book_radius")]
    pub book_radius: f64,
    /// Whether default routing may reuse an unlinked portal near the target.
    #[serde(default = "default_allow_reuse")]
    pub allow_reuse: bool,
}

fn default_cooldown_seconds() -> u64 {
    3
}

fn default_book_radius() -> f64 {
    6.0
}

fn default_allow_reuse() -> bool {
    true
}

impl Default for PortalSection {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
            book_radius: default_book_radius(),
            allow_reuse: default_allow_reuse(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BuildSection {
    /// Grace period for draining the pack-builder queue on shutdown.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_shutdown_grace_ms() -> u64 {
    2000
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data: DataSection::default(),
            portals: PortalSection::default(),
            builds: BuildSection::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load the config, falling back to defaults when the file is absent or
    /// unreadable.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                if path.as_ref().exists() {
                    warn!(
                        "Failed to read {}: {e}; using defaults",
                        path.as_ref().display()
                    );
                }
                Self::default()
            }
        }
    }
}
