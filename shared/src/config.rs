use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::FixedOffset;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DISPLAY_UTC_OFFSET: &str = "+00:00";

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,
    /// Root directory for persisted devices, predictions and view state
    pub data_dir: PathBuf,
    /// Offset used to floor day/week buckets and format chart labels
    pub display_offset: FixedOffset,
}

impl DashboardConfig {
    pub fn load(manifest_dir: &Path) -> Result<Self> {
        #[cfg(debug_assertions)]
        {
            let dotenv = manifest_dir.join(".env");
            if dotenv.exists() {
                dotenvy::from_path(&dotenv).context("Can't read .env file")?;
            }
        }
        #[cfg(not(debug_assertions))]
        let _ = manifest_dir;

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Missing variables
    /// take their defaults; present but malformed ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let data_dir = lookup("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_owned());
        let display_offset = lookup("DISPLAY_UTC_OFFSET")
            .unwrap_or_else(|| DEFAULT_DISPLAY_UTC_OFFSET.to_owned());

        Ok(Self {
            bind_addr: bind_addr
                .parse()
                .with_context(|| format!("Invalid BIND_ADDR '{bind_addr}'"))?,
            data_dir: PathBuf::from(data_dir),
            display_offset: display_offset
                .parse()
                .with_context(|| format!("Invalid DISPLAY_UTC_OFFSET '{display_offset}'"))?,
        })
    }
}

/// Load dashboard config using the calling crate's manifest directory.
#[macro_export]
macro_rules! load_config {
    () => {
        $crate::config::DashboardConfig::load(std::path::Path::new(env!("CARGO_MANIFEST_DIR")))
    };
}
