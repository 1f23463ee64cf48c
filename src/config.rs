use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served at / for the frontend page, if any.
    pub asset_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// File backing the cookie jar.
    #[serde(default = "default_cookie_file")]
    pub cookie_file: PathBuf,
    /// Hard cap on persisted markers; adds beyond it are refused.
    #[serde(default = "default_max_markers")]
    pub max_markers: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

/// Where "use my location" reads from. The real browser capability sits
/// outside this system; the server consumes whatever source is configured.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GeolocationConfig {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Simulate a user denying the permission prompt.
    #[serde(default)]
    pub denied: bool,
}

fn default_port() -> u16 {
    3000
}

fn default_cookie_file() -> PathBuf {
    PathBuf::from("cookies.txt")
}

fn default_max_markers() -> usize {
    500
}

fn default_zoom() -> u8 {
    17
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    768
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            asset_dir: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            cookie_file: default_cookie_file(),
            max_markers: default_max_markers(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            zoom: default_zoom(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
