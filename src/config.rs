use std::path::PathBuf;

use color_eyre::{Result, eyre::Context};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    output_directory: String,
    #[serde(default)]
    spotify: Option<SpotifyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_directory: "~/Music/music-fetcher".to_string(),
            spotify: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("music-fetcher").join("config.toml"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_path().ok_or(color_eyre::eyre::eyre!("Config file not found"))?;

        Self::from_file(&config_path)
    }

    /// Write a default config file, if one doesn't exist yet
    pub fn create_default() -> Result<PathBuf> {
        let path =
            Self::config_path().ok_or(color_eyre::eyre::eyre!("No default config path found"))?;
        if path.exists() {
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents =
            toml::to_string_pretty(&Config::default()).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .context(format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if path.starts_with("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(&path[2..]);
            }
        }
        PathBuf::from(path)
    }

    /// Get expanded output directory path
    pub fn output_directory_path(&self) -> PathBuf {
        self.expand_path(&self.output_directory)
    }

    /// Get Spotify credentials, falling back to environment variables
    pub fn spotify_config(&self) -> SpotifyConfig {
        if let Some(ref spotify_config) = self.spotify {
            spotify_config.clone()
        } else {
            let client_id = std::env::var("SPOTIFY_CLIENT_ID").unwrap_or_else(|_| "".to_string());
            let client_secret =
                std::env::var("SPOTIFY_CLIENT_SECRET").unwrap_or_else(|_| "".to_string());

            SpotifyConfig {
                client_id,
                client_secret,
            }
        }
    }
}
