// src/config.rs
use axum::http::HeaderValue;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Server Configuration
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub debug: bool,

    // Directory holding positions.json, workers.json, tasks.json and assignments.json
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    // Comma-separated list, empty disables CORS
    #[serde(default)]
    pub cors_allowed_origins: String,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            server_port: default_server_port(),
            environment: default_environment(),
            debug: false,
            data_dir: default_data_dir(),
            cors_allowed_origins: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        // Parse environment variables into Config struct
        envy::from_env::<Config>()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn default_log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Parses the configured origins into header values.
    pub fn allowed_origins(&self) -> Result<Vec<HeaderValue>, String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|e| format!("Invalid CORS origin '{}': {}", origin, e))
            })
            .collect()
    }
}
