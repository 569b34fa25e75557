use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "BRAKEWATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub errors: ErrorConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Where to look for the trained classifier.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Explicit artifact URI, wins over every other strategy.
    pub uri: Option<String>,
    /// File written by the training job holding the run identifier.
    pub run_id_file: PathBuf,
    /// Fallback directory holding an exported artifact.
    pub local_dir: PathBuf,
    /// Artifact path the training job logs the model under.
    pub artifact_path: String,
    pub tracking_uri: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            uri: None,
            run_id_file: PathBuf::from("model/run_id.txt"),
            local_dir: PathBuf::from("model/brake_failure_model"),
            artifact_path: "model".to_string(),
            tracking_uri: "mlruns".to_string(),
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ErrorConfig {
    /// Include diagnostic chains in error bodies. Development only.
    pub expose_details: bool,
}

impl AppConfig {
    /// Loads the YAML config named by `BRAKEWATCH_CONFIG`, or `config.yaml`
    /// when present, then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Applies overrides from `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(uri) = get("MODEL_URI") {
            self.model.uri = Some(uri);
        }
        if let Some(uri) = get("MLFLOW_TRACKING_URI") {
            self.model.tracking_uri = uri;
        }
        if let Some(host) = get("BRAKEWATCH_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("BRAKEWATCH_PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "BRAKEWATCH_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(flag) = get("BRAKEWATCH_EXPOSE_ERROR_DETAILS") {
            self.errors.expose_details = parse_bool(&flag).ok_or(ConfigError::InvalidEnv {
                key: "BRAKEWATCH_EXPOSE_ERROR_DETAILS",
                value: flag.clone(),
            })?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
