//! Gateway configuration — loaded from a single YAML file at startup.
//!
//! Field names and shape mirror the original gateway's config surface
//! (`port`, `openai_key`, `max_pending`, `host`, `bs_model`, `mongo_uri`,
//! `sensitive`) so an existing deployment's config file needs no changes.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("write config file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn default_port() -> String {
    "8080".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_pending() -> usize {
    64
}

/// Top-level gateway configuration, deserialized directly from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: String,
    /// Hosted-provider API keys, tried in the order given.
    pub openai_key: Vec<String>,
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    #[serde(default = "default_host")]
    pub host: String,
    /// Model name -> list of worker URLs to register at startup.
    pub bs_model: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub mongo_uri: String,
    /// Path to the sensitive-word list file.
    #[serde(default)]
    pub sensitive: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            openai_key: Vec::new(),
            max_pending: default_max_pending(),
            host: default_host(),
            bs_model: HashMap::new(),
            mongo_uri: String::new(),
            sensitive: String::new(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from `path`. Unlike the teacher's TOML loader,
    /// a missing file is an error here — the original gateway refuses to
    /// start without an explicit `--config` file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let raw = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path_ref.display().to_string(),
            source,
        })
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let rendered = serde_yaml::to_string(self).expect("GatewayConfig always serializes");
        fs::write(path_ref, rendered).map_err(|source| ConfigError::Write {
            path: path_ref.display().to_string(),
            source,
        })
    }

    /// The set of model names pre-declared in `bs_model`, regardless of
    /// whether any worker has successfully registered under them yet.
    pub fn declared_models(&self) -> Vec<String> {
        self.bs_model.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn round_trips_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "port: \"9090\"\nopenai_key: [\"sk-a\", \"sk-b\"]\nmax_pending: 10\nhost: \"0.0.0.0\"\nbs_model:\n  m1: [\"http://w1\"]\nmongo_uri: \"mongodb://x\"\nsensitive: \"words.txt\""
        )
        .unwrap();

        let config = GatewayConfig::load_from(&path).unwrap();
        assert_eq!(config.port, "9090");
        assert_eq!(config.openai_key, vec!["sk-a", "sk-b"]);
        assert_eq!(config.max_pending, 10);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.bs_model.get("m1").unwrap(), &vec!["http://w1".to_string()]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = GatewayConfig::load_from("/nonexistent/path/config.yml");
        assert!(result.is_err());
    }

    #[test]
    fn defaults_fill_in_when_fields_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "openai_key: [\"sk-a\"]\n").unwrap();
        let config = GatewayConfig::load_from(&path).unwrap();
        assert_eq!(config.port, "8080");
        assert_eq!(config.max_pending, 64);
    }
}
