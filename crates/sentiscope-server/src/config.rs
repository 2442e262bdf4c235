//! Server configuration

use crate::cli::Cli;
use sentiscope_models::ModelsConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Wall-clock budget for one explanation; overruns answer with no words
    #[serde(default = "default_explanation_budget_ms")]
    pub explanation_budget_ms: u64,

    /// Model layer configuration
    #[serde(default)]
    pub models: ModelsConfig,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(artifacts) = &cli.artifacts {
            config.models.artifacts_dir = artifacts.clone();
        }

        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }

        if let Some(port) = cli.port {
            config.port = port;
        }

        Ok(config)
    }

    pub fn explanation_budget(&self) -> Duration {
        Duration::from_millis(self.explanation_budget_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            explanation_budget_ms: default_explanation_budget_ms(),
            models: ModelsConfig::default(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_explanation_budget_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = ServerConfig::load("/nonexistent/sentiscope.yaml", &Cli::default()).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.explanation_budget_ms, 2000);
        assert_eq!(config.models.explanation.num_features, 12);
    }

    #[test]
    fn test_yaml_then_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "port: 9100\nexplanation_budget_ms: 250\nmodels:\n  artifacts_dir: /srv/models\n  explanation:\n    num_samples: 800\n",
        )
        .unwrap();

        let cli = Cli {
            port: Some(9200),
            artifacts: Some(PathBuf::from("/tmp/artifacts")),
            ..Cli::default()
        };
        let config = ServerConfig::load(path.to_str().unwrap(), &cli).unwrap();

        assert_eq!(config.port, 9200);
        assert_eq!(config.listen, "0.0.0.0");
        assert_eq!(config.explanation_budget(), Duration::from_millis(250));
        assert_eq!(config.models.artifacts_dir, PathBuf::from("/tmp/artifacts"));
        assert_eq!(config.models.explanation.num_samples, 800);
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "port: [not, a, port]\n").unwrap();
        assert!(ServerConfig::load(path.to_str().unwrap(), &Cli::default()).is_err());
    }
}
