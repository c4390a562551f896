// src/config.rs
//! Environment-selected application configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

/// Paths and tunables for one environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub documents_path: PathBuf,
    pub templates_path: PathBuf,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub latex: LatexConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_scrape_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatexConfig {
    #[serde(default = "default_latex_timeout")]
    pub timeout_seconds: u64,
}

fn default_scrape_timeout() -> u64 {
    10
}

fn default_latex_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_scrape_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_latex_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: AppConfig,
    production: AppConfig,
}

impl AppConfig {
    /// Load configuration for the current environment. Reads
    /// `config.yaml` when present, otherwise falls back to defaults
    /// rooted in the working directory.
    pub fn load() -> Result<Self> {
        let environment = Self::environment();
        info!("Loading configuration for environment: {}", environment);

        let config_path = PathBuf::from("config.yaml");
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config.yaml")?;
            let file: ConfigFile =
                serde_yaml::from_str(&content).context("Failed to parse config.yaml")?;
            let config = match environment.as_str() {
                "production" => file.production,
                _ => file.local,
            };
            config.resolved()
        } else {
            Self::defaults().resolved()
        }
    }

    fn environment() -> String {
        std::env::var("JOBTRACK_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// Default layout relative to the working directory.
    pub fn defaults() -> Self {
        Self {
            database_path: PathBuf::from("data/jobtrack.db"),
            documents_path: PathBuf::from("documents"),
            templates_path: PathBuf::from("documents/templates_latex"),
            scrape: ScrapeConfig::default(),
            latex: LatexConfig::default(),
        }
    }

    fn resolved(self) -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        let resolve = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                current_dir.join(path)
            }
        };
        Ok(Self {
            database_path: resolve(self.database_path),
            documents_path: resolve(self.documents_path),
            templates_path: resolve(self.templates_path),
            scrape: self.scrape,
            latex: self.latex,
        })
    }

    /// Create all configured directories (database parent included).
    pub async fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.documents_path, &self.templates_path] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        if let Some(parent) = self.database_path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }
        Ok(())
    }
}
