use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::error::{OctoseekError, Result};
use crate::github::DEFAULT_API_URL;
use crate::sources::{USER_REPOS_PAGE_SIZE, USER_SEARCH_PAGE_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token_env: Option<String>,
    pub token_command: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_env: Some("GITHUB_TOKEN".to_string()),
            token_command: Some("gh auth token".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub page_size: u32,
    pub load_more_delay_ms: u64,
    /// Rows from the bottom at which scrolling pulls in the next page
    pub prefetch_threshold: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: USER_SEARCH_PAGE_SIZE,
            load_more_delay_ms: 300,
            prefetch_threshold: 3,
        }
    }
}

impl SearchConfig {
    pub fn load_more_delay(&self) -> Duration {
        Duration::from_millis(self.load_more_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReposConfig {
    pub page_size: u32,
    pub load_more_delay_ms: u64,
}

impl Default for ReposConfig {
    fn default() -> Self {
        Self {
            page_size: USER_REPOS_PAGE_SIZE,
            load_more_delay_ms: 300,
        }
    }
}

impl ReposConfig {
    pub fn load_more_delay(&self) -> Duration {
        Duration::from_millis(self.load_more_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub search: SearchConfig,
    pub repos: ReposConfig,
}

fn config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("octoseek").join("config.toml"))
}

impl Config {
    /// Load from the default location, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Config::default();
        };
        if !path.exists() {
            return Config::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring config file");
                Config::default()
            }
        }
    }

    /// Load an explicitly named file. Unlike [`Config::load`], errors are reported.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| OctoseekError::Config(e.to_string()))?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        if self.search.page_size == 0 {
            warn!("search.page_size must be positive, using 1");
            self.search.page_size = 1;
        }
        if self.repos.page_size == 0 {
            warn!("repos.page_size must be positive, using 1");
            self.repos.page_size = 1;
        }
        if self.github.api_url.trim().is_empty() {
            self.github.api_url = DEFAULT_API_URL.to_string();
        }
        self
    }
}
