use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub backend: BackendConfig,

    pub search: SearchConfig,

    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,

    /// Per-request timeout in milliseconds. 0 disables it, so a hung request
    /// is only ever superseded by the next qualifying keystroke.
    pub request_timeout_ms: u64,

    pub user_agent: String,

    /// Sent as `X-Api-Key` when set.
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            request_timeout_ms: 0,
            user_agent: "BizLookup/1.0".to_string(),
            api_key: None,
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.request_timeout_ms))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Trimmed queries shorter than this never reach the backend.
    pub min_query_len: usize,

    pub debounce_ms: u64,

    pub page_size: u32,

    pub cache_ttl_seconds: u64,

    pub cache_capacity: usize,

    /// Event bus buffer size (default: 64)
    pub event_bus_buffer_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            debounce_ms: 300,
            page_size: 20,
            cache_ttl_seconds: 300,
            cache_capacity: 50,
            event_bus_buffer_size: 64,
        }
    }
}

/// A named lookup endpoint and the JSON fields its entities are read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub name: String,

    /// Path appended to `backend.base_url`.
    pub path: String,

    /// Key of the entity array in the response body.
    pub list_key: String,

    #[serde(default = "default_id_field")]
    pub id_field: String,

    pub label_field: String,

    #[serde(default)]
    pub secondary_field: Option<String>,

    #[serde(default)]
    pub contact_field: Option<String>,
}

fn default_id_field() -> String {
    "id".to_string()
}

impl EndpointConfig {
    #[must_use]
    pub fn customers() -> Self {
        Self {
            name: "customers".to_string(),
            path: "/customers/search".to_string(),
            list_key: "customers".to_string(),
            id_field: default_id_field(),
            label_field: "customerName".to_string(),
            secondary_field: Some("company".to_string()),
            contact_field: Some("phone".to_string()),
        }
    }

    #[must_use]
    pub fn materials() -> Self {
        Self {
            name: "materials".to_string(),
            path: "/materials/search".to_string(),
            list_key: "materials".to_string(),
            id_field: default_id_field(),
            label_field: "materialName".to_string(),
            secondary_field: Some("materialCode".to_string()),
            contact_field: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            backend: BackendConfig::default(),
            search: SearchConfig::default(),
            endpoints: vec![EndpointConfig::customers(), EndpointConfig::materials()],
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("bizlookup").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".bizlookup").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.is_empty() {
            anyhow::bail!("Backend base URL cannot be empty");
        }

        url::Url::parse(&self.backend.base_url)
            .with_context(|| format!("Invalid backend base URL: {}", self.backend.base_url))?;

        if self.search.min_query_len == 0 {
            anyhow::bail!("search.min_query_len must be at least 1");
        }

        if self.search.page_size == 0 {
            anyhow::bail!("search.page_size must be > 0");
        }

        if self.search.cache_capacity == 0 {
            anyhow::bail!("search.cache_capacity must be > 0");
        }

        let mut seen = std::collections::HashSet::new();
        for endpoint in &self.endpoints {
            if !seen.insert(endpoint.name.as_str()) {
                anyhow::bail!("Duplicate endpoint name '{}'", endpoint.name);
            }
            if endpoint.list_key.is_empty() || endpoint.label_field.is_empty() {
                anyhow::bail!(
                    "Endpoint '{}' needs both list_key and label_field",
                    endpoint.name
                );
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn find_endpoint(&self, name: &str) -> Option<&EndpointConfig> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}
