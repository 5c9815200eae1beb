//! Configuration settings for Transmeet.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub catalog: CatalogSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub routing: RoutingSettings,
    pub providers: ProvidersSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Where the knowledge-base catalog lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Path to the JSON catalog document (`{"repositories": [...]}`).
    pub path: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: "repos.json".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// OpenAI-compatible base URL. None uses the OpenAI default.
    pub base_url: Option<String>,
    /// Environment variable holding the API key. None sends no real key.
    pub api_key_env: Option<String>,
    /// Embedding model to use.
    pub model: String,
    /// Requested dimensions. Only sent when set; local models usually reject it.
    pub dimensions: Option<u32>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Vector store (Qdrant) and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Qdrant REST endpoint.
    pub url: String,
    /// Environment variable holding the Qdrant API key, if the instance needs one.
    pub api_key_env: Option<String>,
    /// Search request timeout in seconds.
    pub timeout_secs: u64,
    /// Collection holding indexed meeting transcripts.
    pub meetings_collection: String,
    /// Result limit for a targeted (single collection) search.
    pub targeted_limit: usize,
    /// Per-collection result limit during deep fan-out.
    pub fanout_limit: usize,
    /// Results kept after merging the deep fan-out.
    pub deep_max_results: usize,
    /// Maximum collection searches in flight during deep fan-out.
    pub max_concurrent_searches: usize,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key_env: None,
            timeout_secs: 10,
            meetings_collection: "transmeet_meetings_local".to_string(),
            targeted_limit: 7,
            fanout_limit: 5,
            deep_max_results: 10,
            max_concurrent_searches: 4,
        }
    }
}

impl VectorStoreSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for one OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// OpenAI-compatible base URL. None uses the OpenAI default.
    pub base_url: Option<String>,
    /// Environment variable holding the API key. None sends no real key.
    pub api_key_env: Option<String>,
    /// Chat model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds (covers the whole streamed body).
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            timeout_secs: 300,
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Routing classifier endpoint. Temperature is always 0 for classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 20,
        }
    }
}

impl RoutingSettings {
    /// View the routing endpoint as a provider with deterministic sampling.
    pub fn as_provider(&self) -> ProviderSettings {
        ProviderSettings {
            base_url: self.base_url.clone(),
            api_key_env: self.api_key_env.clone(),
            model: self.model.clone(),
            temperature: 0.0,
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Answer generation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersSettings {
    /// Streaming provider tried first.
    pub primary: ProviderSettings,
    /// Non-streaming provider used once when the primary fails.
    pub fallback: ProviderSettings,
}

impl Default for ProvidersSettings {
    fn default() -> Self {
        Self {
            primary: ProviderSettings::default(),
            fallback: ProviderSettings {
                base_url: Some(
                    "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
                ),
                api_key_env: Some("GEMINI_API_KEY".to_string()),
                model: "gemini-2.0-flash".to_string(),
                temperature: 0.2,
                timeout_secs: 120,
            },
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("transmeet")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded catalog path.
    pub fn catalog_path(&self) -> PathBuf {
        Self::expand_path(&self.catalog.path)
    }

    /// Every credential variable a full `ask` needs, deduplicated, in a stable order.
    pub fn required_key_vars(&self) -> Vec<String> {
        let candidates = [
            self.providers.primary.api_key_env.as_deref(),
            self.providers.fallback.api_key_env.as_deref(),
            self.routing.api_key_env.as_deref(),
            self.embedding.api_key_env.as_deref(),
            self.vector_store.api_key_env.as_deref(),
        ];

        let mut vars: Vec<String> = Vec::new();
        for var in candidates.into_iter().flatten() {
            if !var.is_empty() && !vars.iter().any(|v| v == var) {
                vars.push(var.to_string());
            }
        }
        vars
    }
}
