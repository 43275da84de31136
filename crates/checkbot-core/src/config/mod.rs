//! Configuration module for checkbot.
//!
//! Loads typed configuration from `~/.checkbot/config.json`.
//! Every section is optional; missing keys fall back to defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::provider::ProviderOptions;
use crate::registry::ProviderRegistry;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub providers: ProvidersConfig,
    pub agent: AgentConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the default path (`~/.checkbot/config.json`).
    pub fn load() -> anyhow::Result<Self> {
        Self::load_or_default(&Self::default_path())
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Get the default config directory path.
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".checkbot")
    }

    /// Resolved path of the outcome database.
    pub fn database_path(&self) -> PathBuf {
        expand_home(&self.storage.database_path)
    }

    /// Write the default config template to `path`.
    pub fn write_default_template(path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = serde_json::json!({
            "providers": {
                "anthropic": {
                    "apiKey": "sk-ant-YOUR_KEY_HERE"
                },
                "huggingface": {
                    "apiKey": "hf_YOUR_TOKEN_HERE",
                    "temperature": 0.1
                }
            },
            "agent": {
                "defaultProvider": "anthropic"
            },
            "storage": {
                "databasePath": "~/.checkbot/outcomes.db"
            }
        });

        std::fs::write(path, serde_json::to_string_pretty(&template)?)?;
        Ok(())
    }

    /// Validate config and return every problem found.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let registry = ProviderRegistry::global();

        if !registry.contains(&self.agent.default_provider) {
            errors.push(format!(
                "agent.defaultProvider '{}' is not a known provider. Available: {}",
                self.agent.default_provider,
                registry.available().join(", ")
            ));
        }

        for (name, entry) in self.providers.entries() {
            if entry.api_key.contains("YOUR_") {
                errors.push(format!(
                    "providers.{name}.apiKey is still a placeholder. \
                     Replace it or remove it to use the environment."
                ));
            }
            if entry.max_tokens == Some(0) {
                errors.push(format!("providers.{name}.maxTokens must be greater than 0."));
            }
            if let Some(t) = entry.temperature {
                if !(0.0..=2.0).contains(&t) {
                    errors.push(format!(
                        "providers.{name}.temperature {t} is outside 0.0..=2.0."
                    ));
                }
            }
        }

        if self.storage.database_path.trim().is_empty() {
            errors.push("storage.databasePath is empty. Specify a file path.".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if raw.starts_with("~/") || raw.starts_with("~\\") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&raw[2..])
    } else {
        PathBuf::from(raw)
    }
}

// ── Provider Configuration ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderEntry {
    /// Empty means "use the provider's environment variable".
    pub api_key: String,
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ProviderEntry {
    pub fn credential(&self) -> Option<&str> {
        Some(self.api_key.trim()).filter(|k| !k.is_empty())
    }

    pub fn options(&self) -> ProviderOptions {
        let defaults = ProviderOptions::default();
        ProviderOptions {
            api_base: self.api_base.clone(),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: Option<ProviderEntry>,
    pub openai: Option<ProviderEntry>,
    pub huggingface: Option<ProviderEntry>,
}

impl ProvidersConfig {
    /// Configured entries, by provider name.
    pub fn entries(&self) -> Vec<(&str, &ProviderEntry)> {
        [
            ("anthropic", &self.anthropic),
            ("openai", &self.openai),
            ("huggingface", &self.huggingface),
        ]
        .into_iter()
        .filter_map(|(name, entry)| entry.as_ref().map(|e| (name, e)))
        .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ProviderEntry> {
        self.entries()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, e)| e)
    }
}

// ── Agent Configuration ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    /// Provider used when a request does not name one.
    pub default_provider: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default_provider: "anthropic".into(),
        }
    }
}

// ── Storage Configuration ───────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "~/.checkbot/outcomes.db".into(),
        }
    }
}
