//! Provider registry.
//!
//! Maps provider names to adapter constructors and default models.
//!
//! Lifecycle: the process-wide instance ([`ProviderRegistry::global`]) is
//! built once with the built-in adapters on first use. [`register`] may
//! append more entries during initialization; nothing is ever replaced or
//! removed. There is no "current provider"; callers pick one per request.
//!
//! [`register`]: ProviderRegistry::register

use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::provider::anthropic::{self, AnthropicProvider};
use crate::provider::huggingface::{self, HuggingFaceProvider};
use crate::provider::openai::{self, OpenAiProvider};
use crate::provider::{MoveProvider, ProviderOptions};

/// Credential handed to constructors during the registration probe.
const PROBE_CREDENTIAL: &str = "registry-probe";

/// Everything a constructor needs to build an adapter.
#[derive(Debug, Clone)]
pub struct ProviderInit {
    pub credential: Option<String>,
    pub model: String,
    pub options: ProviderOptions,
    pub client: Client,
}

pub type ProviderConstructor =
    Arc<dyn Fn(ProviderInit) -> Result<Box<dyn MoveProvider>, CoreError> + Send + Sync>;

#[derive(Clone)]
struct ProviderEntry {
    default_model: String,
    constructor: ProviderConstructor,
}

/// Append-only name → adapter constructor map.
pub struct ProviderRegistry {
    entries: RwLock<HashMap<String, ProviderEntry>>,
    client: Client,
}

impl ProviderRegistry {
    /// Empty registry.
    pub fn new(client: Client) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            client,
        }
    }

    /// Registry pre-populated with the built-in adapters.
    pub fn with_builtins(client: Client) -> Self {
        let registry = Self::new(client);
        registry.insert(
            anthropic::PROVIDER_NAME,
            anthropic::DEFAULT_MODEL,
            Arc::new(|init: ProviderInit| {
                let p = AnthropicProvider::new(init.credential.as_deref(), &init.model, init.options, init.client)?;
                Ok(Box::new(p) as Box<dyn MoveProvider>)
            }),
        );
        registry.insert(
            openai::PROVIDER_NAME,
            openai::DEFAULT_MODEL,
            Arc::new(|init: ProviderInit| {
                let p = OpenAiProvider::new(init.credential.as_deref(), &init.model, init.options, init.client)?;
                Ok(Box::new(p) as Box<dyn MoveProvider>)
            }),
        );
        registry.insert(
            huggingface::PROVIDER_NAME,
            huggingface::DEFAULT_MODEL,
            Arc::new(|init: ProviderInit| {
                let p = HuggingFaceProvider::new(init.credential.as_deref(), &init.model, init.options, init.client)?;
                Ok(Box::new(p) as Box<dyn MoveProvider>)
            }),
        );
        registry
    }

    /// The process-wide registry.
    pub fn global() -> &'static ProviderRegistry {
        static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::with_builtins(Client::new()))
    }

    fn insert(&self, name: &str, default_model: &str, constructor: ProviderConstructor) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            name.to_string(),
            ProviderEntry {
                default_model: default_model.to_string(),
                constructor,
            },
        );
        debug!(provider = name, default_model, "Registered provider");
    }

    /// Register a new provider.
    ///
    /// The constructor is probed once with a dummy credential and the
    /// default model; its product must report the registered name and that
    /// model. Existing names cannot be re-registered.
    pub fn register(
        &self,
        name: &str,
        default_model: &str,
        constructor: ProviderConstructor,
    ) -> Result<(), CoreError> {
        let invalid = |reason: String| CoreError::InvalidAdapter {
            name: name.to_string(),
            reason,
        };

        if name.trim().is_empty() {
            return Err(invalid("provider name must not be empty".into()));
        }
        if default_model.trim().is_empty() {
            return Err(invalid("default model must not be empty".into()));
        }
        if self.contains(name) {
            return Err(invalid("a provider with this name is already registered".into()));
        }

        let probe = constructor(ProviderInit {
            credential: Some(PROBE_CREDENTIAL.to_string()),
            model: default_model.to_string(),
            options: ProviderOptions::default(),
            client: self.client.clone(),
        })
        .map_err(|e| invalid(format!("constructor failed during probe: {e}")))?;

        if probe.provider_name() != name {
            return Err(invalid(format!(
                "adapter reports provider name '{}'",
                probe.provider_name()
            )));
        }
        if probe.model() != default_model {
            return Err(invalid(format!(
                "adapter ignored the requested model and reports '{}'",
                probe.model()
            )));
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(name) {
            return Err(invalid("a provider with this name is already registered".into()));
        }
        entries.insert(
            name.to_string(),
            ProviderEntry {
                default_model: default_model.to_string(),
                constructor,
            },
        );
        info!(provider = name, default_model, "Registered provider");
        Ok(())
    }

    /// Build an adapter for `name`.
    ///
    /// Fails with [`CoreError::UnknownProvider`] before any constructor runs
    /// if the name is not registered. `model` falls back to the provider's
    /// default.
    pub fn create(
        &self,
        name: &str,
        credential: Option<&str>,
        model: Option<&str>,
        options: ProviderOptions,
    ) -> Result<Box<dyn MoveProvider>, CoreError> {
        let entry = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries.get(name).cloned()
        };
        let Some(entry) = entry else {
            return Err(CoreError::UnknownProvider {
                name: name.to_string(),
                available: self.available(),
            });
        };

        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&entry.default_model)
            .to_string();

        debug!(provider = name, model = %model, "Creating provider");

        (entry.constructor)(ProviderInit {
            credential: credential.map(str::to_string),
            model,
            options,
            client: self.client.clone(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn default_model(&self, name: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|e| e.default_model.clone())
    }
}
