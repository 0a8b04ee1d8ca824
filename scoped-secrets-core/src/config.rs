use serde::{Deserialize, Serialize};

use crate::{PRIVATE_KEY_NAME, PUBLIC_KEY_NAME};

const STRATEGY_ENV: &str = "SCOPED_SECRETS_STRATEGY";
const PRIVATE_KEY_NAME_ENV: &str = "SCOPED_SECRETS_PRIVATE_KEY_NAME";
const PUBLIC_KEY_NAME_ENV: &str = "SCOPED_SECRETS_PUBLIC_KEY_NAME";

/// When marked values are decrypted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStrategy {
    /// Every marked value is resolved before the handler runs.
    #[default]
    Eager,
    /// Marked values are resolved on first read and memoized for the request.
    Lazy,
}

impl SnapshotStrategy {
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "eager" => Some(Self::Eager),
            "lazy" => Some(Self::Lazy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::Lazy => "lazy",
        }
    }
}

/// Settings for building request snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub strategy: SnapshotStrategy,
    pub private_key_name: String,
    pub public_key_name: String,
}

impl ContextConfig {
    pub fn new() -> Self {
        Self {
            strategy: SnapshotStrategy::Eager,
            private_key_name: PRIVATE_KEY_NAME.to_string(),
            public_key_name: PUBLIC_KEY_NAME.to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// * `SCOPED_SECRETS_STRATEGY` selects `eager` (default) or `lazy` decryption.
    /// * `SCOPED_SECRETS_PRIVATE_KEY_NAME` renames the private key entry
    ///   (default `DOTENV_PRIVATE_KEY`).
    /// * `SCOPED_SECRETS_PUBLIC_KEY_NAME` renames the public key entry
    ///   (default `DOTENV_PUBLIC_KEY`).
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Some(strategy) = std::env::var(STRATEGY_ENV)
            .ok()
            .and_then(|value| SnapshotStrategy::from_env_value(&value))
        {
            config.strategy = strategy;
        }
        if let Some(name) = non_blank_var(PRIVATE_KEY_NAME_ENV) {
            config.private_key_name = name;
        }
        if let Some(name) = non_blank_var(PUBLIC_KEY_NAME_ENV) {
            config.public_key_name = name;
        }

        config
    }

    pub fn strategy(mut self, strategy: SnapshotStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn private_key_name(mut self, name: impl Into<String>) -> Self {
        self.private_key_name = name.into();
        self
    }

    pub fn public_key_name(mut self, name: impl Into<String>) -> Self {
        self.public_key_name = name.into();
        self
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig::new()
    }
}

fn non_blank_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
