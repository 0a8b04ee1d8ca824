use std::fmt;

use crate::bag::EnvBag;
use crate::config::ContextConfig;

/// Private key(s) and optional public key used by the decryption primitive.
///
/// The private key entry may list several comma separated keys; each is tried in
/// order. Keys are read fresh from the bag for every request and never validated
/// beyond what decryption itself does.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct KeyPair {
    private_keys: Vec<String>,
    public_key: Option<String>,
}

impl KeyPair {
    pub fn new(private_key: &str, public_key: Option<&str>) -> Self {
        Self {
            private_keys: split_keys(private_key),
            public_key: public_key
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
        }
    }

    /// Reads the reserved key entries named by `config` from `bag`.
    pub fn from_bag(bag: &EnvBag, config: &ContextConfig) -> Self {
        Self::new(
            bag.text(&config.private_key_name).unwrap_or_default(),
            bag.text(&config.public_key_name),
        )
    }

    pub fn has_private_key(&self) -> bool {
        !self.private_keys.is_empty()
    }

    pub fn private_keys(&self) -> &[String] {
        &self.private_keys
    }

    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_keys", &format_args!("[redacted; {}]", self.private_keys.len()))
            .field("public_key", &self.public_key)
            .finish()
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}
