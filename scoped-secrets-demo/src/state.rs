use std::collections::BTreeSet;
use std::sync::Arc;

use scoped_secrets_core::{EnvBag, ResourceHandle, SecretContext};

use crate::kv::MemoryKv;

/// Bag entry under which requests find the KV resource.
pub const KV_BINDING: &str = "KV";

#[derive(Clone)]
pub struct AppState {
    pub context: Arc<SecretContext>,
    base_env: Arc<EnvBag>,
    kv: ResourceHandle,
    exposed: Arc<BTreeSet<String>>,
}

impl AppState {
    /// State with no names served by the config route.
    pub fn new(context: SecretContext, base_env: EnvBag, kv: MemoryKv) -> Self {
        Self {
            context: Arc::new(context),
            base_env: Arc::new(base_env),
            kv: ResourceHandle::new(kv),
            exposed: Arc::new(BTreeSet::new()),
        }
    }

    /// Names the config route may return.
    pub fn expose<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exposed = Arc::new(names.into_iter().map(Into::into).collect());
        self
    }

    /// Key pair names are never exposed, even when listed.
    pub fn is_exposed(&self, name: &str) -> bool {
        !self.is_reserved(name) && self.exposed.contains(name)
    }

    fn is_reserved(&self, name: &str) -> bool {
        let config = self.context.config();
        name == config.private_key_name || name == config.public_key_name
    }

    /// Fresh per-request bag: the configured environment plus resource bindings.
    pub fn request_bag(&self) -> EnvBag {
        let mut bag = EnvBag::clone(&self.base_env);
        bag.insert(KV_BINDING, self.kv.clone());
        bag
    }
}
