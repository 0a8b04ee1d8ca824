//! Task-scoped binding of a [`Snapshot`] to the request that built it.
//!
//! The binding lives in a tokio task-local. It is visible to everything polled
//! inside the scoped future, survives `.await` points, and disappears when the
//! future completes, fails or is dropped. Concurrent requests each carry their
//! own binding. Work handed to [`spawn_scoped`] or wrapped with
//! [`scope_current`] carries the binding across `tokio::spawn`.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::task::JoinHandle;
use tokio::task::futures::TaskLocalFuture;
use tracing::debug;

use crate::bag::{EnvBag, EnvValue};
use crate::config::ContextConfig;
use crate::crypto::{Decryptor, DotenvDecryptor};
use crate::errors::{ContextError, Result};
use crate::keys::KeyPair;
use crate::snapshot::Snapshot;

tokio::task_local! {
    static ACTIVE: Arc<Snapshot>;
}

static DEFAULT_CONTEXT: Lazy<SecretContext> = Lazy::new(SecretContext::from_env);

/// Builds snapshots and runs handlers with them bound.
#[derive(Clone)]
pub struct SecretContext {
    config: ContextConfig,
    decryptor: Arc<dyn Decryptor>,
}

impl SecretContext {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            decryptor: Arc::new(DotenvDecryptor::new()),
        }
    }

    /// Context configured through [`ContextConfig::from_env`].
    pub fn from_env() -> Self {
        Self::new(ContextConfig::from_env())
    }

    /// Replace the decryption primitive.
    pub fn with_decryptor<D>(mut self, decryptor: D) -> Self
    where
        D: Decryptor + 'static,
    {
        self.decryptor = Arc::new(decryptor);
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Builds the snapshot for `bag` without binding it.
    pub fn snapshot(&self, bag: EnvBag) -> Snapshot {
        let keys = KeyPair::from_bag(&bag, &self.config);
        Snapshot::build(bag, keys, Arc::clone(&self.decryptor), self.config.strategy)
    }

    /// Resolves `bag` and runs `handler` with the snapshot bound.
    ///
    /// The snapshot is complete (or, for the lazy strategy, ready to resolve)
    /// before `handler` is called. Returns whatever the handler's future yields.
    pub async fn initialize<F, Fut>(&self, bag: EnvBag, handler: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let snapshot = Arc::new(self.snapshot(bag));
        debug!(entries = snapshot.len(), "secret context active");
        ACTIVE.scope(snapshot, async move { handler().await }).await
    }

    /// Synchronous counterpart of [`SecretContext::initialize`].
    pub fn initialize_sync<F, R>(&self, bag: EnvBag, handler: F) -> R
    where
        F: FnOnce() -> R,
    {
        let snapshot = Arc::new(self.snapshot(bag));
        debug!(entries = snapshot.len(), "secret context active");
        ACTIVE.sync_scope(snapshot, handler)
    }
}

impl Default for SecretContext {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

/// [`SecretContext::initialize`] using the process-wide default context.
pub async fn initialize<F, Fut>(bag: EnvBag, handler: F) -> Fut::Output
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    DEFAULT_CONTEXT.initialize(bag, handler).await
}

/// [`SecretContext::initialize_sync`] using the process-wide default context.
pub fn initialize_sync<F, R>(bag: EnvBag, handler: F) -> R
where
    F: FnOnce() -> R,
{
    DEFAULT_CONTEXT.initialize_sync(bag, handler)
}

fn with_active<R>(accessor: &'static str, f: impl FnOnce(&Snapshot) -> R) -> Result<R> {
    ACTIVE
        .try_with(|snapshot| f(snapshot))
        .map_err(|_| ContextError::NoActiveContext { accessor })
}

/// Text value for `name`. Unmapped names and resource handles read as `None`.
pub fn get_value(name: &str) -> Result<Option<String>> {
    with_active("get_value", |snapshot| {
        snapshot
            .get(name)
            .and_then(EnvValue::as_text)
            .map(str::to_string)
    })
}

/// Like [`get_value`] but fails with [`ContextError::MissingRequiredValue`].
pub fn require_value(name: &str) -> Result<String> {
    let value = with_active("require_value", |snapshot| {
        snapshot
            .get(name)
            .and_then(EnvValue::as_text)
            .map(str::to_string)
    })?;
    value.ok_or_else(|| ContextError::MissingRequiredValue {
        name: name.to_string(),
    })
}

/// Raw entry for `name`, whatever its type.
pub fn get_resource(name: &str) -> Result<Option<EnvValue>> {
    with_active("get_resource", |snapshot| snapshot.get(name).cloned())
}

/// Copy of the whole active snapshot.
pub fn get_snapshot() -> Result<BTreeMap<String, EnvValue>> {
    with_active("get_snapshot", Snapshot::to_map)
}

/// Shared handle to the active snapshot.
pub fn current() -> Result<Arc<Snapshot>> {
    ACTIVE
        .try_with(Arc::clone)
        .map_err(|_| ContextError::NoActiveContext { accessor: "current" })
}

pub fn is_active() -> bool {
    ACTIVE.try_with(|_| ()).is_ok()
}

/// Wraps `future` so it runs with the active snapshot bound.
pub fn scope_current<F>(future: F) -> Result<TaskLocalFuture<Arc<Snapshot>, F>>
where
    F: Future,
{
    let snapshot = ACTIVE
        .try_with(Arc::clone)
        .map_err(|_| ContextError::NoActiveContext {
            accessor: "scope_current",
        })?;
    Ok(ACTIVE.scope(snapshot, future))
}

/// Spawns `future` on the tokio runtime carrying the active snapshot.
pub fn spawn_scoped<F>(future: F) -> Result<JoinHandle<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let scoped = scope_current(future).map_err(|_| ContextError::NoActiveContext {
        accessor: "spawn_scoped",
    })?;
    Ok(tokio::spawn(scoped))
}
