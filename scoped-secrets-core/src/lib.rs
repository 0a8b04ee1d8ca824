//! Request-scoped access to dotenv-encrypted configuration values.
//!
//! A host hands each request an [`EnvBag`]: plain strings, `encrypted:` marked
//! strings and opaque resource handles. [`initialize`] resolves the marked strings
//! into a [`Snapshot`] and runs the request handler with that snapshot bound to
//! the current task, so any code reached from the handler can call
//! [`get_value`], [`require_value`], [`get_resource`] or [`get_snapshot`] without
//! threading the snapshot through its arguments.

pub mod adapter;
pub mod bag;
pub mod config;
pub mod context;
pub mod crypto;
pub mod dotenv;
pub mod errors;
pub mod keys;
pub mod snapshot;

pub use adapter::decrypt;
pub use bag::{EnvBag, EnvValue, ResourceHandle};
pub use config::{ContextConfig, SnapshotStrategy};
pub use context::{
    SecretContext, current, get_resource, get_snapshot, get_value, initialize, initialize_sync,
    is_active, require_value, scope_current, spawn_scoped,
};
pub use crypto::{Decryptor, DotenvDecryptor};
pub use errors::{ContextError, DecryptError, DecryptResult, Result};
pub use keys::KeyPair;
pub use snapshot::Snapshot;

/// Literal prefix identifying a value that must be decrypted before use.
pub const MARKER_PREFIX: &str = "encrypted:";

/// Reserved bag entry holding the private key(s).
pub const PRIVATE_KEY_NAME: &str = "DOTENV_PRIVATE_KEY";

/// Reserved bag entry holding the optional public key.
pub const PUBLIC_KEY_NAME: &str = "DOTENV_PUBLIC_KEY";

/// Returns `true` when `value` carries the [`MARKER_PREFIX`].
pub fn is_marked(value: &str) -> bool {
    value.starts_with(MARKER_PREFIX)
}
