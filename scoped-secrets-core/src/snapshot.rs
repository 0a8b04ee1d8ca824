use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::adapter;
use crate::bag::{EnvBag, EnvValue};
use crate::config::SnapshotStrategy;
use crate::crypto::Decryptor;
use crate::keys::KeyPair;

/// Request-scoped view of an [`EnvBag`] with marked values resolved.
///
/// Holds exactly the names of the bag it was built from. Each entry resolves at
/// most once: up front for [`SnapshotStrategy::Eager`], on first read for
/// [`SnapshotStrategy::Lazy`].
pub struct Snapshot {
    entries: BTreeMap<String, Entry>,
    keys: KeyPair,
    decryptor: Arc<dyn Decryptor>,
    strategy: SnapshotStrategy,
}

struct Entry {
    raw: EnvValue,
    resolved: OnceCell<EnvValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Passthrough,
    Decrypted,
    Fallback,
    NoKey,
}

#[derive(Debug, Default)]
struct Tally {
    passthrough: usize,
    decrypted: usize,
    fallback: usize,
    no_key: usize,
}

impl Tally {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Passthrough => self.passthrough += 1,
            Outcome::Decrypted => self.decrypted += 1,
            Outcome::Fallback => self.fallback += 1,
            Outcome::NoKey => self.no_key += 1,
        }
    }
}

impl Snapshot {
    pub fn build(
        bag: EnvBag,
        keys: KeyPair,
        decryptor: Arc<dyn Decryptor>,
        strategy: SnapshotStrategy,
    ) -> Self {
        let entries = bag
            .into_iter()
            .map(|(name, raw)| {
                let resolved = if raw.is_marked() {
                    OnceCell::new()
                } else {
                    OnceCell::with_value(raw.clone())
                };
                (name, Entry { raw, resolved })
            })
            .collect();

        let snapshot = Self {
            entries,
            keys,
            decryptor,
            strategy,
        };

        if strategy == SnapshotStrategy::Eager {
            snapshot.resolve_all();
        } else {
            debug!(
                entries = snapshot.entries.len(),
                pending = snapshot.pending(),
                "lazy snapshot ready"
            );
        }
        snapshot
    }

    pub fn strategy(&self) -> SnapshotStrategy {
        self.strategy
    }

    /// Resolved value for `name`. Marked values are decrypted on first access
    /// under the lazy strategy.
    pub fn get(&self, name: &str) -> Option<&EnvValue> {
        let entry = self.entries.get(name)?;
        Some(self.resolve(name, entry).0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned copy of every resolved entry. Forces resolution of pending values.
    pub fn to_map(&self) -> BTreeMap<String, EnvValue> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), self.resolve(name, entry).0.clone()))
            .collect()
    }

    fn pending(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.resolved.get().is_none())
            .count()
    }

    fn resolve_all(&self) {
        let mut tally = Tally::default();
        for (name, entry) in &self.entries {
            if let (_, Some(outcome)) = self.resolve(name, entry) {
                tally.record(outcome);
            } else {
                tally.record(Outcome::Passthrough);
            }
        }
        debug!(
            entries = self.entries.len(),
            decrypted = tally.decrypted,
            fallback = tally.fallback,
            undecrypted = tally.no_key,
            passthrough = tally.passthrough,
            "snapshot resolved"
        );
    }

    /// Returns the resolved value and, when this call performed the resolution,
    /// its outcome.
    fn resolve<'a>(&'a self, name: &str, entry: &'a Entry) -> (&'a EnvValue, Option<Outcome>) {
        let mut outcome = None;
        let value = entry.resolved.get_or_init(|| {
            let (value, result) = self.resolve_marked(name, &entry.raw);
            if self.strategy == SnapshotStrategy::Lazy {
                debug!(name, outcome = ?result, "resolved value on first access");
            }
            outcome = Some(result);
            value
        });
        (value, outcome)
    }

    fn resolve_marked(&self, name: &str, raw: &EnvValue) -> (EnvValue, Outcome) {
        let Some(text) = raw.as_text().filter(|_| raw.is_marked()) else {
            return (raw.clone(), Outcome::Passthrough);
        };
        if !self.keys.has_private_key() {
            debug!(name, "no private key available; leaving encrypted value as-is");
            return (raw.clone(), Outcome::NoKey);
        }
        match adapter::decrypt(self.decryptor.as_ref(), name, text, &self.keys) {
            Ok(plaintext) => (EnvValue::Text(plaintext), Outcome::Decrypted),
            Err(err) => {
                warn!(name, error = %err, "failed to decrypt value; keeping encrypted value");
                (raw.clone(), Outcome::Fallback)
            }
        }
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}
