use std::any::Any;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::sync::Arc;

use crate::is_marked;

/// Opaque, shareable handle to an external resource (a KV namespace, a database
/// client, a queue producer).
///
/// Clones share the same allocation, so identity survives snapshot construction.
#[derive(Clone)]
pub struct ResourceHandle(Arc<dyn Any + Send + Sync>);

impl ResourceHandle {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self(Arc::new(value))
    }

    pub fn from_arc<T>(value: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self(value)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Shared ownership of the underlying resource, if it is a `T`.
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        Arc::clone(&self.0).downcast::<T>().ok()
    }

    /// Returns `true` when both handles point at the same resource.
    pub fn ptr_eq(&self, other: &ResourceHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResourceHandle(..)")
    }
}

/// A single entry of an [`EnvBag`].
#[derive(Clone, Debug)]
pub enum EnvValue {
    Text(String),
    Resource(ResourceHandle),
}

impl EnvValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn resource<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::Resource(ResourceHandle::new(value))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceHandle> {
        match self {
            Self::Text(_) => None,
            Self::Resource(handle) => Some(handle),
        }
    }

    /// `true` for text values carrying the `encrypted:` marker.
    pub fn is_marked(&self) -> bool {
        self.as_text().is_some_and(is_marked)
    }
}

impl PartialEq for EnvValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Resource(a), Self::Resource(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<String> for EnvValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<ResourceHandle> for EnvValue {
    fn from(value: ResourceHandle) -> Self {
        Self::Resource(value)
    }
}

/// Per-request mapping of configuration names to values, as handed over by the host.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvBag {
    entries: BTreeMap<String, EnvValue>,
}

impl EnvBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every process environment variable as a text entry.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn from_process_env() -> Self {
        std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .map(|(name, value)| (name, EnvValue::Text(value)))
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<EnvValue>) -> Option<EnvValue> {
        self.entries.insert(name.into(), value.into())
    }

    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), EnvValue::Text(value.into()));
    }

    pub fn insert_resource<T>(&mut self, name: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.entries.insert(name.into(), EnvValue::resource(value));
    }

    /// Builder-style [`EnvBag::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<EnvValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&EnvValue> {
        self.entries.get(name)
    }

    /// Text value stored under `name`, if any. Blank strings count as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(EnvValue::as_text)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, EnvValue> {
        self.entries.iter()
    }
}

impl FromIterator<(String, EnvValue)> for EnvBag {
    fn from_iter<I: IntoIterator<Item = (String, EnvValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for EnvBag {
    type Item = (String, EnvValue);
    type IntoIter = btree_map::IntoIter<String, EnvValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a EnvBag {
    type Item = (&'a String, &'a EnvValue);
    type IntoIter = btree_map::Iter<'a, String, EnvValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
