//! Query-string merging for the single-endpoint RPC gateway.
//!
//! Every service function is addressed through the same URL, so all the
//! request shape lives in string-keyed query parameters. Parameter sets are
//! merged last-write-wins and serialized in key order, which keeps encoded
//! URLs deterministic.
//!
//! The service has no native list syntax in query strings; lists travel as
//! indexed keys (`courseids[0]=1&courseids[1]=2`), built with
//! [`QueryParams::indexed`].

use std::collections::BTreeMap;
use std::fmt::Display;

use url::Url;

/// A set of query parameters keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key=value`, replacing any earlier value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Display) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.insert(key, value);
        self
    }

    /// Flatten `values` into `key[0]=..&key[1]=..`, preserving input order.
    pub fn indexed<I>(key: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let mut params = Self::new();
        for (i, value) in values.into_iter().enumerate() {
            params.insert(format!("{key}[{i}]"), value);
        }
        params
    }

    /// Merge `other` into `self`; keys in `other` win.
    pub fn merge(mut self, other: &QueryParams) -> Self {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// The service's boolean encoding: `1` for true, `0` for false.
pub fn bit(value: bool) -> u8 {
    u8::from(value)
}

/// Return a copy of `base` whose query is the base's own pairs overlaid with
/// each set in `sets`, in order. Later sets win key-by-key.
pub fn encode(base: &Url, sets: &[&QueryParams]) -> Url {
    let mut merged: BTreeMap<String, String> = base
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    for set in sets {
        for (k, v) in set.iter() {
            merged.insert(k.to_string(), v.to_string());
        }
    }

    let mut url = base.clone();
    if merged.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(merged.iter());
    }
    url
}
