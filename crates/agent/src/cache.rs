use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

/// Optional result cache. An absent cache is modelled by [`NoopCache`], whose
/// operations report nothing stored.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> bool;
    async fn get(&self, key: &str) -> Option<Value>;
    async fn delete(&self, key: &str) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> bool {
        false
    }

    async fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    async fn delete(&self, _key: &str) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> bool {
        let now = Instant::now();
        let Some(expires_at) = now.checked_add(ttl) else {
            return false;
        };
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.retain(|_, (_, expires)| *expires > now);
        entries.insert(key.to_string(), (value, expires_at));
        true
    }

    async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        let fresh = entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone());
        if fresh.is_none() {
            entries.remove(key);
        }
        fresh
    }

    async fn delete(&self, key: &str) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => entries.remove(key).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(key).is_some(),
        }
    }
}
