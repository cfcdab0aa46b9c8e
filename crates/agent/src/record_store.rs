use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use glowie_core::config::BackendConfig;
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Backend collections the agents read from or write to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Quotes,
    Shipments,
    Customers,
    Routes,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Quotes => "/quotes",
            Self::Shipments => "/admin/crud/shipments",
            Self::Customers => "/admin/customers",
            Self::Routes => "/routes",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quotes => "quotes",
            Self::Shipments => "shipments",
            Self::Customers => "customers",
            Self::Routes => "routes",
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend returned status {0}")]
    Status(u16),
    #[error("backend response was not JSON: {0}")]
    Decode(String),
}

/// Backend record store. Failures never propagate: reads yield `None`, writes
/// yield `None`/`false`, and the cause is logged.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, resource: Resource, record: Value) -> Option<Value>;
    async fn get(&self, resource: Resource, id: &str) -> Option<Value>;
    async fn update(&self, resource: Resource, id: &str, fields: Value) -> bool;
}

pub struct HttpRecordStore {
    base_url: String,
    api_key: Option<SecretString>,
    client: Client,
}

impl HttpRecordStore {
    pub fn from_config(config: &BackendConfig) -> Result<Self, PersistenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| PersistenceError::Transport(error.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn url(&self, resource: Resource, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}{}/{id}", self.base_url, resource.path()),
            None => format!("{}{}", self.base_url, resource.path()),
        }
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> Result<Option<Value>, PersistenceError> {
        let mut builder =
            self.client.request(method, url).header("Accept", "application/json");
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response =
            builder.send().await.map_err(|error| PersistenceError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PersistenceError::Status(status.as_u16()));
        }

        let bytes =
            response.bytes().await.map_err(|error| PersistenceError::Transport(error.to_string()))?;
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|error| PersistenceError::Decode(error.to_string()))
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn create(&self, resource: Resource, record: Value) -> Option<Value> {
        match self.send(Method::POST, self.url(resource, None), Some(&record)).await {
            Ok(created) => Some(created.unwrap_or(record)),
            Err(error) => {
                warn!(
                    event_name = "backend.create.failed",
                    resource = resource.as_str(),
                    error = %error,
                    "backend create failed"
                );
                None
            }
        }
    }

    async fn get(&self, resource: Resource, id: &str) -> Option<Value> {
        match self.send(Method::GET, self.url(resource, Some(id)), None).await {
            Ok(record) => record,
            Err(error) => {
                warn!(
                    event_name = "backend.get.failed",
                    resource = resource.as_str(),
                    id,
                    error = %error,
                    "backend fetch failed"
                );
                None
            }
        }
    }

    async fn update(&self, resource: Resource, id: &str, fields: Value) -> bool {
        match self.send(Method::PUT, self.url(resource, Some(id)), Some(&fields)).await {
            Ok(_) => true,
            Err(error) => {
                warn!(
                    event_name = "backend.update.failed",
                    resource = resource.as_str(),
                    id,
                    error = %error,
                    "backend update failed"
                );
                false
            }
        }
    }
}

#[derive(Debug, Default)]
struct Records {
    by_key: HashMap<(Resource, String), Value>,
    next_id: u64,
}

/// Process-local record store for offline runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Records>,
    reject_writes: bool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail, as an unreachable backend would.
    pub fn rejecting_writes() -> Self {
        Self { reject_writes: true, ..Self::default() }
    }

    pub fn seed(&self, resource: Resource, id: &str, record: Value) {
        match self.records.lock() {
            Ok(mut records) => {
                records.by_key.insert((resource, id.to_string()), record);
            }
            Err(poisoned) => {
                poisoned.into_inner().by_key.insert((resource, id.to_string()), record);
            }
        }
    }

    pub fn records(&self, resource: Resource) -> Vec<Value> {
        let records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records
            .by_key
            .iter()
            .filter(|((kind, _), _)| *kind == resource)
            .map(|(_, record)| record.clone())
            .collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, resource: Resource, mut record: Value) -> Option<Value> {
        if self.reject_writes {
            warn!(
                event_name = "backend.create.failed",
                resource = resource.as_str(),
                "in-memory store rejected write"
            );
            return None;
        }

        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.next_id += 1;
        let id = records.next_id.to_string();
        if let Value::Object(fields) = &mut record {
            fields.entry("id").or_insert_with(|| Value::from(records.next_id));
        }
        records.by_key.insert((resource, id), record.clone());
        Some(record)
    }

    async fn get(&self, resource: Resource, id: &str) -> Option<Value> {
        let records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.by_key.get(&(resource, id.to_string())).cloned()
    }

    async fn update(&self, resource: Resource, id: &str, fields: Value) -> bool {
        if self.reject_writes {
            return false;
        }

        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(existing) = records.by_key.get_mut(&(resource, id.to_string())) else {
            return false;
        };
        match (existing, fields) {
            (Value::Object(current), Value::Object(changes)) => {
                current.extend(changes);
                true
            }
            _ => false,
        }
    }
}
