/// Versioned records in the extension's key-value storage

use std::marker::PhantomData;
use std::rc::Rc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::platform::{KeyValueStore, Runtime};
use crate::retry::{RetryPolicy, retry_with_backoff};

/// A record persisted as JSON under a fixed key, carrying a `version` field
pub trait VersionedRecord: Serialize + DeserializeOwned + Default + Clone + 'static {
    const KEY: &'static str;
    const VERSION: &'static str;

    /// Turn a stored value into the current shape.
    ///
    /// Returns the record and whether it was migrated (and so needs to be
    /// written back). The default migration keeps a current-version record
    /// as is; anything else drops keys the current shape does not know,
    /// fills missing keys with defaults, and stamps the current version.
    fn migrate(stored: Value) -> (Self, bool) {
        let Value::Object(saved) = stored else {
            return (Self::default(), true);
        };

        let saved_version = saved.get("version").and_then(Value::as_str).unwrap_or("0");
        if saved_version == Self::VERSION {
            if let Ok(record) = serde_json::from_value(Value::Object(saved.clone())) {
                return (record, false);
            }
        }

        (merge_with_defaults::<Self>(saved), true)
    }
}

/// Field-by-field merge of a stored object over the record's defaults
fn merge_with_defaults<T: VersionedRecord>(saved: Map<String, Value>) -> T {
    let Ok(Value::Object(defaults)) = serde_json::to_value(T::default()) else {
        return T::default();
    };

    let mut merged = Map::new();
    for (key, default_value) in defaults {
        let value = match saved.get(&key) {
            Some(candidate) if key != "version" && fits::<T>(&key, candidate) => candidate.clone(),
            _ => default_value,
        };
        merged.insert(key, value);
    }
    merged.insert("version".to_string(), Value::String(T::VERSION.to_string()));

    serde_json::from_value(Value::Object(merged)).unwrap_or_default()
}

/// Whether `candidate` decodes as the record's `key` field
fn fits<T: VersionedRecord>(key: &str, candidate: &Value) -> bool {
    let Ok(Value::Object(mut probe)) = serde_json::to_value(T::default()) else {
        return false;
    };
    probe.insert(key.to_string(), candidate.clone());
    serde_json::from_value::<T>(Value::Object(probe)).is_ok()
}

/// Load/save gateway for one record type
pub struct RecordStore<T> {
    store: Rc<dyn KeyValueStore>,
    runtime: Rc<dyn Runtime>,
    policy: RetryPolicy,
    _record: PhantomData<T>,
}

impl<T: VersionedRecord> RecordStore<T> {
    pub fn new(store: Rc<dyn KeyValueStore>, runtime: Rc<dyn Runtime>) -> RecordStore<T> {
        RecordStore {
            store,
            runtime,
            policy: RetryPolicy::storage(),
            _record: PhantomData,
        }
    }

    /// Load the record, migrating and re-saving older shapes.
    /// Falls back to defaults when storage stays unreadable.
    pub async fn load(&self) -> T {
        let stored = retry_with_backoff(self.runtime.as_ref(), &self.policy, |_| {
            self.store.get(T::KEY)
        })
        .await;

        let stored = match stored {
            Ok(stored) => stored,
            Err(e) => {
                warn!("failed to load {}, using defaults: {e}", T::KEY);
                return T::default();
            }
        };

        let (record, migrated) = T::migrate(stored.unwrap_or(Value::Object(Map::new())));
        if migrated {
            info!("migrated {} to version {}", T::KEY, T::VERSION);
            self.save(&record).await;
        }
        record
    }

    /// Persist a snapshot of `record`. Failures are logged after the
    /// retries run out; the return value only reports success.
    pub async fn save(&self, record: &T) -> bool {
        let value = match serde_json::to_value(record) {
            Ok(value) => value,
            Err(e) => {
                error!("failed to serialize {}: {e}", T::KEY);
                return false;
            }
        };

        let result = retry_with_backoff(self.runtime.as_ref(), &self.policy, |attempt| {
            debug!("saving {} (attempt {attempt})", T::KEY);
            self.store.set(T::KEY, value.clone())
        })
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                error!("failed to save {}: {e}", T::KEY);
                false
            }
        }
    }

    /// Follow changes to the record made elsewhere (other tabs)
    pub fn watch(&self, callback: impl Fn(T) + 'static) {
        self.store.on_change(
            T::KEY,
            Box::new(move |value| {
                let (record, _) = T::migrate(value);
                callback(record);
            }),
        );
    }
}

impl<T> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        RecordStore {
            store: Rc::clone(&self.store),
            runtime: Rc::clone(&self.runtime),
            policy: self.policy,
            _record: PhantomData,
        }
    }
}

/// Sync storage backed by a local fallback.
///
/// Reads and writes go to `primary`; when it errors they go to `fallback`
/// instead.
pub struct FallbackStore {
    primary: Rc<dyn KeyValueStore>,
    fallback: Rc<dyn KeyValueStore>,
}

impl FallbackStore {
    pub fn new(primary: Rc<dyn KeyValueStore>, fallback: Rc<dyn KeyValueStore>) -> FallbackStore {
        FallbackStore { primary, fallback }
    }
}

#[async_trait(?Send)]
impl KeyValueStore for FallbackStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match self.primary.get(key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("sync storage read of {key} failed ({e}), using local storage");
                self.fallback.get(key).await
            }
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        match self.primary.set(key, value.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("sync storage write of {key} failed ({e}), using local storage");
                self.fallback.set(key, value).await
            }
        }
    }

    fn on_change(&self, key: &str, callback: Box<dyn Fn(Value)>) {
        self.primary.on_change(key, callback);
    }
}
