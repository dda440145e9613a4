use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

pub const SCHEMA_KEY: &str = "schema";
pub const CHATBOT_KEY: &str = "chatbot";
pub const ASSISTANT_ID_KEY: &str = "assistant_id";
pub const CUSTOMER_ID_KEY: &str = "customer_id";

#[must_use]
pub fn channel_key(channel_name: &str) -> String {
    format!("channel_{channel_name}")
}

#[must_use]
pub fn channel_messages_key(channel_name: &str) -> String {
    format!("channel_{channel_name}_messages")
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("stored value at {key} has an unexpected shape: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("value for {key} cannot be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Flat key-value storage backing every emulated resource.
///
/// `read` returns `None` only for keys that were never written, so a stored
/// `null`, `[]` or `{}` stays distinguishable from an absent key.
pub trait KeyValueStore: Send {
    fn read(&self, key: &str) -> Option<Value>;
    fn write(&mut self, key: &str, value: Value);
    fn keys(&self) -> Vec<String>;
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, Value>,
}

impl KeyValueStore for MemoryKeyValueStore {
    fn read(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Shared handle to the store. Holding the guard from [`MockDb::lock`] makes a
/// read-modify-write sequence atomic with respect to other requests.
#[derive(Clone)]
pub struct MockDb {
    store: Arc<Mutex<Box<dyn KeyValueStore>>>,
}

impl MockDb {
    #[must_use]
    pub fn memory() -> Self {
        Self::with_store(MemoryKeyValueStore::default())
    }

    pub fn with_store(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Arc::new(Mutex::new(Box::new(store))),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, Box<dyn KeyValueStore>> {
        self.store.lock().await
    }

    pub async fn read(&self, key: &str) -> Option<Value> {
        self.lock().await.read(key)
    }

    pub async fn write(&self, key: &str, value: Value) {
        self.lock().await.write(key, value);
    }

    pub async fn snapshot(&self) -> BTreeMap<String, Value> {
        let store = self.lock().await;
        store
            .keys()
            .into_iter()
            .filter_map(|key| store.read(&key).map(|value| (key, value)))
            .collect()
    }
}

pub fn read_as<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, DbError> {
    store
        .read(key)
        .map(|value| {
            serde_json::from_value(value).map_err(|source| DbError::Decode {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
}

pub fn write_as<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), DbError> {
    let encoded = serde_json::to_value(value).map_err(|source| DbError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.write(key, encoded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn absent_key_is_distinct_from_stored_empty_values() {
        let db = MockDb::memory();
        db.write("empty_list", json!([])).await;
        db.write("null_value", Value::Null).await;

        assert_eq!(db.read("never_written").await, None);
        assert_eq!(db.read("empty_list").await, Some(json!([])));
        assert_eq!(db.read("null_value").await, Some(Value::Null));
    }

    #[tokio::test]
    async fn write_overwrites_without_merging() {
        let db = MockDb::memory();
        db.write("schema", json!({"a": "1", "b": "2"})).await;
        db.write("schema", json!({"c": "3"})).await;

        assert_eq!(db.read("schema").await, Some(json!({"c": "3"})));
    }

    #[tokio::test]
    async fn snapshot_lists_entries_in_key_order() {
        let db = MockDb::memory();
        db.write("b", json!(2)).await;
        db.write("a", json!(1)).await;

        let snapshot = db.snapshot().await;
        let keys = snapshot.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn read_as_reports_key_on_shape_mismatch() {
        let mut store = MemoryKeyValueStore::default();
        store.write("channel_lobby_messages", json!("not a list"));

        let result = read_as::<Vec<Value>>(&store, "channel_lobby_messages");
        assert!(matches!(
            result,
            Err(DbError::Decode { ref key, .. }) if key == "channel_lobby_messages"
        ));
    }

    #[test]
    fn key_scheme_matches_platform_layout() {
        assert_eq!(channel_key("lobby"), "channel_lobby");
        assert_eq!(channel_messages_key("lobby"), "channel_lobby_messages");
    }
}
