use serde_json::Value;

use crate::db::{DbError, MockDb, channel_key, channel_messages_key, read_as, write_as};
use crate::types::ChannelRecord;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel name cannot be empty")]
    EmptyName,
    #[error(transparent)]
    Db(#[from] DbError),
}

#[derive(Clone)]
pub struct ChannelService {
    db: MockDb,
}

impl ChannelService {
    #[must_use]
    pub fn new(db: MockDb) -> Self {
        Self { db }
    }

    /// Returns the stored channel, creating it with an empty message list on
    /// first access. Later callers never overwrite the original identity.
    pub async fn get_or_create(
        &self,
        channel_name: &str,
        identity: &str,
        service_sid: &str,
    ) -> Result<ChannelRecord, ChannelError> {
        if channel_name.trim().is_empty() {
            return Err(ChannelError::EmptyName);
        }
        let key = channel_key(channel_name);
        let mut store = self.db.lock().await;

        if let Some(existing) = read_as::<ChannelRecord>(&**store, &key)? {
            tracing::debug!(channel = %channel_name, "channel already exists");
            return Ok(existing);
        }

        let record = ChannelRecord {
            name: channel_name.to_string(),
            customer_id: identity.to_string(),
            chat_id: service_sid.to_string(),
        };
        write_as(&mut **store, &key, &record)?;
        store.write(&channel_messages_key(channel_name), Value::Array(Vec::new()));
        tracing::info!(
            channel = %channel_name,
            customer_id = %identity,
            chat_id = %service_sid,
            "channel created"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn creates_channel_with_empty_message_list() -> anyhow::Result<()> {
        let db = MockDb::memory();
        let service = ChannelService::new(db.clone());

        let record = service.get_or_create("lobby", "visitor_1", "IS1").await?;

        assert_eq!(
            record,
            ChannelRecord {
                name: "lobby".to_string(),
                customer_id: "visitor_1".to_string(),
                chat_id: "IS1".to_string(),
            }
        );
        assert_eq!(db.read("channel_lobby_messages").await, Some(json!([])));
        Ok(())
    }

    #[tokio::test]
    async fn first_identity_wins() -> anyhow::Result<()> {
        let db = MockDb::memory();
        let service = ChannelService::new(db.clone());

        service.get_or_create("lobby", "first", "IS1").await?;
        let second = service.get_or_create("lobby", "second", "IS2").await?;

        assert_eq!(second.customer_id, "first");
        assert_eq!(second.chat_id, "IS1");
        let stored = db.read("channel_lobby").await;
        assert_eq!(
            stored,
            Some(json!({"name": "lobby", "customer_id": "first", "chat_id": "IS1"}))
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn racing_creators_all_see_one_identity() -> anyhow::Result<()> {
        let db = MockDb::memory();
        let service = ChannelService::new(db.clone());

        let handles = (0..64)
            .map(|index| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .get_or_create("contested", &format!("visitor_{index}"), "IS1")
                        .await
                })
            })
            .collect::<Vec<_>>();
        let mut customer_ids = std::collections::BTreeSet::new();
        for handle in handles {
            customer_ids.insert(handle.await??.customer_id);
        }

        assert_eq!(customer_ids.len(), 1);
        let stored = db
            .read("channel_contested")
            .await
            .ok_or_else(|| anyhow::anyhow!("channel missing"))?;
        let winner = customer_ids
            .first()
            .ok_or_else(|| anyhow::anyhow!("no caller returned"))?;
        assert_eq!(stored["customer_id"], winner.as_str());
        assert_eq!(db.read("channel_contested_messages").await, Some(json!([])));
        Ok(())
    }

    #[tokio::test]
    async fn existing_channel_keeps_its_messages() -> anyhow::Result<()> {
        let db = MockDb::memory();
        let service = ChannelService::new(db.clone());
        service.get_or_create("lobby", "first", "IS1").await?;
        db.write("channel_lobby_messages", json!(["hello"])).await;

        service.get_or_create("lobby", "first", "IS1").await?;

        assert_eq!(db.read("channel_lobby_messages").await, Some(json!(["hello"])));
        Ok(())
    }

    #[tokio::test]
    async fn rejects_blank_channel_name() {
        let service = ChannelService::new(MockDb::memory());
        let result = service.get_or_create(" ", "visitor", "IS1").await;
        assert!(matches!(result, Err(ChannelError::EmptyName)));
    }
}
