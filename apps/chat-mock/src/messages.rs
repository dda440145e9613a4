use std::sync::Arc;

use serde_json::Value;

use crate::db::{DbError, MockDb, channel_key, channel_messages_key, read_as};
use crate::dialog::{DialogOutcome, DialogRequest, DialogResolver};
use crate::types::{ChannelRecord, MessageRecord};

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("channel {0} not found")]
    ChannelNotFound(String),
    #[error(transparent)]
    Db(#[from] DbError),
}

#[derive(Clone)]
pub struct MessageService {
    db: MockDb,
    resolver: Arc<dyn DialogResolver>,
}

impl MessageService {
    #[must_use]
    pub fn new(db: MockDb, resolver: Arc<dyn DialogResolver>) -> Self {
        Self { db, resolver }
    }

    /// Last element of the channel's message list, `None` when the list is
    /// empty or was never created.
    pub async fn latest(&self, channel_name: &str) -> Result<Option<Value>, MessageError> {
        let store = self.db.lock().await;
        let mut messages = read_as::<Vec<Value>>(&**store, &channel_messages_key(channel_name))?
            .unwrap_or_default();
        tracing::debug!(channel = %channel_name, count = messages.len(), "latest message read");
        Ok(messages.pop())
    }

    /// Appends a message authored by the channel's customer, then hands it to
    /// the dialog resolver exactly once.
    pub async fn append(
        &self,
        channel_name: &str,
        body: &str,
    ) -> Result<MessageRecord, MessageError> {
        let message = {
            let mut store = self.db.lock().await;
            let channel = read_as::<ChannelRecord>(&**store, &channel_key(channel_name))?
                .ok_or_else(|| MessageError::ChannelNotFound(channel_name.to_string()))?;

            let key = channel_messages_key(channel_name);
            let mut messages = read_as::<Vec<Value>>(&**store, &key)?.unwrap_or_default();
            let message = MessageRecord {
                body: body.to_string(),
                author: channel.customer_id,
            };
            messages.push(serde_json::to_value(&message).map_err(|source| DbError::Encode {
                key: key.clone(),
                source,
            })?);
            let count = messages.len();
            store.write(&key, Value::Array(messages));
            tracing::info!(
                channel = %channel_name,
                author = %message.author,
                count,
                "message appended"
            );
            message
        };

        let request = DialogRequest {
            channel_name: channel_name.to_string(),
            body: message.body.clone(),
            author: message.author.clone(),
        };
        match self.resolver.resolve(request).await {
            Ok(DialogOutcome::Replied(reply)) => {
                tracing::debug!(channel = %channel_name, reply = %reply.body, "dialog resolver replied");
            }
            Ok(DialogOutcome::NoMatch) => {}
            Err(error) => {
                tracing::warn!(channel = %channel_name, reason = %error, "dialog resolver failed");
            }
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::channels::ChannelService;
    use crate::dialog::recording::RecordingDialogResolver;

    fn service_with(db: &MockDb, resolver: &RecordingDialogResolver) -> MessageService {
        MessageService::new(db.clone(), Arc::new(resolver.clone()))
    }

    #[tokio::test]
    async fn latest_returns_last_stored_element() -> anyhow::Result<()> {
        let db = MockDb::memory();
        db.write("channel_lobby_messages", json!(["first", "second", "last"]))
            .await;
        let service = service_with(&db, &RecordingDialogResolver::default());

        assert_eq!(service.latest("lobby").await?, Some(json!("last")));
        Ok(())
    }

    #[tokio::test]
    async fn latest_is_none_for_empty_or_missing_list() -> anyhow::Result<()> {
        let db = MockDb::memory();
        db.write("channel_empty_messages", json!([])).await;
        let service = service_with(&db, &RecordingDialogResolver::default());

        assert_eq!(service.latest("empty").await?, None);
        assert_eq!(service.latest("missing").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn appends_in_order_with_customer_as_author() -> anyhow::Result<()> {
        let db = MockDb::memory();
        let resolver = RecordingDialogResolver::default();
        ChannelService::new(db.clone())
            .get_or_create("lobby", "customer_7", "IS1")
            .await?;
        let service = service_with(&db, &resolver);

        for body in ["one", "two", "three"] {
            service.append("lobby", body).await?;
        }

        let stored = db.read("channel_lobby_messages").await;
        assert_eq!(
            stored,
            Some(json!([
                {"body": "one", "author": "customer_7"},
                {"body": "two", "author": "customer_7"},
                {"body": "three", "author": "customer_7"},
            ]))
        );
        assert_eq!(resolver.calls().await.len(), 3);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_appends_are_all_kept() -> anyhow::Result<()> {
        const APPENDS: usize = 200;
        let db = MockDb::memory();
        let resolver = RecordingDialogResolver::default();
        ChannelService::new(db.clone())
            .get_or_create("busy", "customer_1", "IS1")
            .await?;
        let service = service_with(&db, &resolver);

        let handles = (0..APPENDS)
            .map(|index| {
                let service = service.clone();
                tokio::spawn(async move { service.append("busy", &index.to_string()).await })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await??;
        }

        let stored = db
            .read("channel_busy_messages")
            .await
            .ok_or_else(|| anyhow::anyhow!("message list missing"))?;
        let bodies = stored
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("message list is not an array"))?
            .iter()
            .filter_map(|message| message.get("body").and_then(Value::as_str))
            .collect::<std::collections::BTreeSet<_>>();
        assert_eq!(bodies.len(), APPENDS);
        assert_eq!(resolver.calls().await.len(), APPENDS);
        Ok(())
    }

    #[tokio::test]
    async fn invokes_resolver_once_with_channel_name() -> anyhow::Result<()> {
        let db = MockDb::memory();
        db.write("channel_chanel", json!({"customer_id": "123"})).await;
        let resolver = RecordingDialogResolver::default();

        service_with(&db, &resolver).append("chanel", "hello").await?;

        let calls = resolver.calls().await;
        assert_eq!(
            calls,
            vec![DialogRequest {
                channel_name: "chanel".to_string(),
                body: "hello".to_string(),
                author: "123".to_string(),
            }]
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_message_list_starts_empty() -> anyhow::Result<()> {
        let db = MockDb::memory();
        db.write("channel_chanel", json!({})).await;

        let message = service_with(&db, &RecordingDialogResolver::default())
            .append("chanel", "hello")
            .await?;

        assert_eq!(message.author, "");
        assert_eq!(
            db.read("channel_chanel_messages").await,
            Some(json!([{"body": "hello", "author": ""}]))
        );
        Ok(())
    }

    #[tokio::test]
    async fn resolver_failure_does_not_fail_append() -> anyhow::Result<()> {
        let db = MockDb::memory();
        db.write("channel_lobby", json!({"customer_id": "c"})).await;
        let resolver = RecordingDialogResolver::failing();

        let message = service_with(&db, &resolver).append("lobby", "hi").await?;

        assert_eq!(message.body, "hi");
        assert_eq!(resolver.calls().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_channel_is_not_found_and_skips_resolver() {
        let db = MockDb::memory();
        let resolver = RecordingDialogResolver::default();

        let result = service_with(&db, &resolver).append("ghost", "hi").await;

        assert!(matches!(result, Err(MessageError::ChannelNotFound(ref name)) if name == "ghost"));
        assert!(resolver.calls().await.is_empty());
        assert_eq!(db.read("channel_ghost_messages").await, None);
    }
}
