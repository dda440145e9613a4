use async_trait::async_trait;
use serde_json::Value;

use crate::db::{CHATBOT_KEY, DbError, MockDb, SCHEMA_KEY, channel_messages_key, read_as};
use crate::types::MessageRecord;

pub const DEFAULT_BOT_AUTHOR: &str = "autopilot";

/// Context handed to the resolver for every message a customer posts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogRequest {
    pub channel_name: String,
    pub body: String,
    pub author: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogOutcome {
    Replied(MessageRecord),
    NoMatch,
}

#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{0}")]
    Unavailable(String),
}

/// Produces automated replies. Called once per posted message; its outcome
/// never changes the response the client receives.
#[async_trait]
pub trait DialogResolver: Send + Sync {
    async fn resolve(&self, request: DialogRequest) -> Result<DialogOutcome, DialogError>;
}

/// Answers from the schema last posted to `/autopilot/update`: a message whose
/// body matches a schema key gets that key's value appended as the bot reply.
#[derive(Clone)]
pub struct SchemaDialogResolver {
    db: MockDb,
}

impl SchemaDialogResolver {
    #[must_use]
    pub fn new(db: MockDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DialogResolver for SchemaDialogResolver {
    async fn resolve(&self, request: DialogRequest) -> Result<DialogOutcome, DialogError> {
        let mut store = self.db.lock().await;

        let Some(Value::Object(schema)) = store.read(SCHEMA_KEY) else {
            return Ok(DialogOutcome::NoMatch);
        };
        let Some(reply) = lookup_reply(&schema, &request.body) else {
            tracing::debug!(channel = %request.channel_name, "no schema entry for message");
            return Ok(DialogOutcome::NoMatch);
        };

        let author = reply_author(store.read(CHATBOT_KEY).as_ref());
        let message = MessageRecord {
            body: reply,
            author,
        };

        let key = channel_messages_key(&request.channel_name);
        let mut messages = read_as::<Vec<Value>>(&**store, &key)?.unwrap_or_default();
        messages.push(serde_json::to_value(&message).map_err(|source| DbError::Encode {
            key: key.clone(),
            source,
        })?);
        store.write(&key, Value::Array(messages));
        tracing::info!(
            channel = %request.channel_name,
            author = %message.author,
            "autopilot reply appended"
        );
        Ok(DialogOutcome::Replied(message))
    }
}

/// The chatbot's `unique_name`; records provisioned before any assistant was
/// created may lack it.
fn reply_author(chatbot: Option<&Value>) -> String {
    match chatbot.map(|chatbot| chatbot.get("unique_name")) {
        Some(Some(Value::String(name))) if !name.is_empty() => name.clone(),
        Some(_) => {
            tracing::warn!("stored chatbot has no unique_name, replying as default author");
            DEFAULT_BOT_AUTHOR.to_string()
        }
        None => DEFAULT_BOT_AUTHOR.to_string(),
    }
}

fn lookup_reply(schema: &serde_json::Map<String, Value>, body: &str) -> Option<String> {
    let wanted = body.trim();
    let value = schema.get(wanted).or_else(|| {
        schema
            .iter()
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(wanted))
            .map(|(_, value)| value)
    })?;
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
