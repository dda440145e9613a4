use serde_json::{Map, Value};

use crate::db::{MockDb, SCHEMA_KEY};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AutopilotError {
    #[error("schema must be a JSON-encoded string")]
    SchemaNotEncoded,
    #[error("schema is not valid JSON: {0}")]
    SchemaNotJson(String),
    #[error("schema must decode to a JSON object")]
    SchemaNotObject,
}

/// Second decoding stage for `/autopilot/update`: the request's `schema` field
/// carries the schema as a JSON string rather than an inline object.
pub fn decode_encoded_schema(schema: &Value) -> Result<Map<String, Value>, AutopilotError> {
    let Value::String(encoded) = schema else {
        return Err(AutopilotError::SchemaNotEncoded);
    };
    match serde_json::from_str::<Value>(encoded) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AutopilotError::SchemaNotObject),
        Err(error) => Err(AutopilotError::SchemaNotJson(error.to_string())),
    }
}

#[derive(Clone)]
pub struct AutopilotService {
    db: MockDb,
}

impl AutopilotService {
    #[must_use]
    pub fn new(db: MockDb) -> Self {
        Self { db }
    }

    pub async fn replace_schema(&self, schema: Map<String, Value>) {
        let entries = schema.len();
        self.db.write(SCHEMA_KEY, Value::Object(schema)).await;
        tracing::info!(entries, "autopilot schema replaced");
    }

    pub async fn schema(&self) -> Option<Value> {
        self.db.read(SCHEMA_KEY).await
    }
}
