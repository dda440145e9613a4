use std::sync::Arc;

use serde_json::Value;

use crate::db::{CHATBOT_KEY, DbError, MockDb, write_as};
use crate::identity::{
    IdentitySynthesizer, assistant_sid, assistant_unique_name, phone_number_sid,
};
use crate::types::{AssistantRecord, CreatedAssistant, ProvisionedPhoneNumber};

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("no assistant has been created yet")]
    ChatbotNotFound,
    #[error("stored chatbot record is not an object")]
    ChatbotNotObject,
    #[error(transparent)]
    Db(#[from] DbError),
}

#[derive(Clone)]
pub struct AssistantService {
    db: MockDb,
    ids: Arc<dyn IdentitySynthesizer>,
}

impl AssistantService {
    #[must_use]
    pub fn new(db: MockDb, ids: Arc<dyn IdentitySynthesizer>) -> Self {
        Self { db, ids }
    }

    /// Replaces the chatbot record with a freshly minted assistant.
    pub async fn create(
        &self,
        friendly_name: Option<String>,
    ) -> Result<CreatedAssistant, AssistantError> {
        let sid = assistant_sid(&self.ids.md5());
        let unique_name = assistant_unique_name(&sid, &self.ids.imei());
        let record = AssistantRecord {
            friendly_name,
            assistant_sid: sid.clone(),
            unique_name: unique_name.clone(),
        };

        let mut store = self.db.lock().await;
        write_as(&mut **store, CHATBOT_KEY, &record)?;
        tracing::info!(assistant_sid = %sid, unique_name = %unique_name, "assistant created");
        Ok(CreatedAssistant { sid, unique_name })
    }
}

#[derive(Clone)]
pub struct PhoneNumberService {
    db: MockDb,
    ids: Arc<dyn IdentitySynthesizer>,
}

impl PhoneNumberService {
    #[must_use]
    pub fn new(db: MockDb, ids: Arc<dyn IdentitySynthesizer>) -> Self {
        Self { db, ids }
    }

    /// Attaches a new number to the existing chatbot, keeping every field
    /// already stored on it.
    pub async fn provision(&self) -> Result<ProvisionedPhoneNumber, AssistantError> {
        let mut store = self.db.lock().await;
        let mut chatbot = match store.read(CHATBOT_KEY) {
            Some(Value::Object(chatbot)) => chatbot,
            Some(_) => return Err(AssistantError::ChatbotNotObject),
            None => return Err(AssistantError::ChatbotNotFound),
        };

        let sid = phone_number_sid(&self.ids.md5());
        let phone_number = self.ids.cell_phone();
        chatbot.insert(
            "phone_number".to_string(),
            Value::String(phone_number.clone()),
        );
        chatbot.insert("phone_number_sid".to_string(), Value::String(sid.clone()));
        store.write(CHATBOT_KEY, Value::Object(chatbot));
        tracing::info!(phone_number_sid = %sid, phone_number = %phone_number, "phone number provisioned");

        Ok(ProvisionedPhoneNumber { phone_number, sid })
    }
}
