use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub body: String,
    pub author: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantRecord {
    pub friendly_name: Option<String>,
    pub assistant_sid: String,
    pub unique_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreatedAssistant {
    pub sid: String,
    pub unique_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProvisionedPhoneNumber {
    pub phone_number: String,
    pub sid: String,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AutopilotUpdateRequest {
    pub schema: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateAssistantForm {
    #[serde(rename = "FriendlyName")]
    pub friendly_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelTokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct LatestMessageResponse {
    pub message: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct PostedMessageResponse {
    pub message: MessageRecord,
}

#[derive(Debug, Serialize)]
pub struct ServiceChannelResponse {
    pub unique_name: &'static str,
    pub sid: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub schema: Option<Value>,
}
