pub const CHAT_SDK_PATH: &str = "/sdk/js/chat/v3.3/twilio-chat.min.js";
pub const CHAT_SDK_CONTENT_TYPE: &str = "text/javascript;charset=utf-8";

const CHAT_SDK_TEMPLATE: &str = include_str!("../assets/chat-sdk.js");
const HOST_PLACEHOLDER: &str = "{{host}}";

#[must_use]
pub fn render_chat_sdk(host: &str) -> String {
    CHAT_SDK_TEMPLATE.replace(HOST_PLACEHOLDER, host)
}
