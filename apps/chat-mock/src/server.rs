use std::{collections::HashMap, sync::Arc};

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::{
    assistants::{AssistantError, AssistantService, PhoneNumberService},
    autopilot::{AutopilotError, AutopilotService, decode_encoded_schema},
    channels::{ChannelError, ChannelService},
    chat_token::{ChatTokenDecoder, ChatTokenError, UnverifiedChatTokenDecoder},
    config::Config,
    db::{ASSISTANT_ID_KEY, CUSTOMER_ID_KEY, MockDb},
    dialog::DialogResolver,
    identity::IdentitySynthesizer,
    messages::{MessageError, MessageService},
    sdk_asset::{CHAT_SDK_CONTENT_TYPE, CHAT_SDK_PATH, render_chat_sdk},
    types::{
        AutopilotUpdateRequest, ChannelResponse, ChannelTokenQuery, CreateAssistantForm,
        CreatedAssistant, LatestMessageResponse, PostMessageRequest, PostedMessageResponse,
        ProvisionedPhoneNumber, SchemaResponse, ServiceChannelResponse,
    },
};

mod helpers;

use helpers::parse_json_body;

#[derive(Clone)]
pub struct AppState {
    config: Config,
    db: MockDb,
    token_decoder: Arc<dyn ChatTokenDecoder>,
    channels: ChannelService,
    messages: MessageService,
    autopilot: AutopilotService,
    assistants: AssistantService,
    phone_numbers: PhoneNumberService,
    started_at: chrono::DateTime<Utc>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: Config,
        db: MockDb,
        ids: Arc<dyn IdentitySynthesizer>,
        resolver: Arc<dyn DialogResolver>,
    ) -> Self {
        Self {
            config,
            channels: ChannelService::new(db.clone()),
            messages: MessageService::new(db.clone(), resolver),
            autopilot: AutopilotService::new(db.clone()),
            assistants: AssistantService::new(db.clone(), ids.clone()),
            phone_numbers: PhoneNumberService::new(db.clone(), ids),
            token_decoder: Arc::new(UnverifiedChatTokenDecoder),
            db,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: String,
    uptime_seconds: i64,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route(CHAT_SDK_PATH, get(get_chat_sdk))
        .route("/js_api/channels/:channel", get(get_channel))
        .route(
            "/js_api/channels/:channel/messages",
            get(get_latest_message).post(post_message),
        )
        .route("/autopilot/update", post(update_autopilot_schema))
        .route("/autopilot/schema", get(get_autopilot_schema))
        .route(
            "/v2/Services/:assistant_id/Channels/:visitor_id",
            get(get_service_channel),
        )
        .route("/v1/Assistants", post(create_assistant))
        .route(
            "/:api_v/Accounts/:account_id/IncomingPhoneNumbers.json",
            post(provision_phone_number),
        )
        .route("/internal/v1/store", get(get_store_snapshot))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = (Utc::now() - state.started_at).num_seconds();
    Json(HealthResponse {
        status: "ok",
        service: state.config.service_name,
        uptime_seconds,
    })
}

async fn get_chat_sdk(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, CHAT_SDK_CONTENT_TYPE)],
        render_chat_sdk(&state.config.sdk_host),
    )
}

async fn get_channel(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<ChannelTokenQuery>,
) -> Result<Json<ChannelResponse>, ApiError> {
    let token = query
        .token
        .ok_or_else(|| ApiError::from_token(ChatTokenError::MissingToken))?;
    let claims = state
        .token_decoder
        .decode(&token)
        .map_err(ApiError::from_token)?;
    state
        .channels
        .get_or_create(&channel, claims.identity(), claims.service_sid())
        .await
        .map_err(ApiError::from_channel)?;
    Ok(Json(ChannelResponse { name: channel }))
}

async fn get_latest_message(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<Json<LatestMessageResponse>, ApiError> {
    let message = state
        .messages
        .latest(&channel)
        .await
        .map_err(ApiError::from_message)?;
    Ok(Json(LatestMessageResponse { message }))
}

async fn post_message(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    body: Bytes,
) -> Result<Json<PostedMessageResponse>, ApiError> {
    let request: PostMessageRequest = parse_json_body(&body)?;
    let message = state
        .messages
        .append(&channel, &request.message)
        .await
        .map_err(ApiError::from_message)?;
    Ok(Json(PostedMessageResponse { message }))
}

async fn update_autopilot_schema(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: AutopilotUpdateRequest = parse_json_body(&body)?;
    let schema = decode_encoded_schema(&request.schema).map_err(ApiError::from_autopilot)?;
    state.autopilot.replace_schema(schema).await;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn get_autopilot_schema(State(state): State<AppState>) -> Json<SchemaResponse> {
    Json(SchemaResponse {
        schema: state.autopilot.schema().await,
    })
}

async fn get_service_channel(
    State(state): State<AppState>,
    Path((assistant_id, visitor_id)): Path<(String, String)>,
) -> Json<ServiceChannelResponse> {
    {
        let mut store = state.db.lock().await;
        store.write(ASSISTANT_ID_KEY, Value::String(assistant_id.clone()));
        store.write(CUSTOMER_ID_KEY, Value::String(visitor_id.clone()));
    }
    tracing::info!(
        assistant_id = %assistant_id,
        customer_id = %visitor_id,
        "service channel visited"
    );
    Json(ServiceChannelResponse {
        unique_name: "hello",
        sid: "hello_sid",
    })
}

async fn create_assistant(
    State(state): State<AppState>,
    form: Option<Form<CreateAssistantForm>>,
) -> Result<Json<CreatedAssistant>, ApiError> {
    let friendly_name = form.and_then(|Form(form)| form.friendly_name);
    let created = state
        .assistants
        .create(friendly_name)
        .await
        .map_err(ApiError::from_assistant)?;
    Ok(Json(created))
}

async fn provision_phone_number(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Json<ProvisionedPhoneNumber>, ApiError> {
    tracing::debug!(
        api_version = params.get("api_v").map_or("", String::as_str),
        account_id = params.get("account_id").map_or("", String::as_str),
        "incoming phone number requested"
    );
    let provisioned = state
        .phone_numbers
        .provision()
        .await
        .map_err(ApiError::from_assistant)?;
    Ok(Json(provisioned))
}

async fn get_store_snapshot(State(state): State<AppState>) -> Json<Value> {
    let entries = state.db.snapshot().await;
    Json(serde_json::json!({ "entries": entries }))
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    MalformedToken {
        reason_code: &'static str,
        message: String,
    },
    MalformedBody(String),
    Internal(String),
}

impl ApiError {
    fn from_token(error: ChatTokenError) -> Self {
        Self::MalformedToken {
            reason_code: error.code(),
            message: error.to_string(),
        }
    }

    fn from_channel(error: ChannelError) -> Self {
        match error {
            ChannelError::EmptyName => Self::MalformedBody(error.to_string()),
            ChannelError::Db(db_error) => Self::Internal(db_error.to_string()),
        }
    }

    fn from_message(error: MessageError) -> Self {
        match error {
            MessageError::ChannelNotFound(_) => Self::NotFound(error.to_string()),
            MessageError::Db(db_error) => Self::Internal(db_error.to_string()),
        }
    }

    fn from_autopilot(error: AutopilotError) -> Self {
        Self::MalformedBody(error.to_string())
    }

    fn from_assistant(error: AssistantError) -> Self {
        match error {
            AssistantError::ChatbotNotFound => Self::NotFound(error.to_string()),
            AssistantError::ChatbotNotObject | AssistantError::Db(_) => {
                Self::Internal(error.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "error": "not_found",
                    "message": message,
                })),
            )
                .into_response(),
            Self::MalformedToken {
                reason_code,
                message,
            } => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "malformed_token",
                    "message": message,
                    "reason_code": reason_code,
                })),
            )
                .into_response(),
            Self::MalformedBody(message) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "malformed_body",
                    "message": message,
                })),
            )
                .into_response(),
            Self::Internal(message) => {
                tracing::error!(reason = %message, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "error": "internal_error",
                        "message": message,
                    })),
                )
                    .into_response()
            }
        }
    }
}
