use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatTokenClaims {
    pub grants: ChatGrants,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatGrants {
    pub identity: String,
    pub chat: ChatServiceGrant,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatServiceGrant {
    pub service_sid: String,
}

impl ChatTokenClaims {
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.grants.identity
    }

    #[must_use]
    pub fn service_sid(&self) -> &str {
        &self.grants.chat.service_sid
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ChatTokenError {
    #[error("token query parameter is required")]
    MissingToken,
    #[error("token must have header and payload segments")]
    MalformedSegments,
    #[error("token {segment} is not valid base64url")]
    InvalidEncoding { segment: &'static str },
    #[error("token claims are invalid: {0}")]
    InvalidClaims(String),
}

impl ChatTokenError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::MalformedSegments => "malformed_segments",
            Self::InvalidEncoding { .. } => "invalid_encoding",
            Self::InvalidClaims(_) => "invalid_claims",
        }
    }
}

/// Extracts routing claims from a client access token.
pub trait ChatTokenDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<ChatTokenClaims, ChatTokenError>;
}

/// Reads the payload segment and never checks the signature or `alg`.
///
/// Clients under test mint tokens with throwaway keys or `alg: none`, so this
/// decoder only exists to attribute requests inside the mock.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnverifiedChatTokenDecoder;

#[derive(Debug, Deserialize)]
struct TokenHeader {
    #[serde(default)]
    alg: Option<String>,
}

impl ChatTokenDecoder for UnverifiedChatTokenDecoder {
    fn decode(&self, token: &str) -> Result<ChatTokenClaims, ChatTokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ChatTokenError::MissingToken);
        }
        let mut segments = token.split('.');
        let (Some(header), Some(payload)) = (segments.next(), segments.next()) else {
            return Err(ChatTokenError::MalformedSegments);
        };
        if header.is_empty() || payload.is_empty() {
            return Err(ChatTokenError::MalformedSegments);
        }

        let header_bytes = decode_segment(header, "header")?;
        let header: TokenHeader = serde_json::from_slice(&header_bytes)
            .map_err(|error| ChatTokenError::InvalidClaims(format!("header: {error}")))?;
        tracing::debug!(
            alg = header.alg.as_deref().unwrap_or("unset"),
            "decoding chat token without verification"
        );

        let payload_bytes = decode_segment(payload, "payload")?;
        serde_json::from_slice::<ChatTokenClaims>(&payload_bytes)
            .map_err(|error| ChatTokenError::InvalidClaims(error.to_string()))
    }
}

fn decode_segment(segment: &str, name: &'static str) -> Result<Vec<u8>, ChatTokenError> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|_| ChatTokenError::InvalidEncoding { segment: name })
}
