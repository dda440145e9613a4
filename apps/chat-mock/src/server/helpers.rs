use serde::de::DeserializeOwned;

use super::ApiError;

/// Decodes a JSON request body regardless of the declared content type; the
/// client SDKs under test do not always send one.
pub(super) fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MalformedBody(
            "request body is required".to_string(),
        ));
    }
    serde_json::from_slice(body).map_err(|error| ApiError::MalformedBody(error.to_string()))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Body {
        message: String,
    }

    #[test]
    fn parses_json_without_content_type() {
        let parsed = parse_json_body::<Body>(br#"{"message":"hi"}"#);
        assert!(matches!(parsed, Ok(Body { ref message }) if message == "hi"));
    }

    #[test]
    fn empty_and_invalid_bodies_are_malformed() {
        assert!(matches!(
            parse_json_body::<Body>(b"  "),
            Err(ApiError::MalformedBody(message)) if message == "request body is required"
        ));
        assert!(matches!(
            parse_json_body::<Body>(b"{\"text\":\"hi\"}"),
            Err(ApiError::MalformedBody(message)) if message.contains("message")
        ));
    }
}
