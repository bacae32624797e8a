use axum::http::HeaderValue;

use crate::types::SlackCommand;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("invalid Content-Type header")]
    InvalidContentType,
    #[error("expected application/x-www-form-urlencoded body, got {0}")]
    UnsupportedContentType(String),
    #[error(transparent)]
    Form(#[from] serde_urlencoded::de::Error),
}

/// Decode a slash-command body. A missing `Content-Type` is tolerated; any
/// other media type than a form is rejected.
pub fn parse_command(
    content_type: Option<&HeaderValue>,
    body: &[u8],
) -> Result<SlackCommand, ParseError> {
    if let Some(value) = content_type {
        let media_type = value
            .to_str()
            .map_err(|_| ParseError::InvalidContentType)?
            .split(';')
            .next()
            .unwrap_or("")
            .trim();
        if !media_type.eq_ignore_ascii_case(FORM_CONTENT_TYPE) {
            return Err(ParseError::UnsupportedContentType(media_type.to_string()));
        }
    }

    Ok(serde_urlencoded::from_bytes(body)?)
}

pub fn verify_token(expected: &str, provided: &str) -> bool {
    expected == provided
}
