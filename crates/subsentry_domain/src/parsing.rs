use std::future::Future;

use serde_json::{Map, Value};
use thiserror::Error;

/// Field name to loosely-typed value, as returned by an extractor.
pub type RawFields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("an API credential is required")]
    MissingCredential,
    #[error("nothing to parse: {0} is empty")]
    EmptyInput(&'static str),
    #[error("extraction request failed: {0}")]
    Transport(String),
    #[error("extractor returned malformed output: {0}")]
    MalformedResponse(String),
    #[error("extractor declined the request: {0}")]
    Refused(String),
}

/// Remote extractor turning free text or a screenshot into subscription fields.
///
/// Implementations talk to a model over the network; the domain only awaits
/// the result and hands it to [`crate::normalize::normalize_fields`].
pub trait FieldParser: Send + Sync {
    fn parse_text(
        &self,
        text: &str,
        credential: &str,
    ) -> impl Future<Output = Result<RawFields, ParseError>> + Send;

    fn parse_image(
        &self,
        image: &[u8],
        credential: &str,
    ) -> impl Future<Output = Result<RawFields, ParseError>> + Send;
}

/// Reads a model reply that should contain a single JSON object.
pub fn fields_from_json(text: &str) -> Result<RawFields, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::MalformedResponse("empty response".into()));
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(ParseError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(err) => Err(ParseError::MalformedResponse(err.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
