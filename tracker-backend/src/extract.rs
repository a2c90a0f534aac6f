//! Request extractors and body validation
//!

use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;
use validator::{Validate, ValidationErrors};

use crate::error::{FieldErrors, WebError};

pub(crate) const REQUIRED: &str = "This field is required.";

/// JSON object request body. Malformed JSON is a plain 400, fields of the
/// wrong type are reported per field.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await?;
        let object = match &value {
            Value::Object(object) => object,
            other => {
                debug!("Rejecting non-object body: {}", other);
                return Err(WebError::bad_request("Invalid data. Expected a JSON object."));
            }
        };

        match T::deserialize(&value) {
            Ok(payload) => Ok(Payload(payload)),
            Err(err) => Err(WebError::validation(type_errors::<T>(object, &err))),
        }
    }
}

/// Works out which fields stopped `T` deserializing by trying each on its own.
fn type_errors<T: DeserializeOwned>(
    object: &Map<String, Value>,
    err: &serde_json::Error,
) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (name, value) in object {
        let single: Map<String, Value> = [(name.clone(), value.clone())].into_iter().collect();
        if let Err(field_err) = T::deserialize(&Value::Object(single)) {
            fields.insert(name.clone(), vec![format!("Incorrect type. {}", field_err)]);
        }
    }
    if fields.is_empty() {
        fields.insert("non_field_errors".to_string(), vec![err.to_string()]);
    }
    fields
}

/// Deserializes an optional string with surrounding whitespace removed.
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(|val| val.trim().to_string()))
}

/// Query string whose rejections render as a [`WebError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(WebError))]
pub struct QueryParams<T>(pub T);

/// Numeric record id from the path. Anything unparseable is a 404, the same
/// as an id that doesn't exist.
pub struct RecordId(pub i32);

impl<S: Send + Sync> FromRequestParts<S> for RecordId {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state).await?;
        Ok(RecordId(id))
    }
}

/// Flattens validator output into per-field messages.
pub(crate) fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|err| match &err.message {
                    Some(message) => message.to_string(),
                    None => err.code.to_string(),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

/// A client write body. Read-only fields are absent from implementors, so
/// serde drops them if a client sends them.
pub(crate) trait WritePayload: Validate {
    /// Required fields that were not supplied.
    fn missing_required(&self) -> Vec<&'static str>;

    /// Checks that need more than field-local validator rules.
    fn extra_checks(&self, _fields: &mut FieldErrors) {}

    /// Validates the body. `partial` skips the required-field check (PATCH).
    fn check(&self, partial: bool) -> Result<(), WebError> {
        let mut fields = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => field_errors(&errors),
        };
        if !partial {
            for field in self.missing_required() {
                fields
                    .entry(field.to_string())
                    .or_default()
                    .push(REQUIRED.to_string());
            }
        }
        self.extra_checks(&mut fields);

        if fields.is_empty() {
            Ok(())
        } else {
            Err(WebError::validation(fields))
        }
    }
}
