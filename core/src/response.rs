//! Response decoding, including the one place list shapes are normalized.
//!
//! # Design
//! A list endpoint may answer with a bare JSON array, with a paginated
//! envelope `{"count", "next", "previous", "results": [...]}`, or with
//! `{"data": ...}` wrapping either of those. `normalize_list` folds all of
//! them into a `Page`; call sites never inspect the raw shape.
//!
//! An empty 2xx body decodes as JSON `null`, so operations whose response
//! type is `()` or `Option<_>` accept `204 No Content`.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::types::Page;

fn parse_body(response: &HttpResponse) -> Result<Value, ApiError> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Fold any accepted list shape into a page of raw values.
pub fn normalize_list(value: Value) -> Result<Page<Value>, ApiError> {
    match value {
        Value::Array(results) => Ok(Page {
            count: Some(results.len() as u64),
            next: None,
            previous: None,
            results,
        }),
        Value::Object(mut map) => {
            if let Some(Value::Array(results)) = map.remove("results") {
                let link = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
                return Ok(Page {
                    count: map.get("count").and_then(Value::as_u64).or(Some(results.len() as u64)),
                    next: link(map.get("next")),
                    previous: link(map.get("previous")),
                    results,
                });
            }
            match map.remove("data") {
                Some(inner @ (Value::Array(_) | Value::Object(_))) => normalize_list(inner),
                _ => Err(ApiError::DeserializationError(
                    "expected a list, a `results` array or a `data` member".to_string(),
                )),
            }
        }
        other => Err(ApiError::DeserializationError(format!(
            "expected a list response, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn decode_item<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    let response = response.error_for_status()?;
    from_value(parse_body(&response)?)
}

pub fn decode_page<T: DeserializeOwned>(response: HttpResponse) -> Result<Page<T>, ApiError> {
    let response = response.error_for_status()?;
    let page = normalize_list(parse_body(&response)?)?;
    let results = page
        .results
        .into_iter()
        .map(from_value)
        .collect::<Result<Vec<T>, _>>()?;
    Ok(Page {
        count: page.count,
        next: page.next,
        previous: page.previous,
        results,
    })
}

pub fn decode_list<T: DeserializeOwned>(response: HttpResponse) -> Result<Vec<T>, ApiError> {
    decode_page(response).map(|page| page.results)
}

/// Check the status and discard the body.
pub fn decode_empty(response: HttpResponse) -> Result<(), ApiError> {
    response.error_for_status().map(|_| ())
}
