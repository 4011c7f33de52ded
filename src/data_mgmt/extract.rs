use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("could not parse payload as JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("no value at JSON path '{0}'")]
    PathNotFound(String),
    #[error("value at JSON path '{0}' is not numeric")]
    NotNumeric(String),
    #[error("could not parse '{0}' as a number")]
    ParseNumber(String),
}

/// Pull a numeric value out of an MQTT payload.
///
/// With an empty `json_path` the whole payload is parsed as a number.
/// Otherwise the payload is parsed as JSON and walked along the
/// '/'-separated path; numeric segments index into arrays. Numbers
/// serialized as JSON strings are accepted.
pub fn numeric_from_payload(payload: &str, json_path: &str) -> Result<f64, ExtractError> {
    let payload = payload.trim();
    if json_path.is_empty() {
        return payload
            .parse::<f64>()
            .map_err(|_| ExtractError::ParseNumber(payload.into()));
    }

    let root: Value = serde_json::from_str(payload)?;
    let mut node = &root;
    for segment in json_path.split('/') {
        node = match node {
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i)),
            Value::Object(map) => map.get(segment),
            _ => None,
        }
        .ok_or_else(|| ExtractError::PathNotFound(json_path.into()))?;
    }

    match node {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ExtractError::NotNumeric(json_path.into())),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| ExtractError::ParseNumber(s.clone())),
        _ => Err(ExtractError::NotNumeric(json_path.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_number_payload() {
        assert_eq!(numeric_from_payload("55.2\n", "").unwrap(), 55.2);
        assert!(numeric_from_payload("hello", "").is_err());
    }

    #[test]
    fn nested_object_path() {
        let payload = r#"{"BAT": {"soc": 78, "voltage": 51.4}}"#;
        assert_eq!(numeric_from_payload(payload, "BAT/soc").unwrap(), 78.0);
        assert_eq!(numeric_from_payload(payload, "BAT/voltage").unwrap(), 51.4);
    }

    #[test]
    fn array_index_path() {
        let payload = r#"{"cells": [3.31, 3.29, 3.3]}"#;
        assert_eq!(numeric_from_payload(payload, "cells/1").unwrap(), 3.29);
        assert!(numeric_from_payload(payload, "cells/9").is_err());
    }

    #[test]
    fn string_encoded_number() {
        let payload = r#"{"soc": "42.5"}"#;
        assert_eq!(numeric_from_payload(payload, "soc").unwrap(), 42.5);
    }

    #[test]
    fn missing_path_is_an_error() {
        let payload = r#"{"soc": 42}"#;
        assert!(matches!(
            numeric_from_payload(payload, "missing"),
            Err(ExtractError::PathNotFound(_))
        ));
    }

    #[test]
    fn non_numeric_leaf_is_an_error() {
        let payload = r#"{"state": {"charging": true}}"#;
        assert!(matches!(
            numeric_from_payload(payload, "state/charging"),
            Err(ExtractError::NotNumeric(_))
        ));
    }
}
