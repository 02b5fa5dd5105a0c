//! Thin adapter over `jsonata-rs`, isolating the rest of the crate from its
//! exact API surface. If the crate's evaluation entry point changes shape,
//! only this file needs to follow.

use serde_json::Value;

/// Evaluate a JSONata expression against `input`, returning the shaped
/// JSON value. Errors (bad expression syntax, evaluation failure) are
/// collapsed to a single message string for the caller to fall back on.
pub fn evaluate(expression: &str, input: &Value) -> Result<Value, String> {
    let jsonata = jsonata_rs::JsonAta::new(expression).map_err(|e| e.to_string())?;
    let input_str = input.to_string();
    let result = jsonata
        .evaluate(Some(&input_str), None)
        .map_err(|e| e.to_string())?;
    serde_json::from_str(&result.serialize(false)).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evaluates_simple_path_expression() {
        let input = json!({ "result": { "temperature": 21 } });
        let shaped = evaluate("result.temperature", &input).unwrap();
        assert_eq!(shaped, json!(21));
    }

    #[test]
    fn invalid_expression_is_reported_as_error() {
        let input = json!({});
        assert!(evaluate("{{{not valid", &input).is_err());
    }
}
