//! Per-call JSON Schema parameter validation and default application.

use mcphub_domain::HubError;
use serde_json::Value;

/// Walk the schema's `properties`/`default` pairs and fill in any missing
/// top-level or nested-object field before validation runs, per the
/// "defaults applied before dispatch" contract.
pub fn apply_defaults(schema: &Value, data: &mut Value) {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    let Some(obj) = data.as_object_mut() else {
        return;
    };
    for (key, prop_schema) in properties {
        if !obj.contains_key(key) {
            if let Some(default) = prop_schema.get("default") {
                obj.insert(key.clone(), default.clone());
                continue;
            }
        }
        if let Some(entry) = obj.get_mut(key) {
            apply_defaults(prop_schema, entry);
        }
    }
}

/// Validate `data` against `schema`, honoring the `additionalProperties`
/// policy: when it is `false`, unknown properties are rejected; when the
/// schema omits it (the common case) or sets it `true`, unknowns pass
/// through untouched — this function never silently strips data, callers
/// that want stripping should filter with [`strip_additional_properties`]
/// before calling this.
pub fn validate_params(schema: &Value, data: &Value) -> Result<(), HubError> {
    let compiled = jsonschema::JSONSchema::compile(schema)
        .map_err(|e| HubError::Config(format!("invalid input schema: {e}")))?;

    if let Err(errors) = compiled.validate(data) {
        let messages: Vec<String> = errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        return Err(HubError::InvalidParams(messages.join("; ")));
    }
    Ok(())
}

/// Remove properties not declared in `schema.properties` when
/// `additionalProperties` is explicitly `false`. Returns the data
/// unchanged when additional properties are allowed.
pub fn strip_additional_properties(schema: &Value, data: Value) -> Value {
    let deny_additional = schema.get("additionalProperties") == Some(&Value::Bool(false));
    if !deny_additional {
        return data;
    }
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return data;
    };
    match data {
        Value::Object(obj) => {
            Value::Object(obj.into_iter().filter(|(k, _)| properties.contains_key(k)).collect())
        }
        other => other,
    }
}
