//! Argument decoding and schema generation shared by the built-in operations.

use mtk_host::OperationError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// JSON Schema for an operation's parameter struct.
pub(crate) fn schema_of<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).expect("schema serialization should not fail")
}

/// Decode call arguments, reporting shape errors as invalid parameters.
pub(crate) fn parse_args<T: DeserializeOwned>(args: serde_json::Value) -> Result<T, OperationError> {
    serde_json::from_value(args).map_err(|e| OperationError::InvalidParameters(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Sample {
        /// Required field.
        name: String,
        #[serde(default)]
        count: Option<u32>,
    }

    #[test]
    fn test_schema_lists_properties() {
        let schema = schema_of::<Sample>();
        assert!(schema["properties"]["name"].is_object());
        assert_eq!(schema["required"][0], "name");
    }

    #[test]
    fn test_parse_args_errors_are_invalid_parameters() {
        let ok: Sample = parse_args(serde_json::json!({"name": "x", "count": 2})).unwrap();
        assert_eq!(ok.name, "x");
        assert_eq!(ok.count, Some(2));

        let err = parse_args::<Sample>(serde_json::json!({"count": 2})).unwrap_err();
        assert!(matches!(err, OperationError::InvalidParameters(_)));
    }
}
