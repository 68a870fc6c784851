//! Verdict response schema
//!
//! A batch of k samples expects exactly the fields `example_1..example_k`,
//! each 0 or 1. Nothing else is accepted.

use contracts::ContractError;
use serde_json::{json, Map, Value};

/// Schema for one scoring batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSchema {
    k: usize,
}

impl ResponseSchema {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn len(&self) -> usize {
        self.k
    }

    pub fn is_empty(&self) -> bool {
        self.k == 0
    }

    fn key(i: usize) -> String {
        format!("example_{i}")
    }

    /// JSON schema handed to the client as a structured-output hint
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = (1..=self.k)
            .map(|i| (Self::key(i), json!({ "type": "integer", "enum": [0, 1] })))
            .collect();
        let required: Vec<String> = (1..=self.k).map(Self::key).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Parse a response into k verdict bits, in example order.
    ///
    /// The outermost `{...}` of `text` is taken as the JSON object, so code
    /// fences or prose around it are tolerated.
    pub fn parse(&self, text: &str) -> Result<Vec<u8>, ContractError> {
        let (start, end) = match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => (start, end),
            _ => return Err(ContractError::response_schema("no JSON object in response")),
        };
        let object: Map<String, Value> = serde_json::from_str(&text[start..=end])
            .map_err(|e| ContractError::response_schema(format!("invalid JSON: {e}")))?;

        if object.len() != self.k {
            return Err(ContractError::response_schema(format!(
                "expected {} fields, got {}",
                self.k,
                object.len()
            )));
        }

        (1..=self.k)
            .map(|i| {
                let key = Self::key(i);
                match object.get(&key).and_then(Value::as_u64) {
                    Some(bit @ (0 | 1)) => Ok(bit as u8),
                    Some(other) => Err(ContractError::response_schema(format!(
                        "'{key}' must be 0 or 1, got {other}"
                    ))),
                    None => Err(ContractError::response_schema(format!(
                        "missing or non-integer '{key}'"
                    ))),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_arity() {
        let schema = ResponseSchema::new(3);
        let verdicts = schema
            .parse(r#"{"example_1": 1, "example_2": 0, "example_3": 1}"#)
            .unwrap();
        assert_eq!(verdicts, vec![1, 0, 1]);
    }

    #[test]
    fn test_parse_rejects_k_plus_and_minus_one() {
        let schema = ResponseSchema::new(2);
        assert!(schema.parse(r#"{"example_1": 1}"#).is_err());
        assert!(schema
            .parse(r#"{"example_1": 1, "example_2": 0, "example_3": 1}"#)
            .is_err());
    }

    #[test]
    fn test_parse_rejects_probabilities_and_foreign_keys() {
        let schema = ResponseSchema::new(1);
        assert!(schema.parse(r#"{"example_1": 1, "prob_1": 0.9}"#).is_err());
        assert!(schema.parse(r#"{"sample_1": 1}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_non_binary_values() {
        let schema = ResponseSchema::new(1);
        assert!(matches!(
            schema.parse(r#"{"example_1": 2}"#),
            Err(ContractError::ResponseSchema { .. })
        ));
        assert!(schema.parse(r#"{"example_1": "1"}"#).is_err());
        assert!(schema.parse(r#"{"example_1": 0.5}"#).is_err());
    }

    #[test]
    fn test_parse_tolerates_fences() {
        let schema = ResponseSchema::new(1);
        let text = "Here you go:\n```json\n{\"example_1\": 0}\n```";
        assert_eq!(schema.parse(text).unwrap(), vec![0]);
    }

    #[test]
    fn test_parse_without_object() {
        assert!(ResponseSchema::new(1).parse("yes").is_err());
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = ResponseSchema::new(2).to_json_schema();
        assert_eq!(schema["required"], json!(["example_1", "example_2"]));
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["properties"]["example_2"]["enum"], json!([0, 1]));
    }
}
