use serde::{Deserialize, Serialize};

/// One row of the `messages` relation.
///
/// `id` is assigned by the store and never set by callers. `text` maps a nullable
/// `text` column, so rows written by other clients may carry `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    pub fn new(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: Some(text.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_as_flat_id_text_object() {
        let value = serde_json::to_value(Message::new(7, "Existing")).unwrap();
        assert_eq!(value, json!({"id": 7, "text": "Existing"}));
    }

    #[test]
    fn null_or_missing_text_decodes_as_none() {
        let from_null: Message = serde_json::from_value(json!({"id": 1, "text": null})).unwrap();
        let from_missing: Message = serde_json::from_value(json!({"id": 2})).unwrap();
        assert_eq!(from_null.text, None);
        assert_eq!(from_missing.text, None);
    }

    #[test]
    fn rejects_row_without_id() {
        assert!(serde_json::from_value::<Message>(json!({"text": "orphan"})).is_err());
    }
}
