use crate::config::PropertyMap;
use crate::errors::RelayError;
use serde_json::{Map, Value, json};

/// The reduced-field record shape the relay accepts on inserts.
#[derive(Clone, Debug, PartialEq)]
pub struct SimplifiedRecord {
    pub term: String,
    pub definition: String,
    pub category: String,
    pub synonyms: Vec<String>,
}

impl SimplifiedRecord {
    /// Validates a request body against the simplified record shape.
    ///
    /// Missing fields are collected so the caller sees every problem in
    /// a single round trip instead of one field at a time.
    pub fn from_body(body: &Value) -> Result<Self, RelayError> {
        let record = body.as_object().ok_or_else(|| {
            RelayError::Validation("Request body must be a JSON object.".to_string())
        })?;

        let mut missing = Vec::new();
        let term = required_string(record, "Term", &mut missing);
        let definition = required_string(record, "Definition", &mut missing);
        let category = required_string(record, "Category", &mut missing);

        if !missing.is_empty() {
            return Err(RelayError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let synonyms = match record.get("Synonyms") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| {
                    value.as_str().map(str::to_string).ok_or_else(|| {
                        RelayError::Validation(
                            "Synonyms must be an array of strings.".to_string(),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(RelayError::Validation(
                    "Synonyms must be an array.".to_string(),
                ));
            }
        };

        Ok(SimplifiedRecord {
            term,
            definition,
            category,
            synonyms,
        })
    }

    /// Translates the record into the upstream page-creation payload:
    /// term -> title, definition -> rich text, category -> select,
    /// synonyms -> multi-select (empty list when absent).
    ///
    /// Property names come from the injected [`PropertyMap`]; the target
    /// collection schema decides them, not this code.
    pub fn to_page_payload(&self, database_id: &str, properties: &PropertyMap) -> Value {
        let mut props = Map::new();
        props.insert(
            properties.term.clone(),
            json!({ "title": [{ "text": { "content": self.term } }] }),
        );
        props.insert(
            properties.definition.clone(),
            json!({ "rich_text": [{ "text": { "content": self.definition } }] }),
        );
        props.insert(
            properties.category.clone(),
            json!({ "select": { "name": self.category } }),
        );
        props.insert(
            properties.synonyms.clone(),
            json!({
                "multi_select": self
                    .synonyms
                    .iter()
                    .map(|name| json!({ "name": name }))
                    .collect::<Vec<_>>()
            }),
        );

        json!({
            "parent": { "database_id": database_id },
            "properties": props,
        })
    }
}

fn required_string(
    record: &Map<String, Value>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match record.get(field).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => {
            missing.push(field);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_complete_record() {
        let body = json!({
            "Term": "Foo",
            "Definition": "Bar",
            "Category": "General",
            "Synonyms": ["baz", "qux"],
        });
        let record = SimplifiedRecord::from_body(&body).unwrap();
        assert_eq!(record.term, "Foo");
        assert_eq!(record.definition, "Bar");
        assert_eq!(record.category, "General");
        assert_eq!(record.synonyms, vec!["baz", "qux"]);
    }

    #[test]
    fn absent_synonyms_default_to_empty() {
        let body = json!({ "Term": "Foo", "Definition": "Bar", "Category": "General" });
        let record = SimplifiedRecord::from_body(&body).unwrap();
        assert!(record.synonyms.is_empty());
    }

    #[test]
    fn missing_fields_are_all_named() {
        let body = json!({ "Term": "Foo" });
        let err = SimplifiedRecord::from_body(&body).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Definition"));
        assert!(message.contains("Category"));
        assert!(!message.contains("Term"));
    }

    #[test]
    fn blank_fields_count_as_missing() {
        let body = json!({ "Term": "  ", "Definition": "Bar", "Category": "General" });
        let err = SimplifiedRecord::from_body(&body).unwrap_err();
        assert!(err.to_string().contains("Term"));
    }

    #[test]
    fn scalar_synonyms_are_rejected() {
        let body = json!({
            "Term": "Foo",
            "Definition": "Bar",
            "Category": "General",
            "Synonyms": "notanarray",
        });
        let err = SimplifiedRecord::from_body(&body).unwrap_err();
        assert!(err.to_string().contains("Synonyms must be an array"));
    }

    #[test]
    fn non_string_synonym_elements_are_rejected() {
        let body = json!({
            "Term": "Foo",
            "Definition": "Bar",
            "Category": "General",
            "Synonyms": ["ok", 42],
        });
        assert!(SimplifiedRecord::from_body(&body).is_err());
    }

    #[test]
    fn payload_uses_configured_property_names() {
        let record = SimplifiedRecord {
            term: "Foo".to_string(),
            definition: "Bar".to_string(),
            category: "General".to_string(),
            synonyms: Vec::new(),
        };
        let properties = PropertyMap {
            term: "Name".to_string(),
            definition: "Meaning".to_string(),
            category: "Kind".to_string(),
            synonyms: "AlsoKnownAs".to_string(),
        };
        let payload = record.to_page_payload("db-123", &properties);

        assert_eq!(payload["parent"]["database_id"], "db-123");
        assert_eq!(
            payload["properties"]["Name"]["title"][0]["text"]["content"],
            "Foo"
        );
        assert_eq!(
            payload["properties"]["Meaning"]["rich_text"][0]["text"]["content"],
            "Bar"
        );
        assert_eq!(payload["properties"]["Kind"]["select"]["name"], "General");
        // No synonyms still produces the property, with an empty list.
        assert_eq!(
            payload["properties"]["AlsoKnownAs"]["multi_select"],
            json!([])
        );
    }
}
