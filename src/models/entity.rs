use std::fmt::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EndpointConfig;
use crate::domain::EntityId;

/// One option in a lookup dropdown.
///
/// `raw` keeps the backend entity untouched so a form can populate its own
/// fields from whatever else the record carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: EntityId,
    pub label: String,
    pub secondary: Option<String>,
    pub contact: Option<String>,
    pub raw: Value,
}

impl Suggestion {
    /// Single-line rendering: `label (secondary) · contact`.
    #[must_use]
    pub fn display_line(&self) -> String {
        let mut line = self.label.clone();
        if let Some(secondary) = &self.secondary {
            let _ = write!(line, " ({secondary})");
        }
        if let Some(contact) = &self.contact {
            let _ = write!(line, " · {contact}");
        }
        line
    }
}

/// Maps one endpoint's entity shape onto [`Suggestion`]s.
pub trait EntityMapper: Send + Sync {
    /// Key of the entity array in the response body.
    fn list_key(&self) -> &str;

    /// Returns `None` for entities that cannot be shown (no id or no label).
    fn to_suggestion(&self, raw: &Value) -> Option<Suggestion>;
}

/// Field-name driven mapper, built from an [`EndpointConfig`].
#[derive(Debug, Clone)]
pub struct FieldMapper {
    list_key: String,
    id_field: String,
    label_field: String,
    secondary_field: Option<String>,
    contact_field: Option<String>,
}

impl FieldMapper {
    #[must_use]
    pub fn new(list_key: impl Into<String>, label_field: impl Into<String>) -> Self {
        Self {
            list_key: list_key.into(),
            id_field: "id".to_string(),
            label_field: label_field.into(),
            secondary_field: None,
            contact_field: None,
        }
    }

    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    #[must_use]
    pub fn with_secondary(mut self, field: impl Into<String>) -> Self {
        self.secondary_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_contact(mut self, field: impl Into<String>) -> Self {
        self.contact_field = Some(field.into());
        self
    }
}

impl From<&EndpointConfig> for FieldMapper {
    fn from(endpoint: &EndpointConfig) -> Self {
        Self {
            list_key: endpoint.list_key.clone(),
            id_field: endpoint.id_field.clone(),
            label_field: endpoint.label_field.clone(),
            secondary_field: endpoint.secondary_field.clone(),
            contact_field: endpoint.contact_field.clone(),
        }
    }
}

fn text_field(raw: &Value, field: &str) -> Option<String> {
    match raw.get(field)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl EntityMapper for FieldMapper {
    fn list_key(&self) -> &str {
        &self.list_key
    }

    fn to_suggestion(&self, raw: &Value) -> Option<Suggestion> {
        let id = EntityId::from_json(raw.get(&self.id_field)?)?;
        let label = text_field(raw, &self.label_field)?;

        Some(Suggestion {
            id,
            label,
            secondary: self
                .secondary_field
                .as_deref()
                .and_then(|f| text_field(raw, f)),
            contact: self
                .contact_field
                .as_deref()
                .and_then(|f| text_field(raw, f)),
            raw: raw.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer_mapper() -> FieldMapper {
        FieldMapper::from(&EndpointConfig::customers())
    }

    #[test]
    fn maps_customer_fields() {
        let raw = json!({
            "id": 1,
            "customerName": "Acme Co",
            "company": "Acme Holdings",
            "phone": "555-0100",
            "email": "ops@acme.test"
        });

        let suggestion = customer_mapper().to_suggestion(&raw).unwrap();
        assert_eq!(suggestion.id, EntityId::from(1));
        assert_eq!(suggestion.label, "Acme Co");
        assert_eq!(suggestion.secondary.as_deref(), Some("Acme Holdings"));
        assert_eq!(suggestion.contact.as_deref(), Some("555-0100"));
        assert_eq!(suggestion.raw["email"], "ops@acme.test");
        assert_eq!(
            suggestion.display_line(),
            "Acme Co (Acme Holdings) · 555-0100"
        );
    }

    #[test]
    fn optional_fields_may_be_missing() {
        let raw = json!({"id": "C-9", "customerName": "  Solo  ", "company": ""});
        let suggestion = customer_mapper().to_suggestion(&raw).unwrap();
        assert_eq!(suggestion.label, "Solo");
        assert!(suggestion.secondary.is_none());
        assert!(suggestion.contact.is_none());
        assert_eq!(suggestion.display_line(), "Solo");
    }

    #[test]
    fn skips_entities_without_id_or_label() {
        let mapper = customer_mapper();
        assert!(mapper.to_suggestion(&json!({"customerName": "x"})).is_none());
        assert!(mapper.to_suggestion(&json!({"id": 3})).is_none());
        assert!(
            mapper
                .to_suggestion(&json!({"id": 3, "customerName": null}))
                .is_none()
        );
    }

    #[test]
    fn custom_id_field() {
        let mapper = FieldMapper::new("materials", "name")
            .with_id_field("materialId")
            .with_secondary("code")
            .with_contact("supplierPhone");
        let raw = json!({"materialId": 12, "name": "Steel bar", "code": "SB-12"});
        let suggestion = mapper.to_suggestion(&raw).unwrap();
        assert_eq!(suggestion.id.as_str(), "12");
        assert_eq!(suggestion.secondary.as_deref(), Some("SB-12"));
        assert!(suggestion.contact.is_none());
    }
}
