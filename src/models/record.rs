//! Record data structure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// One collected item: an ordered mapping of field name to scalar value.
///
/// Field order is kept for display and serialization, but equality is
/// structural: two records are equal when they hold the same fields with
/// the same values, regardless of order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Record(Map<String, Value>);

impl Record {
    /// Build a record from `(field, value)` pairs.
    ///
    /// Fails if any value is not a string, number or bool.
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<Map<String, Value>>();
        Self::try_from(map)
    }

    /// Look up a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Look up a field and render it as display text.
    pub fn text(&self, field: &str) -> Option<String> {
        self.0.get(field).map(scalar_text)
    }

    /// Iterate fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for Record {
    type Error = AppError;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        if let Some((field, _)) = map
            .iter()
            .find(|(_, v)| !matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_)))
        {
            return Err(AppError::validation(format!(
                "record field '{field}' must be a string, number or bool"
            )));
        }
        Ok(Self(map))
    }
}

impl From<Record> for Map<String, Value> {
    fn from(record: Record) -> Self {
        record.0
    }
}

/// Render a scalar the way it appears in notification text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equality_ignores_field_order() {
        let a = Record::from_pairs([("id", "1"), ("title", "Bike")]).unwrap();
        let b = Record::from_pairs([("title", "Bike"), ("id", "1")]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_inequality_on_value() {
        let a = Record::from_pairs([("id", "1")]).unwrap();
        let b = Record::from_pairs([("id", "2")]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_nested_values() {
        let err = Record::from_pairs([("tags", json!(["a", "b"]))]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let parsed: std::result::Result<Record, _> =
            serde_json::from_value(json!({ "id": "1", "extra": null }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_serialization_keeps_field_order() {
        let record = Record::from_pairs([
            ("query", json!("bikes")),
            ("price", json!(120)),
            ("sold", json!(false)),
        ])
        .unwrap();

        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"query":"bikes","price":120,"sold":false}"#);

        let back: Record = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_text_rendering() {
        let record = Record::from_pairs([
            ("title", json!("Bike")),
            ("price", json!(120.5)),
            ("sold", json!(true)),
        ])
        .unwrap();

        assert_eq!(record.text("title").as_deref(), Some("Bike"));
        assert_eq!(record.text("price").as_deref(), Some("120.5"));
        assert_eq!(record.text("sold").as_deref(), Some("true"));
        assert_eq!(record.text("missing"), None);
    }
}
