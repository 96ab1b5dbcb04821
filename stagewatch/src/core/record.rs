//! Canonical result records and ingestion-boundary normalization.
//!
//! Backend stage payloads are duck-typed JSON with multiple aliases per
//! concept (`date` vs `update_date`, `description` vs `summary`, ...). They
//! are normalized here, exactly once, into `ResultRecord`; diffing and
//! fingerprinting operate only on the canonical form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field aliases accepted for the record name, in priority order.
const NAME_ALIASES: [&str; 3] = ["name", "product_name", "component"];
/// Field aliases accepted for the record title.
const TITLE_ALIASES: [&str; 3] = ["title", "headline", "label"];
/// Field aliases accepted for the record date.
const DATE_ALIASES: [&str; 4] = ["date", "update_date", "updated_at", "published"];
/// Field aliases accepted for the record description.
const DESCRIPTION_ALIASES: [&str; 4] = ["description", "desc", "summary", "details"];
/// Field aliases accepted for the severity/impact rating.
const SEVERITY_ALIASES: [&str; 2] = ["severity", "impact"];

/// One canonical, normalized result item from a stage payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// The item's name.
    #[serde(default)]
    pub name: String,
    /// The item's title or headline.
    #[serde(default)]
    pub title: String,
    /// The item's date, kept verbatim as reported by the backend.
    #[serde(default)]
    pub date: String,
    /// Free-form description text.
    #[serde(default)]
    pub description: String,
    /// Severity or impact rating, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Remaining fields carried through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, Value>,
}

impl ResultRecord {
    /// Creates a record from the four identity fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        date: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            date: date.into(),
            description: description.into(),
            severity: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Sets the severity rating.
    #[must_use]
    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    /// Normalizes one raw payload object into a canonical record.
    ///
    /// Aliased fields are resolved in priority order; fields that match no
    /// alias are preserved in `extra`. Non-object input yields an empty
    /// record so a malformed item degrades to "unrecognizable" rather than
    /// aborting the whole payload.
    #[must_use]
    pub fn normalize(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::default();
        };

        let name = first_string(obj, &NAME_ALIASES);
        let title = first_string(obj, &TITLE_ALIASES);
        let date = first_string(obj, &DATE_ALIASES);
        let description = first_string(obj, &DESCRIPTION_ALIASES);
        let severity = {
            let s = first_string(obj, &SEVERITY_ALIASES);
            if s.is_empty() { None } else { Some(s) }
        };

        let mut extra = serde_json::Map::new();
        for (key, value) in obj {
            let consumed = NAME_ALIASES.contains(&key.as_str())
                || TITLE_ALIASES.contains(&key.as_str())
                || DATE_ALIASES.contains(&key.as_str())
                || DESCRIPTION_ALIASES.contains(&key.as_str())
                || SEVERITY_ALIASES.contains(&key.as_str());
            if !consumed {
                extra.insert(key.clone(), value.clone());
            }
        }

        Self {
            name,
            title,
            date,
            description,
            severity,
            extra,
        }
    }

    /// Normalizes a raw payload array into canonical records.
    ///
    /// Non-array input yields an empty list.
    #[must_use]
    pub fn normalize_list(raw: &Value) -> Vec<Self> {
        raw.as_array()
            .map(|items| items.iter().map(Self::normalize).collect())
            .unwrap_or_default()
    }
}

fn first_string(obj: &serde_json::Map<String, Value>, aliases: &[&str]) -> String {
    for alias in aliases {
        if let Some(value) = obj.get(*alias) {
            match value {
                Value::String(s) if !s.is_empty() => return s.clone(),
                Value::Number(n) => return n.to_string(),
                _ => {}
            }
        }
    }
    String::new()
}
