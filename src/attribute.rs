//! Dynamic per-listing attribute model.
//!
//! Listings in the same industry do not share a fixed column set; each listing
//! carries its own key -> typed-value map. The typed union replaces an untyped
//! dynamic map so that filter derivation can branch on kind exhaustively.

use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Keys are unique per listing; insertion order is irrelevant.
pub type AttributeMap = BTreeMap<String, AttributeEntry>;

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    #[n(0)]
    Text(#[n(0)] String),
    #[n(1)]
    Number(#[n(0)] f64),
    #[n(2)]
    Select(#[n(0)] String),
    #[n(3)]
    MultiSelect(#[n(0)] Vec<String>),
    #[n(4)]
    Range(#[n(0)] f64),
    #[n(5)]
    Boolean(#[n(0)] bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Text,
    Number,
    Select,
    MultiSelect,
    Range,
    Boolean,
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Text(_) => AttributeKind::Text,
            AttributeValue::Number(_) => AttributeKind::Number,
            AttributeValue::Select(_) => AttributeKind::Select,
            AttributeValue::MultiSelect(_) => AttributeKind::MultiSelect,
            AttributeValue::Range(_) => AttributeKind::Range,
            AttributeValue::Boolean(_) => AttributeKind::Boolean,
        }
    }

    /// Build a value of the given kind from raw JSON, as submitted on the
    /// listing write surface. Returns None when the JSON shape does not fit
    /// the declared kind.
    pub fn from_json(kind: AttributeKind, raw: &serde_json::Value) -> Option<Self> {
        match kind {
            AttributeKind::Text => raw.as_str().map(|s| AttributeValue::Text(s.to_string())),
            AttributeKind::Number => raw.as_f64().map(AttributeValue::Number),
            AttributeKind::Select => raw.as_str().map(|s| AttributeValue::Select(s.to_string())),
            AttributeKind::MultiSelect => {
                let values = raw.as_array()?;
                let mut out = Vec::with_capacity(values.len());
                for value in values {
                    out.push(value.as_str()?.to_string());
                }
                Some(AttributeValue::MultiSelect(out))
            }
            AttributeKind::Range => raw.as_f64().map(AttributeValue::Range),
            AttributeKind::Boolean => raw.as_bool().map(AttributeValue::Boolean),
        }
    }
}

impl FromStr for AttributeKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(AttributeKind::Text),
            "number" => Ok(AttributeKind::Number),
            "select" => Ok(AttributeKind::Select),
            "multiselect" => Ok(AttributeKind::MultiSelect),
            "range" => Ok(AttributeKind::Range),
            "boolean" => Ok(AttributeKind::Boolean),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct AttributeEntry {
    #[n(0)]
    pub label: String,
    #[n(1)]
    pub value: AttributeValue,
    #[n(2)]
    pub unit: Option<String>,
    #[n(3)]
    pub filter_enabled: bool,
}

impl AttributeEntry {
    pub fn new(label: &str, value: AttributeValue) -> Self {
        Self {
            label: label.to_string(),
            value,
            unit: None,
            filter_enabled: false,
        }
    }
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }
    pub fn filterable(mut self) -> Self {
        self.filter_enabled = true;
        self
    }
}

/// Attribute keys are machine identifiers, not display labels.
pub fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrips_through_str() {
        for kind in [
            AttributeKind::Text,
            AttributeKind::Number,
            AttributeKind::Select,
            AttributeKind::MultiSelect,
            AttributeKind::Range,
            AttributeKind::Boolean,
        ] {
            let s = serde_json::to_value(kind).unwrap();
            let parsed: AttributeKind = s.as_str().unwrap().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn from_json_rejects_shape_mismatch() {
        let raw = serde_json::json!("HDPE");
        assert!(AttributeValue::from_json(AttributeKind::Number, &raw).is_none());
        assert!(AttributeValue::from_json(AttributeKind::Select, &raw).is_some());
    }

    #[test]
    fn key_validation() {
        assert!(valid_key("melt_flow_index"));
        assert!(valid_key("grade2"));
        assert!(!valid_key(""));
        assert!(!valid_key("Melt Flow"));
        assert!(!valid_key("color-code"));
    }

    #[test]
    fn entry_encoding() {
        let entry = AttributeEntry::new("Density", AttributeValue::Number(0.95))
            .with_unit("g/cm3")
            .filterable();

        let encoded = minicbor::to_vec(&entry).unwrap();
        let decoded: AttributeEntry = minicbor::decode(&encoded).unwrap();

        assert_eq!(entry, decoded);
    }
}
