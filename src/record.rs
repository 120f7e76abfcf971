//! Record Model
//!
//! Canonical, immutable representation of a Spirit site and its contacts,
//! built through a validating factory from loosely-typed raw input.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{LookupError, Result};

/// Loosely-typed key/value row as produced by a dataset loader or a remote service.
pub type RawRecord = Map<String, Value>;

/// Raw keys consumed by the factory; everything else is kept as metadata.
const KNOWN_KEYS: &[&str] = &[
    "spiritCode",
    "hotelName",
    "displayName",
    "region",
    "status",
    "city",
    "country",
    "address",
    "location",
    "contacts",
    "meta",
];

// == Contact ==
/// A contact person attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub role: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Contact {
    fn from_raw(raw: &RawRecord) -> Self {
        Self {
            role: text_field(raw, "role").unwrap_or_default(),
            name: text_field(raw, "name").unwrap_or_default(),
            email: text_field(raw, "email"),
            phone: text_field(raw, "phone"),
        }
    }
}

// == Record ==
/// One lookup entity, identified by its case-insensitive Spirit Code.
///
/// There are no setters: records are shared by reference between the cache
/// and result sets, so an update is a replacement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    spirit_code: String,
    #[serde(skip)]
    key: String,
    display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    meta: BTreeMap<String, Value>,
    contacts: Vec<Contact>,
}

impl Record {
    // == Factory ==
    /// Validates raw input and constructs a record.
    ///
    /// Fails with `MalformedRecord` when the Spirit Code is missing or blank.
    /// The display name falls back to the code when absent.
    pub fn from_raw(raw: &RawRecord) -> Result<Self> {
        let spirit_code = text_field(raw, "spiritCode").ok_or_else(|| {
            LookupError::MalformedRecord("missing or empty spiritCode".to_string())
        })?;

        let display_name = text_field(raw, "hotelName")
            .or_else(|| text_field(raw, "displayName"))
            .unwrap_or_else(|| spirit_code.clone());

        let location = raw.get("location").and_then(Value::as_object);
        let located = |key: &str| {
            text_field(raw, key).or_else(|| location.and_then(|loc| text_field(loc, key)))
        };

        let contacts: Vec<Contact> = raw
            .get("contacts")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(Contact::from_raw)
                    .collect()
            })
            .unwrap_or_default();

        let mut meta: BTreeMap<String, Value> = raw
            .get("meta")
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        for (key, value) in raw {
            if !KNOWN_KEYS.contains(&key.as_str()) && !value.is_null() {
                meta.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        Ok(Self {
            key: spirit_code.to_lowercase(),
            spirit_code,
            display_name,
            region: text_field(raw, "region"),
            country: located("country"),
            city: located("city"),
            address: located("address"),
            status: text_field(raw, "status"),
            meta,
            contacts,
        })
    }

    // == Accessors ==
    pub fn spirit_code(&self) -> &str {
        &self.spirit_code
    }

    /// Case-folded identity key used for equality, ordering and lookup.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn meta(&self) -> &BTreeMap<String, Value> {
        &self.meta
    }

    /// Contacts in source order.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// True when `code` names this record, ignoring case.
    pub fn has_code(&self, code: &str) -> bool {
        self.key == code.trim().to_lowercase()
    }

    // == Display Label ==
    /// Returns the label shown in result lists, e.g. `ZRH001 • Zurich House (Zurich, CH)`.
    pub fn display_label(&self) -> String {
        let location = [self.city.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        if location.is_empty() {
            format!("{} • {}", self.spirit_code, self.display_name)
        } else {
            format!("{} • {} ({})", self.spirit_code, self.display_name, location)
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

// == Utility Functions ==
/// Reads a scalar field as trimmed text; blank strings, nulls and containers yield `None`.
pub(crate) fn text_field(raw: &RawRecord, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_raw_full_record() {
        let record = Record::from_raw(&raw(json!({
            "spiritCode": "ZRH001",
            "hotelName": "Hyatt Regency Zurich",
            "region": "DACH",
            "status": "Open",
            "location": {"city": "Zurich", "country": "CH", "address": "Flughafenstrasse 1"},
            "contacts": [
                {"role": "GM", "name": "Max Muster", "email": "max@hyatt.com"},
                {"role": "DOSM", "name": "Eva", "phone": "+41 44"}
            ],
            "meta": {"brand": "Hyatt Regency"}
        })))
        .unwrap();

        assert_eq!(record.spirit_code(), "ZRH001");
        assert_eq!(record.key(), "zrh001");
        assert_eq!(record.display_name(), "Hyatt Regency Zurich");
        assert_eq!(record.city(), Some("Zurich"));
        assert_eq!(record.country(), Some("CH"));
        assert_eq!(record.address(), Some("Flughafenstrasse 1"));
        assert_eq!(record.contacts().len(), 2);
        assert_eq!(record.contacts()[0].email.as_deref(), Some("max@hyatt.com"));
        assert_eq!(record.contacts()[1].role, "DOSM");
        assert_eq!(record.meta()["brand"], json!("Hyatt Regency"));
    }

    #[test]
    fn test_missing_code_is_malformed() {
        let result = Record::from_raw(&raw(json!({"hotelName": "Nameless"})));
        assert!(matches!(result, Err(LookupError::MalformedRecord(_))));
    }

    #[test]
    fn test_blank_code_is_malformed() {
        let result = Record::from_raw(&raw(json!({"spiritCode": "   "})));
        assert!(matches!(result, Err(LookupError::MalformedRecord(_))));
    }

    #[test]
    fn test_display_name_falls_back_to_code() {
        let record = Record::from_raw(&raw(json!({"spiritCode": "LON123"}))).unwrap();
        assert_eq!(record.display_name(), "LON123");
    }

    #[test]
    fn test_unknown_fields_preserved_as_meta() {
        let record = Record::from_raw(&raw(json!({
            "spiritCode": "LON123",
            "metaOwner": "Jane",
            "rooms": 412,
            "note": null
        })))
        .unwrap();

        assert_eq!(record.meta()["metaOwner"], json!("Jane"));
        assert_eq!(record.meta()["rooms"], json!(412));
        assert!(!record.meta().contains_key("note"));
    }

    #[test]
    fn test_equality_is_case_insensitive_on_code() {
        let a = Record::from_raw(&raw(json!({"spiritCode": "zrh001", "hotelName": "A"}))).unwrap();
        let b = Record::from_raw(&raw(json!({"spiritCode": "ZRH001", "hotelName": "B"}))).unwrap();
        assert_eq!(a, b);
        assert!(a.has_code(" Zrh001 "));
    }

    #[test]
    fn test_display_label() {
        let record = Record::from_raw(&raw(json!({
            "spiritCode": "ZRH001",
            "hotelName": "Zurich House",
            "city": "Zurich",
            "country": "CH"
        })))
        .unwrap();
        assert_eq!(record.display_label(), "ZRH001 • Zurich House (Zurich, CH)");

        let bare = Record::from_raw(&raw(json!({"spiritCode": "X1", "hotelName": "Bare"}))).unwrap();
        assert_eq!(bare.display_label(), "X1 • Bare");
    }

    #[test]
    fn test_numeric_code_is_accepted() {
        let record = Record::from_raw(&raw(json!({"spiritCode": 4711}))).unwrap();
        assert_eq!(record.spirit_code(), "4711");
    }
}
