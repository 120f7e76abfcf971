//! Fixture Loader
//!
//! Reads the local JSON dataset and normalizes every item into the raw
//! record shape understood by [`Record::from_raw`](crate::record::Record::from_raw).
//!
//! Two layouts are accepted: a bare array of records, and a spreadsheet
//! export `{config, records}` whose rows are free-form column maps.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::error::{LookupError, Result};
use crate::record::{text_field, RawRecord};

/// Canonical raw keys and the normalized column names that map onto them.
const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("spiritCode", &["spiritcode"]),
    (
        "hotelName",
        &[
            "hotelname",
            "hotel",
            "propertyname",
            "property",
            "projektname",
            "projectname",
            "assetname",
            "standortname",
            "locationname",
            "site",
        ],
    ),
    ("region", &["region"]),
    ("status", &["status", "projektstatus", "pipelinestatus"]),
    ("city", &["city", "ort", "stadt", "locationcity"]),
    ("country", &["country", "land", "locationcountry"]),
    ("address", &["address", "adresse", "street", "strasse", "locationaddress"]),
];

const NAME_SUFFIXES: &[&str] = &["name", "kontaktname", "contactname"];
const PHONE_SUFFIXES: &[&str] = &["phone", "telefon", "tel"];
const EMAIL_SUFFIXES: &[&str] = &["e-mail", "e mail", "email", "mail"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ExportConfig {
    selected_columns: Vec<String>,
    email_columns: Vec<String>,
    field_mapping: HashMap<String, String>,
}

// == Load ==
/// Reads and normalizes a fixture file.
///
/// A missing file or invalid JSON is reported as `DataUnavailable`.
pub fn load_fixture(path: &Path) -> Result<Vec<RawRecord>> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        LookupError::DataUnavailable(format!("fixture {} not readable: {}", path.display(), err))
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|err| {
        LookupError::DataUnavailable(format!("fixture {} is not valid JSON: {}", path.display(), err))
    })?;
    let records = parse_fixture(value)?;
    info!("Loaded {} fixture rows from {}", records.len(), path.display());
    Ok(records)
}

/// Normalizes an already-parsed fixture document.
pub fn parse_fixture(value: Value) -> Result<Vec<RawRecord>> {
    let (config, items) = match value {
        Value::Array(items) => (ExportConfig::default(), items),
        Value::Object(mut doc) => {
            let config = doc
                .remove("config")
                .and_then(|c| serde_json::from_value(c).ok())
                .unwrap_or_default();
            match doc.remove("records") {
                Some(Value::Array(items)) => (config, items),
                None => (config, Vec::new()),
                Some(_) => {
                    return Err(LookupError::DataUnavailable(
                        "fixture 'records' is not a list".to_string(),
                    ))
                }
            }
        }
        _ => {
            return Err(LookupError::DataUnavailable(
                "fixture has an unexpected layout".to_string(),
            ))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) if obj.contains_key("fields") => Some(from_export_row(&obj, &config)),
            Value::Object(obj) => Some(obj),
            _ => None,
        })
        .collect())
}

// == Export Rows ==
fn from_export_row(item: &Map<String, Value>, config: &ExportConfig) -> RawRecord {
    let empty = Map::new();
    let raw_fields = item.get("fields").and_then(Value::as_object).unwrap_or(&empty);

    let mut order: Vec<String> = if config.selected_columns.is_empty() {
        raw_fields.keys().cloned().collect()
    } else {
        config.selected_columns.clone()
    };
    for column in raw_fields.keys() {
        if !order.contains(column) {
            order.push(column.clone());
        }
    }
    let fields: Vec<(String, Option<String>)> = order
        .iter()
        .map(|column| (column.clone(), text_field(raw_fields, column)))
        .collect();
    let field = |column: Option<&String>| -> Option<String> {
        let column = column?;
        fields.iter().find(|(c, _)| c == column).and_then(|(_, v)| v.clone())
    };

    let mapping = derive_field_mapping(&order, &config.field_mapping);

    let spirit_code = text_field(item, "spiritCode")
        .or_else(|| field(mapping.get("spiritCode")))
        .unwrap_or_default();
    let display = text_field(item, "displayValue").or_else(|| field(mapping.get("hotelName")));

    let emails: Vec<(String, String)> = match item.get("emails").and_then(Value::as_object) {
        Some(explicit) => explicit
            .keys()
            .filter_map(|label| text_field(explicit, label).map(|email| (label.clone(), email)))
            .collect(),
        None => config
            .email_columns
            .iter()
            .filter_map(|column| field(Some(column)).map(|email| (column.clone(), email)))
            .collect(),
    };

    let contacts: Vec<Value> = emails
        .iter()
        .map(|(label, email)| {
            let base = strip_email_suffix(label);
            let base = if base.is_empty() { label.clone() } else { base };
            let role = find_related_field(&fields, label, &["role"]).unwrap_or(base);
            let name = find_related_field(&fields, label, NAME_SUFFIXES).unwrap_or_else(|| role.clone());
            let phone = find_related_field(&fields, label, PHONE_SUFFIXES);
            json!({"role": role, "name": name, "email": email, "phone": phone})
        })
        .collect();

    let mapped: Vec<&String> = mapping.values().collect();
    let mut meta = Map::new();
    for (column, value) in &fields {
        let Some(value) = value else { continue };
        if mapped.contains(&column) || emails.iter().any(|(label, _)| label == column) {
            continue;
        }
        if normalize_key(column).starts_with("meta") {
            meta.insert(derive_meta_key(column), Value::String(value.clone()));
        }
    }

    let mut raw = RawRecord::new();
    raw.insert("spiritCode".into(), Value::String(spirit_code));
    if let Some(display) = display {
        raw.insert("hotelName".into(), Value::String(display));
    }
    for key in ["region", "status", "city", "country", "address"] {
        if let Some(value) = field(mapping.get(key)) {
            raw.insert(key.into(), Value::String(value));
        }
    }
    raw.insert("contacts".into(), Value::Array(contacts));
    raw.insert("meta".into(), Value::Object(meta));
    raw
}

/// Resolves which column feeds each canonical key.
///
/// Explicit mappings win; remaining keys are matched by alias. Without a
/// display column the first unused column that is not a phone or email
/// column is taken.
fn derive_field_mapping(columns: &[String], explicit: &HashMap<String, String>) -> HashMap<String, String> {
    let mut mapping: HashMap<String, String> = HashMap::new();
    for (key, column) in explicit {
        let canonical = if key == "displayField" { "hotelName" } else { key.as_str() };
        mapping.insert(canonical.to_string(), column.clone());
    }

    for (key, aliases) in FIELD_ALIASES {
        if mapping.contains_key(*key) {
            continue;
        }
        let found = columns.iter().find(|column| {
            !mapping.values().any(|used| used == *column) && aliases.contains(&normalize_key(column).as_str())
        });
        if let Some(column) = found {
            mapping.insert((*key).to_string(), column.clone());
        }
    }

    if !mapping.contains_key("hotelName") {
        let found = columns.iter().find(|column| {
            let normalized = normalize_key(column);
            !mapping.values().any(|used| used == *column)
                && !normalized.ends_with("phone")
                && !normalized.ends_with("telefon")
                && !normalized.contains("mail")
        });
        if let Some(column) = found {
            mapping.insert("hotelName".to_string(), column.clone());
        }
    }

    mapping
}

/// Finds a sibling column sharing the email column's base label, e.g.
/// `GM Name` for `GM Email`.
fn find_related_field(
    fields: &[(String, Option<String>)],
    source: &str,
    suffixes: &[&str],
) -> Option<String> {
    let base = normalize_key(&strip_email_suffix(source));
    if base.is_empty() {
        return None;
    }
    fields.iter().find_map(|(label, value)| {
        let value = value.as_ref()?;
        let normalized = normalize_key(label);
        (label != source
            && normalized.starts_with(&base)
            && suffixes.iter().any(|suffix| normalized.ends_with(suffix)))
        .then(|| value.clone())
    })
}

/// Lowercases and drops everything but ASCII letters and digits.
fn normalize_key(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

fn strip_email_suffix(label: &str) -> String {
    let mut stripped = label;
    for suffix in EMAIL_SUFFIXES {
        let Some(cut) = label.len().checked_sub(suffix.len()) else { continue };
        if label.is_char_boundary(cut) && label[cut..].eq_ignore_ascii_case(suffix) {
            stripped = &label[..cut];
            break;
        }
    }
    stripped
        .trim_end_matches([' ', '_', '.', '-'])
        .trim_matches([' ', '-', '_', ':'])
        .to_string()
}

/// Turns `Meta Owner Email` into `ownerEmail`.
fn derive_meta_key(header: &str) -> String {
    let trimmed = header.trim();
    let without_prefix = match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("meta") => &trimmed[4..],
        _ => trimmed,
    };
    let parts: Vec<&str> = without_prefix
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect();
    let Some((first, rest)) = parts.split_first() else {
        return "metaField".to_string();
    };

    let mut key = lower_first(first);
    for part in rest {
        key.push_str(&upper_first(part));
    }
    key
}

fn lower_first(part: &str) -> String {
    let mut chars = part.chars();
    chars
        .next()
        .map(|c| c.to_ascii_lowercase().to_string() + chars.as_str())
        .unwrap_or_default()
}

fn upper_first(part: &str) -> String {
    let mut chars = part.chars();
    chars
        .next()
        .map(|c| c.to_ascii_uppercase().to_string() + chars.as_str())
        .unwrap_or_default()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use std::io::Write;

    #[test]
    fn test_legacy_array_passes_through() {
        let rows = parse_fixture(json!([
            {"spiritCode": "ZRH001", "hotelName": "Hyatt Regency Zurich",
             "contacts": [{"role": "GM", "name": "Max", "email": "max@hyatt.com"}]},
            "garbage"
        ]))
        .unwrap();

        assert_eq!(rows.len(), 1);
        let record = Record::from_raw(&rows[0]).unwrap();
        assert_eq!(record.contacts()[0].email.as_deref(), Some("max@hyatt.com"));
    }

    #[test]
    fn test_export_rows_are_mapped_by_alias() {
        let rows = parse_fixture(json!({
            "config": {
                "selectedColumns": ["Spirit Code", "Hotel", "Ort", "Land"],
                "emailColumns": ["GM Email"]
            },
            "records": [{
                "fields": {
                    "Spirit Code": "MUC010",
                    "Hotel": "Munich Central",
                    "Ort": "Munich",
                    "Land": "DE",
                    "GM Email": "gm@muc.example",
                    "GM Name": "Anna Berg",
                    "GM Phone": "+49 89 1",
                    "Meta Owner Group": "Acme"
                }
            }]
        }))
        .unwrap();

        let record = Record::from_raw(&rows[0]).unwrap();
        assert_eq!(record.spirit_code(), "MUC010");
        assert_eq!(record.display_name(), "Munich Central");
        assert_eq!(record.city(), Some("Munich"));
        assert_eq!(record.country(), Some("DE"));

        let contact = &record.contacts()[0];
        assert_eq!(contact.role, "GM");
        assert_eq!(contact.name, "Anna Berg");
        assert_eq!(contact.email.as_deref(), Some("gm@muc.example"));
        assert_eq!(contact.phone.as_deref(), Some("+49 89 1"));

        assert_eq!(record.meta()["ownerGroup"], json!("Acme"));
    }

    #[test]
    fn test_explicit_field_mapping_wins() {
        let rows = parse_fixture(json!({
            "config": {"fieldMapping": {"spiritCode": "Code", "displayField": "Name"}},
            "records": [{"fields": {"Code": "ams1", "Name": "Canal House", "Hotel": "ignored"}}]
        }))
        .unwrap();

        let record = Record::from_raw(&rows[0]).unwrap();
        assert_eq!(record.spirit_code(), "ams1");
        assert_eq!(record.display_name(), "Canal House");
    }

    #[test]
    fn test_explicit_emails_override_columns() {
        let rows = parse_fixture(json!({
            "records": [{
                "spiritCode": "VIE002",
                "displayValue": "Vienna Opera",
                "fields": {"Sales Mail": "unused@x"},
                "emails": {"Sales Mail": "sales@vie.example"}
            }]
        }))
        .unwrap();

        let record = Record::from_raw(&rows[0]).unwrap();
        assert_eq!(record.display_name(), "Vienna Opera");
        assert_eq!(record.contacts()[0].role, "Sales");
        assert_eq!(record.contacts()[0].email.as_deref(), Some("sales@vie.example"));
    }

    #[test]
    fn test_records_must_be_a_list() {
        let result = parse_fixture(json!({"records": {"a": 1}}));
        assert!(matches!(result, Err(LookupError::DataUnavailable(_))));
        assert!(parse_fixture(json!("text")).is_err());
    }

    #[test]
    fn test_load_fixture_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"spiritCode": "LON123", "hotelName": "London Tower"}}]"#).unwrap();

        let rows = load_fixture(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_unavailable() {
        let result = load_fixture(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(LookupError::DataUnavailable(_))));
    }

    #[test]
    fn test_strip_email_suffix() {
        assert_eq!(strip_email_suffix("GM Email"), "GM");
        assert_eq!(strip_email_suffix("Sales-E-Mail"), "Sales");
        assert_eq!(strip_email_suffix("Revenue_mail"), "Revenue");
        assert_eq!(strip_email_suffix("Owner"), "Owner");
    }

    #[test]
    fn test_derive_meta_key() {
        assert_eq!(derive_meta_key("Meta Owner Group"), "ownerGroup");
        assert_eq!(derive_meta_key("meta_brand"), "brand");
        assert_eq!(derive_meta_key("Meta"), "metaField");
    }
}
