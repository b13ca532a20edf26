//! Tolerant parsing of registry files.
//!
//! Scraped registries disagree on key names and shapes. Every record is read
//! field by field: an unreadable optional field is dropped, a record without a
//! usable name is skipped, and only an unreadable file fails the registry.

use crate::error::LoadError;
use quxat_model::{AccreditationType, Location, RegistryRecord};
use serde_json::{Map, Value};
use std::path::Path;

const NAME_KEYS: &[&str] = &["name", "organization_name", "organizationName"];
const VERIFICATION_KEYS: &[&str] = &["verification_required", "verificationRequired"];
const SOURCE_URL_KEYS: &[&str] = &["source_url", "sourceUrl", "url"];
const SOURCE_NOTE_KEYS: &[&str] = &["source_note", "sourceNote", "note", "source"];
const LIST_KEYS: &[&str] = &["organizations", "entries", "records"];

/// A record left out of a registry, with its position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

/// Records parsed from one registry file.
#[derive(Debug, Clone, Default)]
pub struct ParsedRegistry {
    pub records: Vec<RegistryRecord>,
    pub skipped: Vec<SkippedRecord>,
}

/// Parse a registry document for one accreditation type.
pub fn parse_registry(
    accreditation_type: &AccreditationType,
    text: &str,
    path: &Path,
) -> Result<ParsedRegistry, LoadError> {
    let document: Value =
        serde_json::from_str(text).map_err(|e| LoadError::malformed(path, e.to_string()))?;

    let entries = match &document {
        Value::Array(entries) => entries,
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or_else(|| {
                LoadError::malformed(path, "expected an array or an object with an `organizations` array")
            })?,
        _ => {
            return Err(LoadError::malformed(
                path,
                "expected an array or an object with an `organizations` array",
            ))
        }
    };

    let mut parsed = ParsedRegistry::default();
    for (index, entry) in entries.iter().enumerate() {
        match parse_record(accreditation_type, entry) {
            Ok(record) => parsed.records.push(record),
            Err(reason) => parsed.skipped.push(SkippedRecord { index, reason }),
        }
    }

    Ok(parsed)
}

fn parse_record(accreditation_type: &AccreditationType, entry: &Value) -> Result<RegistryRecord, String> {
    let map = entry
        .as_object()
        .ok_or_else(|| "entry is not an object".to_string())?;

    let organization_name =
        first_text(map, NAME_KEYS).ok_or_else(|| "missing organization name".to_string())?;

    let location = map
        .get("location")
        .and_then(Value::as_object)
        .map(read_location)
        .or_else(|| Some(read_location(map)))
        .filter(|location| !location.is_empty());

    Ok(RegistryRecord {
        organization_name,
        location,
        verification_required: read_verification(map),
        source_url: first_text(map, SOURCE_URL_KEYS),
        source_note: first_text(map, SOURCE_NOTE_KEYS),
        accreditation_type: accreditation_type.clone(),
    })
}

fn read_location(map: &Map<String, Value>) -> Location {
    Location {
        city: first_text(map, &["city"]),
        state: first_text(map, &["state", "region", "province"]),
        country: first_text(map, &["country"]),
    }
}

/// Absent or unreadable flags fail closed to `true`.
fn read_verification(map: &Map<String, Value>) -> bool {
    let Some(value) = VERIFICATION_KEYS.iter().find_map(|key| map.get(*key)) else {
        return true;
    };

    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => !matches!(
            text.trim().to_lowercase().as_str(),
            "false" | "no" | "0"
        ),
        _ => true,
    }
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<ParsedRegistry, LoadError> {
        parse_registry(&AccreditationType::Jci, text, Path::new("jci.json"))
    }

    #[test]
    fn test_parse_flat_record() {
        let parsed = parse(
            r#"[{
                "name": "Apollo Hospitals Chennai",
                "city": "Chennai",
                "state": "Tamil Nadu",
                "country": "India",
                "verification_required": false,
                "source": "JCI Official Website - Verified"
            }]"#,
        )
        .unwrap();

        assert_eq!(parsed.records.len(), 1);
        let record = &parsed.records[0];
        assert_eq!(record.organization_name, "Apollo Hospitals Chennai");
        assert_eq!(record.city(), Some("Chennai"));
        assert!(!record.verification_required);
        assert_eq!(record.source_note.as_deref(), Some("JCI Official Website - Verified"));
        assert_eq!(record.accreditation_type, AccreditationType::Jci);
    }

    #[test]
    fn test_parse_wrapped_nested_location() {
        let parsed = parse(
            r#"{"organizations": [
                {"organization_name": "Mayo Clinic", "location": {"city": "Rochester", "region": "Minnesota"}}
            ]}"#,
        )
        .unwrap();

        let location = parsed.records[0].location.clone().unwrap();
        assert_eq!(location.city.as_deref(), Some("Rochester"));
        assert_eq!(location.state.as_deref(), Some("Minnesota"));
        assert!(parsed.records[0].verification_required);
    }

    #[test]
    fn test_bad_optional_field_drops_field_not_record() {
        let parsed = parse(
            r#"[{"name": "Clinic A", "city": 42, "verification_required": "no", "note": ["x"]}]"#,
        )
        .unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].location, None);
        assert_eq!(parsed.records[0].source_note, None);
        assert!(!parsed.records[0].verification_required);
    }

    #[test]
    fn test_unreadable_verification_flag_fails_closed() {
        let parsed = parse(r#"[{"name": "Clinic A", "verification_required": null}]"#).unwrap();
        assert!(parsed.records[0].verification_required);
    }

    #[test]
    fn test_nameless_entries_are_skipped() {
        let parsed = parse(r#"[{"city": "Pune"}, "junk", {"name": "  "}, {"name": "Ruby Hall"}]"#).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(
            parsed.skipped.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(parse("{not json"), Err(LoadError::Malformed { .. })));
        assert!(matches!(parse(r#"{"foo": 1}"#), Err(LoadError::Malformed { .. })));
        assert!(matches!(parse("42"), Err(LoadError::Malformed { .. })));
    }
}
