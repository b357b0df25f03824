use serde_json::Value;
use tracing::warn;

use crate::error::ParseError;
use crate::record::{is_unknown, ExtractionRecord, UNKNOWN};

/// Parse raw model output into offense records.
///
/// Tolerates markdown fences, a top-level object wrapper, numeric section
/// values and missing fields (filled with the "unknown" sentinel). A unit
/// that is not an object, or that names no offense at all, is skipped with
/// a warning. Free prose with no JSON payload is a `ParseError`; the
/// caller decides whether that is fatal.
pub fn parse_records(raw: &str) -> Result<Vec<ExtractionRecord>, ParseError> {
    let payload = locate_payload(raw).ok_or(ParseError::NoPayload)?;
    let value: Value = serde_json::from_str(payload)?;

    let items: Vec<Value> = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            // Some models wrap the array in an envelope object.
            if let Some(Value::Array(items)) =
                ["offenses", "offences", "records", "tuples"].iter().find_map(|k| map.get(*k))
            {
                items.clone()
            } else if map.keys().any(|k| is_offense_field(k)) {
                vec![Value::Object(map)]
            } else {
                return Err(ParseError::UnexpectedShape(
                    "object has no offense fields and no record array".into(),
                ));
            }
        }
        other => {
            return Err(ParseError::UnexpectedShape(format!(
                "expected array or object, got {}",
                type_name(&other)
            )))
        }
    };

    let mut records = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let Value::Object(map) = item else {
            warn!(unit = i, "skipping non-object extraction unit");
            continue;
        };

        let offense = field(map, &["offense", "offence", "name"]);
        if is_unknown(&offense) {
            warn!(unit = i, "skipping extraction unit with no offense name");
            continue;
        }

        records.push(ExtractionRecord {
            offense,
            chapter: field(map, &["chapter", "chapter_number"]),
            section: field(map, &["section", "section_number"]),
            punishment: field(map, &["punishment", "punishment_clause"]),
            provenance: None,
        });
    }

    Ok(records)
}

/// Slice out the JSON payload: everything between the first opening bracket
/// and the matching last closing one, with any markdown fencing discarded.
fn locate_payload(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();

    let array = trimmed.find('[').and_then(|start| {
        trimmed.rfind(']').filter(|end| *end > start).map(|end| &trimmed[start..=end])
    });
    if let Some(payload) = array {
        return Some(payload);
    }

    trimmed.find('{').and_then(|start| {
        trimmed.rfind('}').filter(|end| *end > start).map(|end| &trimmed[start..=end])
    })
}

fn field(map: &serde_json::Map<String, Value>, names: &[&str]) -> String {
    for name in names {
        match map.get(*name) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => continue,
        }
    }
    UNKNOWN.to_string()
}

fn is_offense_field(key: &str) -> bool {
    matches!(key, "offense" | "offence" | "name")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_array() {
        let raw = r#"[{"offense": "Theft", "chapter": "XVII", "section": "303", "punishment": "Imprisonment up to three years"}]"#;
        let records = parse_records(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offense, "Theft");
        assert_eq!(records[0].section, "303");
    }

    #[test]
    fn tolerates_markdown_fences() {
        let raw = "```json\n[{\"offense\": \"Robbery\", \"chapter\": \"XVII\", \"section\": \"309\", \"punishment\": \"Rigorous imprisonment\"}]\n```";
        let records = parse_records(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offense, "Robbery");
    }

    #[test]
    fn missing_fields_become_unknown() {
        let raw = r#"[{"offense": "Mischief"}]"#;
        let records = parse_records(raw).unwrap();
        assert_eq!(records[0].chapter, UNKNOWN);
        assert_eq!(records[0].section, UNKNOWN);
        assert_eq!(records[0].punishment, UNKNOWN);
    }

    #[test]
    fn numeric_section_is_stringified() {
        let raw = r#"[{"offense": "Theft", "section": 303}]"#;
        let records = parse_records(raw).unwrap();
        assert_eq!(records[0].section, "303");
    }

    #[test]
    fn accepts_offence_spelling_and_envelope() {
        let raw = r#"{"offences": [{"offence": "Criminal breach of trust", "section": "316"}]}"#;
        let records = parse_records(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offense, "Criminal breach of trust");
    }

    #[test]
    fn skips_units_without_an_offense() {
        let raw = r#"[{"chapter": "XVII"}, {"offense": "Theft"}, 42]"#;
        let records = parse_records(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offense, "Theft");
    }

    #[test]
    fn prose_is_a_parse_error() {
        let raw = "The text discusses various offences against property.";
        assert!(matches!(parse_records(raw), Err(ParseError::NoPayload)));
    }

    #[test]
    fn empty_array_yields_zero_records() {
        let records = parse_records("[]").unwrap();
        assert!(records.is_empty());
    }
}
