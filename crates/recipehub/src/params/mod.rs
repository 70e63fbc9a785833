//! Recipe and job parameter payloads.
//!
//! Payloads are stored as TOML text. In memory they are a [`ParamMap`] of
//! string keys to a closed set of [`ParamValue`] variants.
//!
//! [`parse`] never fails: a stored payload that does not parse is logged and
//! replaced by an empty map, so a corrupt payload can never block rendering a
//! recipe or a job. Use [`try_parse`] when the caller wants the error.

use std::collections::BTreeMap;

use thiserror::Error;

/// Ordered mapping used for every parameter table.
pub type ParamMap = BTreeMap<String, ParamValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<ParamValue>),
    Table(ParamMap),
}

#[derive(Error, Debug)]
pub enum ParamError {
    #[error("Malformed parameter payload: {0}")]
    Malformed(#[from] toml::de::Error),

    #[error("Failed to serialize parameters: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&ParamMap> {
        match self {
            ParamValue::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut ParamMap> {
        match self {
            ParamValue::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Boolean(value)
    }
}

impl From<ParamMap> for ParamValue {
    fn from(value: ParamMap) -> Self {
        ParamValue::Table(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values.into_iter().map(ParamValue::String).collect())
    }
}

impl From<toml::Value> for ParamValue {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => ParamValue::String(s),
            toml::Value::Integer(n) => ParamValue::Integer(n),
            toml::Value::Float(f) => ParamValue::Float(f),
            toml::Value::Boolean(b) => ParamValue::Boolean(b),
            // Datetimes carry no meaning for recipes beyond their text.
            toml::Value::Datetime(dt) => ParamValue::String(dt.to_string()),
            toml::Value::Array(items) => {
                ParamValue::List(items.into_iter().map(ParamValue::from).collect())
            }
            toml::Value::Table(table) => ParamValue::Table(from_toml_table(table)),
        }
    }
}

impl From<&ParamValue> for toml::Value {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::String(s) => toml::Value::String(s.clone()),
            ParamValue::Integer(n) => toml::Value::Integer(*n),
            ParamValue::Float(f) => toml::Value::Float(*f),
            ParamValue::Boolean(b) => toml::Value::Boolean(*b),
            ParamValue::List(items) => {
                toml::Value::Array(items.iter().map(toml::Value::from).collect())
            }
            ParamValue::Table(map) => toml::Value::Table(to_toml_table(map)),
        }
    }
}

fn from_toml_table(table: toml::Table) -> ParamMap {
    table
        .into_iter()
        .map(|(key, value)| (key, ParamValue::from(value)))
        .collect()
}

fn to_toml_table(map: &ParamMap) -> toml::Table {
    map.iter()
        .map(|(key, value)| (key.clone(), toml::Value::from(value)))
        .collect()
}

/// Parses a stored payload, returning the error on malformed input.
pub fn try_parse(text: &str) -> Result<ParamMap, ParamError> {
    let table: toml::Table = text.parse()?;
    Ok(from_toml_table(table))
}

/// Parses a stored payload, degrading to an empty map on malformed input.
pub fn parse(text: &str) -> ParamMap {
    match try_parse(text) {
        Ok(map) => map,
        Err(e) => {
            log::error!("{}. payload={:?}", e, text);
            ParamMap::new()
        }
    }
}

/// Serializes a parameter map to TOML text.
pub fn try_serialize(map: &ParamMap) -> Result<String, ParamError> {
    Ok(toml::to_string(&to_toml_table(map))?)
}

/// Serializes a parameter map to TOML text.
///
/// Every map produced by [`parse`] serializes; for anything else a failure is
/// logged and an empty payload returned.
pub fn serialize(map: &ParamMap) -> String {
    match try_serialize(map) {
        Ok(text) => text,
        Err(e) => {
            log::error!("{}", e);
            String::new()
        }
    }
}

/// Returns the string stored under `key`, if any.
pub fn get_str<'a>(map: &'a ParamMap, key: &str) -> Option<&'a str> {
    map.get(key).and_then(ParamValue::as_str)
}

/// Returns the table stored under `key`, if any.
pub fn get_table<'a>(map: &'a ParamMap, key: &str) -> Option<&'a ParamMap> {
    map.get(key).and_then(ParamValue::as_table)
}

pub fn get_table_mut<'a>(map: &'a mut ParamMap, key: &str) -> Option<&'a mut ParamMap> {
    map.get_mut(key).and_then(ParamValue::as_table_mut)
}

/// Sets `key` to `value`, returning the previous value.
pub fn insert<V: Into<ParamValue>>(map: &mut ParamMap, key: &str, value: V) -> Option<ParamValue> {
    map.insert(key.to_string(), value.into())
}

/// Returns the table stored under `key`, replacing any non-table value with an
/// empty table first.
pub fn table_entry<'a>(map: &'a mut ParamMap, key: &str) -> &'a mut ParamMap {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| ParamValue::Table(ParamMap::new()));
    if slot.as_table().is_none() {
        *slot = ParamValue::Table(ParamMap::new());
    }
    match slot {
        ParamValue::Table(table) => table,
        _ => unreachable!("slot was just made a table"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE_PAYLOAD: &str = r#"
[settings]
name = "FastQC"
threads = 4

[reads]
label = "Sequencing reads"
display = "DROPDOWN"
choices = [["a", "A"], ["b", "B"]]
value = 0.25
paired = true
"#;

    #[test]
    fn test_parse_nested_tables() {
        let map = parse(RECIPE_PAYLOAD);
        let settings = get_table(&map, "settings").unwrap();
        assert_eq!(get_str(settings, "name"), Some("FastQC"));
        assert_eq!(settings.get("threads"), Some(&ParamValue::Integer(4)));

        let reads = get_table(&map, "reads").unwrap();
        assert_eq!(reads.get("value"), Some(&ParamValue::Float(0.25)));
        assert_eq!(reads.get("paired"), Some(&ParamValue::Boolean(true)));
        assert_eq!(reads.get("choices").and_then(|c| c.as_list()).map(|c| c.len()), Some(2));
    }

    #[test]
    fn test_parse_malformed_returns_empty() {
        assert!(parse("this is [not toml").is_empty());
        assert!(parse("commands").is_empty());
    }

    #[test]
    fn test_try_parse_reports_error() {
        assert!(matches!(try_parse("x = "), Err(ParamError::Malformed(_))));
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_round_trip_of_parsed_payload() {
        let map = parse(RECIPE_PAYLOAD);
        let text = serialize(&map);
        assert_eq!(parse(&text), map);
    }

    #[test]
    fn test_serialize_is_idempotent() {
        let once = serialize(&parse(RECIPE_PAYLOAD));
        let twice = serialize(&parse(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_datetime_is_read_as_string() {
        let map = parse("when = 2024-05-01T10:00:00Z");
        assert_eq!(get_str(&map, "when"), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn test_table_entry_replaces_scalar() {
        let mut map = parse("settings = 3");
        table_entry(&mut map, "settings").insert("name".into(), "x".into());
        assert_eq!(
            get_table(&map, "settings").and_then(|s| get_str(s, "name")),
            Some("x")
        );
    }

    #[test]
    fn test_table_entry_keeps_existing() {
        let mut map = parse(RECIPE_PAYLOAD);
        let settings = table_entry(&mut map, "settings");
        assert_eq!(settings.get("threads"), Some(&ParamValue::Integer(4)));
    }

    #[test]
    fn test_insert_into_nested_table() {
        let mut map = parse(RECIPE_PAYLOAD);
        let reads = get_table_mut(&mut map, "reads").unwrap();
        let previous = insert(reads, "value", "/data/a.fq");
        assert_eq!(previous, Some(ParamValue::Float(0.25)));
        assert!(get_table_mut(&mut map, "missing").is_none());
        assert_eq!(
            get_table(&map, "reads").and_then(|r| get_str(r, "value")),
            Some("/data/a.fq")
        );
    }
}
