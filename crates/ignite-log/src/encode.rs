use serde::{Deserialize, Serialize};

use crate::record::LogRecord;

/// The three structured encodings a sink can be configured with (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Text,
    KeyValue,
}

/// Encodes one record into its wire form, terminated with `\n`. Never
/// allocates beyond what the record's field count requires.
pub fn encode(record: &LogRecord, format: Format) -> Vec<u8> {
    match format {
        Format::Json => encode_json(record),
        Format::Text => encode_text(record),
        Format::KeyValue => encode_keyvalue(record),
    }
}

fn encode_json(record: &LogRecord) -> Vec<u8> {
    // Insertion order matters (§6 "Field order is insertion order"), so this
    // is built by hand rather than through a derived `Serialize` impl.
    let mut map = serde_json::Map::new();
    map.insert("L".into(), record.level.as_upper_str().into());
    map.insert("T".into(), record.timestamp_rfc3339_ms().into());
    map.insert("M".into(), record.message.clone().into());
    if let Some(name) = &record.name {
        map.insert("N".into(), name.clone().into());
    }
    if let Some(caller) = &record.caller {
        map.insert("C".into(), caller.clone().into());
    }
    for (key, value) in &record.fields {
        map.insert(key.clone(), value.to_json());
    }
    if let Some(stack) = &record.stacktrace {
        map.insert("stacktrace".into(), stack.clone().into());
    }
    if let Some(verbose) = &record.error_verbose {
        map.insert("errorVerbose".into(), verbose.clone().into());
    }
    let mut out = serde_json::to_vec(&serde_json::Value::Object(map)).unwrap_or_default();
    out.push(b'\n');
    out
}

fn encode_text(record: &LogRecord) -> Vec<u8> {
    let caller = record.caller.as_deref().unwrap_or("-");
    let mut out = format!(
        "{}\t{}\t{}\t{}",
        record.timestamp_rfc3339_ms(),
        record.level.as_upper_str(),
        caller,
        record.message,
    );

    let mut rest = serde_json::Map::new();
    for (key, value) in &record.fields {
        rest.insert(key.clone(), value.to_json());
    }
    if let Some(stack) = &record.stacktrace {
        rest.insert("stacktrace".into(), stack.clone().into());
    }
    if let Some(verbose) = &record.error_verbose {
        rest.insert("errorVerbose".into(), verbose.clone().into());
    }
    if !rest.is_empty() {
        out.push('\t');
        out.push_str(&serde_json::to_string(&rest).unwrap_or_default());
    }
    out.push('\n');
    out.into_bytes()
}

fn encode_keyvalue(record: &LogRecord) -> Vec<u8> {
    use crate::field::Field;

    let mut out = format!(
        "ts={} level={} caller={} message={}",
        record.timestamp_rfc3339_ms(),
        record.level.as_upper_str(),
        record
            .caller
            .as_deref()
            .map(Field::Str)
            .unwrap_or_else(|| Field::Str("-".into()))
            .to_display_string(),
        Field::Str(record.message.clone()).to_display_string(),
    );
    for (key, value) in &record.fields {
        out.push(' ');
        out.push_str(key);
        out.push('=');
        out.push_str(&value.to_display_string());
    }
    if let Some(stack) = &record.stacktrace {
        out.push_str(" stacktrace=");
        out.push_str(&Field::Str(stack.clone()).to_display_string());
    }
    if let Some(verbose) = &record.error_verbose {
        out.push_str(" errorVerbose=");
        out.push_str(&Field::Str(verbose.clone()).to_display_string());
    }
    out.push('\n');
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::level::Level;
    use chrono::Utc;

    fn sample() -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            level: Level::Info,
            message: "hi".into(),
            name: None,
            caller: None,
            fields: vec![("k".into(), Field::I64(1))],
            stacktrace: None,
            error_verbose: None,
        }
    }

    #[test]
    fn json_contains_well_known_keys() {
        let bytes = encode(&sample(), Format::Json);
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["L"], "INFO");
        assert_eq!(value["M"], "hi");
        assert_eq!(value["k"], 1);
        assert!(value.get("T").is_some());
    }

    #[test]
    fn keyvalue_quotes_strings_with_spaces() {
        let mut record = sample();
        record.fields = vec![("k".into(), Field::Str("has space".into()))];
        let bytes = encode(&record, Format::KeyValue);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("k=\"has space\""));
    }
}
