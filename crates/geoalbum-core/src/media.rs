use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Media category. Decides which required-field policy applies on assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    Photo,
    Video,
}

impl Kind {
    /// Lenient parse for hand-edited cells: blank or unknown means photo.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("video") {
            Kind::Video
        } else {
            Kind::Photo
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Photo => "photo",
            Kind::Video => "video",
        }
    }
}

/// One exiftool JSON object: group-prefixed tag name -> scalar.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: Map<String, Value>,
}

impl RawRecord {
    /// Wrap a JSON value, if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Value for `key`, treating JSON null as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// First candidate key present in the record.
    pub fn pick(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Path of the described file as exiftool reported it.
    pub fn source_file(&self) -> Option<String> {
        self.get("SourceFile").map(scalar_text)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Render a metadata scalar the way it should appear in a checkpoint cell.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A normalized, checkpoint-writable row. Coordinates stay textual here;
/// an empty string means the source had no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub id: u64,
    pub kind: Kind,
    pub file: String,
    pub thumb: String,
    pub lat: String,
    pub lon: String,
    pub alt_m: String,
    pub datetime: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub caption: String,
    pub url: String,
}

impl CanonicalRow {
    pub fn photo(id: u64, file: String, thumb: String) -> Self {
        Self {
            id,
            kind: Kind::Photo,
            file,
            thumb,
            lat: String::new(),
            lon: String::new(),
            alt_m: String::new(),
            datetime: String::new(),
            media_type: String::new(),
            caption: String::new(),
            url: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parse() {
        assert_eq!(Kind::parse("video"), Kind::Video);
        assert_eq!(Kind::parse(" Video "), Kind::Video);
        assert_eq!(Kind::parse("photo"), Kind::Photo);
        assert_eq!(Kind::parse(""), Kind::Photo);
        assert_eq!(Kind::parse("panorama"), Kind::Photo);
    }

    #[test]
    fn test_pick_first_present() {
        let rec = RawRecord::from_value(json!({
            "B": "second",
            "C": "third",
        }))
        .unwrap();
        assert_eq!(rec.pick(&["A", "B", "C"]), Some(&json!("second")));
        assert_eq!(rec.pick(&["X", "Y"]), None);
    }

    #[test]
    fn test_pick_skips_null() {
        let rec = RawRecord::from_value(json!({ "A": null, "B": 1.5 })).unwrap();
        assert_eq!(rec.pick(&["A", "B"]), Some(&json!(1.5)));
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!(35.0)), "35.0");
        assert_eq!(scalar_text(&json!(139)), "139");
        assert_eq!(scalar_text(&json!(-12.25)), "-12.25");
        assert_eq!(scalar_text(&json!("2024:01:01 10:00:00")), "2024:01:01 10:00:00");
        assert_eq!(scalar_text(&json!(null)), "");
        assert_eq!(scalar_text(&json!(true)), "true");
    }

    #[test]
    fn test_non_object_is_not_a_record() {
        assert!(RawRecord::from_value(json!([1, 2])).is_none());
        assert!(RawRecord::from_value(json!("x")).is_none());
    }
}
