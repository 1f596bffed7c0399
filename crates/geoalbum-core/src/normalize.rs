use crate::media::{scalar_text, CanonicalRow, RawRecord};
use crate::paths;

/// Capture time, most trustworthy source first. `-G1` reports EXIF tags
/// under `ExifIFD` and file times under `System`; the family-0 spelling of
/// each source sits next to its family-1 spelling.
///
/// The QuickTime entry only matters for video containers, which the photo
/// scan does not currently feed in.
pub const DATETIME_KEYS: &[&str] = &[
    "EXIF:DateTimeOriginal",
    "ExifIFD:DateTimeOriginal",
    "EXIF:CreateDate",
    "ExifIFD:CreateDate",
    "QuickTime:CreateDate",
    "System:FileModifyDate",
    "File:FileModifyDate",
];

pub const LATITUDE_KEYS: &[&str] = &["Composite:GPSLatitude", "EXIF:GPSLatitude", "GPS:GPSLatitude"];

pub const LONGITUDE_KEYS: &[&str] = &["Composite:GPSLongitude", "EXIF:GPSLongitude", "GPS:GPSLongitude"];

pub const ALTITUDE_KEYS: &[&str] = &["Composite:GPSAltitude", "EXIF:GPSAltitude", "GPS:GPSAltitude"];

/// Site-relative directories the canonical `file`/`thumb` paths point into.
#[derive(Debug, Clone)]
pub struct PathPrefixes {
    pub photos: String,
    pub thumbs: String,
}

impl Default for PathPrefixes {
    fn default() -> Self {
        Self {
            photos: "photos".to_string(),
            thumbs: "thumbs".to_string(),
        }
    }
}

/// Map one raw record to a canonical row. None when the record names no file.
pub fn normalize_record(record: &RawRecord, id: u64, prefixes: &PathPrefixes) -> Option<CanonicalRow> {
    let source = record.source_file().unwrap_or_default();
    let name = paths::resolve_file_name(&source)?;

    let file = paths::join_url(&prefixes.photos, &name);
    let thumb = paths::join_url(&prefixes.thumbs, &paths::thumb_file_name(&name));

    let mut row = CanonicalRow::photo(id, file, thumb);
    row.datetime = pick_text(record, DATETIME_KEYS);
    row.lat = pick_text(record, LATITUDE_KEYS);
    row.lon = pick_text(record, LONGITUDE_KEYS);
    row.alt_m = pick_text(record, ALTITUDE_KEYS);
    Some(row)
}

/// Normalize a batch, numbering emitted rows from 1 in input order.
/// Records without a resolvable file name are skipped and do not consume an id.
pub fn normalize_records(records: &[RawRecord], prefixes: &PathPrefixes) -> Vec<CanonicalRow> {
    let mut rows = Vec::with_capacity(records.len());
    let mut next_id = 1u64;

    for record in records {
        match normalize_record(record, next_id, prefixes) {
            Some(row) => {
                rows.push(row);
                next_id += 1;
            }
            None => {
                tracing::debug!("skipping metadata entry without a file name ({} fields)", record.len());
            }
        }
    }

    rows
}

fn pick_text(record: &RawRecord, keys: &[&str]) -> String {
    record.pick(keys).map(scalar_text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Kind;
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawRecord {
        RawRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_scenario_photo_row() {
        let rec = record(json!({
            "SourceFile": "./photos/a.jpg",
            "EXIF:DateTimeOriginal": "2024:01:01 10:00:00",
            "Composite:GPSLatitude": 35.0,
            "Composite:GPSLongitude": 139.0,
        }));
        let row = normalize_record(&rec, 1, &PathPrefixes::default()).unwrap();
        assert_eq!(row.id, 1);
        assert_eq!(row.kind, Kind::Photo);
        assert_eq!(row.file, "photos/a.jpg");
        assert_eq!(row.thumb, "thumbs/a_thumb.jpg");
        assert_eq!(row.datetime, "2024:01:01 10:00:00");
        assert_eq!(row.lat, "35.0");
        assert_eq!(row.lon, "139.0");
        assert_eq!(row.alt_m, "");
        assert_eq!(row.media_type, "");
        assert_eq!(row.caption, "");
        assert_eq!(row.url, "");
    }

    #[test]
    fn test_datetime_priority() {
        let rec = record(json!({
            "SourceFile": "a.jpg",
            "System:FileModifyDate": "2024:05:05 00:00:00+09:00",
            "ExifIFD:CreateDate": "2024:02:02 02:02:02",
            "ExifIFD:DateTimeOriginal": "2024:01:01 01:01:01",
        }));
        let row = normalize_record(&rec, 1, &PathPrefixes::default()).unwrap();
        assert_eq!(row.datetime, "2024:01:01 01:01:01");

        let rec = record(json!({
            "SourceFile": "a.jpg",
            "System:FileModifyDate": "2024:05:05 00:00:00+09:00",
            "EXIF:CreateDate": "2024:02:02 02:02:02",
        }));
        let row = normalize_record(&rec, 1, &PathPrefixes::default()).unwrap();
        assert_eq!(row.datetime, "2024:02:02 02:02:02");
    }

    #[test]
    fn test_falls_back_to_file_modify_date() {
        let rec = record(json!({
            "SourceFile": "a.jpg",
            "System:FileModifyDate": "2024:05:05 00:00:00+09:00",
        }));
        let row = normalize_record(&rec, 1, &PathPrefixes::default()).unwrap();
        assert_eq!(row.datetime, "2024:05:05 00:00:00+09:00");
    }

    #[test]
    fn test_composite_preferred_over_raw() {
        let rec = record(json!({
            "SourceFile": "a.jpg",
            "GPS:GPSLatitude": 10.0,
            "Composite:GPSLatitude": -33.8568,
            "EXIF:GPSLongitude": 151.2153,
            "GPS:GPSAltitude": 12.5,
        }));
        let row = normalize_record(&rec, 1, &PathPrefixes::default()).unwrap();
        assert_eq!(row.lat, "-33.8568");
        assert_eq!(row.lon, "151.2153");
        assert_eq!(row.alt_m, "12.5");
    }

    #[test]
    fn test_zero_coordinate_kept() {
        let rec = record(json!({
            "SourceFile": "a.jpg",
            "Composite:GPSLatitude": 0,
            "Composite:GPSLongitude": 0.0,
        }));
        let row = normalize_record(&rec, 1, &PathPrefixes::default()).unwrap();
        assert_eq!(row.lat, "0");
        assert_eq!(row.lon, "0.0");
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let rec = record(json!({ "SourceFile": "dir\\b.jpeg" }));
        let row = normalize_record(&rec, 7, &PathPrefixes::default()).unwrap();
        assert_eq!(row.id, 7);
        assert_eq!(row.file, "photos/b.jpeg");
        assert_eq!(row.thumb, "thumbs/b_thumb.jpg");
        assert_eq!(row.datetime, "");
        assert_eq!(row.lat, "");
        assert_eq!(row.lon, "");
    }

    #[test]
    fn test_unresolvable_records_skipped() {
        let records = vec![
            record(json!({ "SourceFile": "photos/a.jpg" })),
            record(json!({ "EXIF:Make": "Canon" })),
            record(json!({ "SourceFile": "" })),
            record(json!({ "SourceFile": "photos/c.jpg" })),
        ];
        let rows = normalize_records(&records, &PathPrefixes::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].file, "photos/a.jpg");
        assert_eq!(rows[1].id, 2);
        assert_eq!(rows[1].file, "photos/c.jpg");
    }

    #[test]
    fn test_custom_prefixes() {
        let prefixes = PathPrefixes {
            photos: "media/full".to_string(),
            thumbs: String::new(),
        };
        let rec = record(json!({ "SourceFile": "x/p.jpg" }));
        let row = normalize_record(&rec, 1, &prefixes).unwrap();
        assert_eq!(row.file, "media/full/p.jpg");
        assert_eq!(row.thumb, "p_thumb.jpg");
    }
}
