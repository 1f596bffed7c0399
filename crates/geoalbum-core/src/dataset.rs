use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::checkpoint::CheckpointRecord;
use crate::error::{GeoalbumError, Result};
use crate::media::Kind;

/// Name of the constant the map page reads.
pub const DATASET_CONST: &str = "DATA";

/// Renderer-facing item. Only built by [`assemble`], so coordinates are
/// always real parsed values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetItem {
    pub id: u64,
    pub kind: Kind,
    #[serde(rename = "type")]
    pub media_type: String,
    pub caption: String,
    pub datetime: String,
    pub lat: f64,
    pub lon: f64,
    pub alt_m: Option<f64>,
    pub thumb: String,
    #[serde(flatten)]
    pub source: ItemSource,
}

/// Where the renderer loads the media from. Serialized inline as either a
/// `path` or a `url` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemSource {
    Photo { path: String },
    Video { url: String },
}

/// Output of [`assemble`]: items in id order plus every dropped row.
#[derive(Debug, Default)]
pub struct Assembly {
    pub items: Vec<DatasetItem>,
    /// `GeoalbumError::RowValidation` for each dropped row, in file order.
    pub rejected: Vec<GeoalbumError>,
}

/// Largest id the map page can hold exactly (`Number.MAX_SAFE_INTEGER`).
pub const MAX_ID: u64 = (1 << 53) - 1;

/// Hands out unique ids. Explicit ids are kept unless already taken; every
/// accepted id pushes the counter past itself so later auto ids never collide.
#[derive(Debug)]
struct IdAllocator {
    next: u64,
    used: HashSet<u64>,
}

impl IdAllocator {
    fn new() -> Self {
        Self {
            next: 1,
            used: HashSet::new(),
        }
    }

    /// None once every id up to [`MAX_ID`] is taken.
    fn resolve(&mut self, explicit: Option<u64>, line: u64) -> Option<u64> {
        if let Some(id) = explicit.filter(|&id| id <= MAX_ID) {
            if self.used.insert(id) {
                if let Some(after) = id.checked_add(1) {
                    self.next = self.next.max(after);
                }
                return Some(id);
            }
            tracing::warn!("row {}: id {} already used, reassigning", line, id);
        }
        while self.next <= MAX_ID {
            let id = self.next;
            self.next += 1;
            if self.used.insert(id) {
                return Some(id);
            }
        }
        None
    }
}

/// Empty or unparsable -> None. Non-finite values never reach the map.
pub fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decimal ids are truncated toward zero; ids below 1 or above [`MAX_ID`]
/// are unusable.
pub fn parse_id(s: &str) -> Option<u64> {
    let v = parse_float(s)?.trunc();
    if v < 1.0 || v > MAX_ID as f64 {
        return None;
    }
    Some(v as u64)
}

/// Validate checkpoint rows into dataset items. Rows that cannot be placed
/// on the map or played are dropped, never patched with placeholder values.
pub fn assemble(records: &[CheckpointRecord]) -> Assembly {
    let mut ids = IdAllocator::new();
    let mut items = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();

    for rec in records {
        let (Some(lat), Some(lon)) = (parse_float(&rec.lat), parse_float(&rec.lon)) else {
            rejected.push(row_rejected(rec.line, "missing or unparsable lat/lon"));
            continue;
        };

        let Some(id) = ids.resolve(parse_id(&rec.id), rec.line) else {
            rejected.push(row_rejected(rec.line, "no ids left"));
            continue;
        };

        let kind = Kind::parse(&rec.kind);
        let source = match kind {
            Kind::Video => {
                let url = rec.url.trim();
                if url.is_empty() {
                    rejected.push(row_rejected(rec.line, "video without url"));
                    continue;
                }
                ItemSource::Video { url: url.to_string() }
            }
            Kind::Photo => {
                let file = rec.file.trim();
                let path = if file.is_empty() { rec.path.trim() } else { file };
                if path.is_empty() {
                    rejected.push(row_rejected(rec.line, "photo without file path"));
                    continue;
                }
                ItemSource::Photo { path: path.to_string() }
            }
        };

        items.push(DatasetItem {
            id,
            kind,
            media_type: rec.media_type.trim().to_string(),
            caption: rec.caption.trim().to_string(),
            datetime: rec.datetime.trim().to_string(),
            lat,
            lon,
            alt_m: parse_float(&rec.alt_m),
            thumb: rec.thumb.trim().to_string(),
            source,
        });
    }

    items.sort_by_key(|item| item.id);
    Assembly { items, rejected }
}

fn row_rejected(line: u64, reason: &str) -> GeoalbumError {
    tracing::warn!("row {} dropped: {}", line, reason);
    GeoalbumError::RowValidation {
        line,
        reason: reason.to_string(),
    }
}

/// `const DATA = [...];` with 2-space indentation.
pub fn render_dataset(items: &[DatasetItem]) -> Result<String> {
    let json = serde_json::to_string_pretty(items)?;
    Ok(format!("const {} = {};\n", DATASET_CONST, json))
}

/// Write the dataset script to `path`.
pub fn write_dataset(path: &Path, items: &[DatasetItem]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let script = render_dataset(items)?;
    let temp_path = path.with_extension("js.tmp");
    {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        writer.write_all(script.as_bytes())?;
        writer.flush()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}
