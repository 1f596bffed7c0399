use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{GeoalbumError, Result};
use crate::media::CanonicalRow;

/// Column order of the checkpoint file.
pub const HEADER: [&str; 11] = [
    "id", "kind", "file", "thumb", "lat", "lon", "alt_m", "datetime", "type", "caption", "url",
];

/// Spreadsheet apps need the BOM to detect UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One checkpoint line as text, exactly as found. Columns absent from the
/// header read as empty strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointRecord {
    /// 1-based line in the file, for diagnostics.
    pub line: u64,
    pub id: String,
    pub kind: String,
    pub file: String,
    /// Legacy column some hand-edited sheets use instead of `file`.
    pub path: String,
    pub thumb: String,
    pub lat: String,
    pub lon: String,
    pub alt_m: String,
    pub datetime: String,
    pub media_type: String,
    pub caption: String,
    pub url: String,
}

/// Checkpoint order: rows with a datetime first, ascending, then id.
pub fn sort_rows(rows: &mut [CanonicalRow]) {
    rows.sort_by(|a, b| {
        (a.datetime.is_empty(), &a.datetime, a.id).cmp(&(b.datetime.is_empty(), &b.datetime, b.id))
    });
}

/// Write rows in checkpoint order.
pub fn write_rows<W: Write>(mut out: W, rows: &[CanonicalRow]) -> Result<()> {
    let mut sorted = rows.to_vec();
    sort_rows(&mut sorted);

    out.write_all(UTF8_BOM)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(out);
    wtr.write_record(HEADER)?;
    for row in &sorted {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Replace the checkpoint file at `path` with `rows`.
pub fn save(path: &Path, rows: &[CanonicalRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    // Write to temp file first, then rename for atomicity
    let temp_path = path.with_extension("csv.tmp");
    {
        let writer = BufWriter::new(File::create(&temp_path)?);
        write_rows(writer, rows)?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Parse checkpoint text. No validation beyond CSV structure.
pub fn read_records<R: Read>(mut input: R) -> Result<Vec<CheckpointRecord>> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);

    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(body);

    let mut columns: HashMap<String, usize> = HashMap::new();
    for (i, name) in rdr.headers()?.iter().enumerate() {
        columns.entry(name.trim().to_string()).or_insert(i);
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let rec = result?;
        let cell = |name: &str| -> String {
            columns
                .get(name)
                .and_then(|&i| rec.get(i))
                .unwrap_or("")
                .to_string()
        };
        records.push(CheckpointRecord {
            line: rec.position().map(|p| p.line()).unwrap_or(0),
            id: cell("id"),
            kind: cell("kind"),
            file: cell("file"),
            path: cell("path"),
            thumb: cell("thumb"),
            lat: cell("lat"),
            lon: cell("lon"),
            alt_m: cell("alt_m"),
            datetime: cell("datetime"),
            media_type: cell("type"),
            caption: cell("caption"),
            url: cell("url"),
        });
    }

    Ok(records)
}

/// Read the checkpoint file at `path`.
pub fn load(path: &Path) -> Result<Vec<CheckpointRecord>> {
    if !path.exists() {
        return Err(GeoalbumError::MissingInput(path.to_path_buf()));
    }
    read_records(File::open(path)?)
}
