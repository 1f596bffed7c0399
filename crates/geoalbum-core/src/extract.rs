// exiftool wrapper: one batch invocation over the photo directory.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use encoding_rs::SHIFT_JIS;
use serde_json::Value;

use crate::error::{GeoalbumError, Result};
use crate::media::RawRecord;

/// Characters of stdout shown at each end of a malformed response.
const EXCERPT_CHARS: usize = 800;

/// Arguments for a recursive JSON dump with family-1 group prefixes and
/// numeric GPS values.
pub fn exiftool_args(photos_dir: &Path, extensions: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-j", "-G1", "-n", "-q", "-q", "-r"]
        .iter()
        .map(OsString::from)
        .collect();
    for ext in extensions {
        args.push("-ext".into());
        args.push(ext.into());
    }
    args.push(photos_dir.as_os_str().to_os_string());
    args
}

/// Run exiftool over `photos_dir` and return one raw record per file, in
/// the tool's own traversal order.
pub fn extract_metadata(photos_dir: &Path, tool: &Path, extensions: &[String]) -> Result<Vec<RawRecord>> {
    if !photos_dir.exists() {
        return Err(GeoalbumError::MissingInput(photos_dir.to_path_buf()));
    }

    let tool_name = tool.display().to_string();
    tracing::debug!("running {} over {}", tool_name, photos_dir.display());

    let output = Command::new(tool)
        .args(exiftool_args(photos_dir, extensions))
        .output()
        .map_err(|e| GeoalbumError::ExternalTool {
            tool: tool_name.clone(),
            detail: if e.kind() == ErrorKind::NotFound {
                format!("executable not found ({})", e)
            } else {
                format!("failed to run: {}", e)
            },
            stderr: String::new(),
        })?;

    if !output.status.success() {
        // exiftool exits non-zero when some files had errors but still prints JSON.
        tracing::debug!("{} exited with {}", tool_name, output.status);
    }

    let stdout = decode_tool_output(&output.stdout);
    let stderr = decode_tool_output(&output.stderr);
    if !stderr.trim().is_empty() {
        tracing::debug!("{} stderr: {}", tool_name, stderr.trim());
    }

    parse_response(&tool_name, &stdout, &stderr)
}

/// Classify and parse a captured exiftool response.
pub fn parse_response(tool: &str, stdout: &str, stderr: &str) -> Result<Vec<RawRecord>> {
    let out = stdout.trim();
    if out.is_empty() {
        return Err(GeoalbumError::ExternalTool {
            tool: tool.to_string(),
            detail: "empty output".to_string(),
            stderr: stderr.to_string(),
        });
    }

    let malformed = |reason: String| {
        let (head, tail) = excerpt(out);
        GeoalbumError::MalformedResponse {
            reason,
            head,
            tail,
            stderr: stderr.to_string(),
        }
    };

    let data: Value = serde_json::from_str(out).map_err(|e| malformed(e.to_string()))?;
    let Value::Array(entries) = data else {
        return Err(malformed("exiftool JSON is not a list".to_string()));
    };

    let total = entries.len();
    let records: Vec<RawRecord> = entries.into_iter().filter_map(RawRecord::from_value).collect();
    if records.len() < total {
        tracing::warn!("skipped {} non-object entries in exiftool output", total - records.len());
    }
    Ok(records)
}

/// Head and tail of a payload, measured in characters. The tail is empty
/// when the head already covers everything.
fn excerpt(s: &str) -> (String, String) {
    let count = s.chars().count();
    let head: String = s.chars().take(EXCERPT_CHARS).collect();
    let tail = if count > EXCERPT_CHARS {
        s.chars().skip(count - EXCERPT_CHARS).collect()
    } else {
        String::new()
    };
    (head, tail)
}

/// Decode tool output, trying UTF-8 first, then Shift_JIS.
pub fn decode_tool_output(raw: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(raw) {
        return s.to_string();
    }

    // Windows builds of exiftool may write in the console code page
    let (decoded, _, had_errors) = SHIFT_JIS.decode(raw);
    if !had_errors {
        return decoded.into_owned();
    }

    String::from_utf8_lossy(raw).into_owned()
}
