use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoalbumError {
    #[error("input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("{tool} returned no usable output: {detail}\nstderr:\n{stderr}")]
    ExternalTool {
        tool: String,
        detail: String,
        stderr: String,
    },

    #[error(
        "failed to parse metadata JSON: {reason}\n\n--- stdout head ---\n{head}\n\n--- stdout tail ---\n{tail}\n\n--- stderr ---\n{stderr}"
    )]
    MalformedResponse {
        reason: String,
        head: String,
        tail: String,
        stderr: String,
    },

    /// A checkpoint row rejected by the assembler. Recorded, never returned.
    #[error("row {line} dropped: {reason}")]
    RowValidation { line: u64, reason: String },

    /// A source image that could not be turned into a thumbnail. Recorded, never returned.
    #[error("NG {} {reason}", .file.display())]
    ThumbnailEncode { file: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, GeoalbumError>;
