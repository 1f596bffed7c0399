pub mod checkpoint;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod media;
pub mod normalize;
pub mod paths;
pub mod thumbs;
pub mod tools;

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub use dataset::{DatasetItem, ItemSource};
pub use error::{GeoalbumError, Result};
pub use media::{CanonicalRow, Kind, RawRecord};

/// Where everything lives on disk, relative to the map site root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteLayout {
    pub root: PathBuf,
    pub photos_dir: PathBuf,
    pub thumbs_dir: PathBuf,
    /// Hand-editable CSV between `scan` and `build`.
    pub checkpoint: PathBuf,
    /// Script defining the dataset constant for the map page.
    pub dataset: PathBuf,
}

impl SiteLayout {
    /// Default layout under `root`: photos/, thumbs/, data.csv, data.js.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            photos_dir: root.join("photos"),
            thumbs_dir: root.join("thumbs"),
            checkpoint: root.join("data.csv"),
            dataset: root.join("data.js"),
            root,
        }
    }

    /// URL prefixes the checkpoint paths are written with.
    pub fn prefixes(&self) -> normalize::PathPrefixes {
        normalize::PathPrefixes {
            photos: paths::site_prefix(&self.root, &self.photos_dir),
            thumbs: paths::site_prefix(&self.root, &self.thumbs_dir),
        }
    }
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

fn default_photo_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Explicit exiftool path; skips the search when set.
    #[serde(default)]
    pub exiftool: Option<PathBuf>,
    /// Directory searched for a bundled exiftool (default: `<root>/tools`).
    #[serde(default)]
    pub tools_dir: Option<PathBuf>,
    #[serde(default = "default_photo_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            exiftool: None,
            tools_dir: None,
            extensions: default_photo_extensions(),
        }
    }
}

impl ExtractOptions {
    pub fn resolve_tool(&self, root: &Path) -> PathBuf {
        let tools_dir = self.tools_dir.clone().unwrap_or_else(|| root.join("tools"));
        tools::exiftool_path(self.exiftool.as_deref(), &tools_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
    pub extensions: Vec<String>,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            max_width: 920,
            max_height: 680,
            quality: 82,
            extensions: ["jpg", "jpeg", "png", "webp"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// Entries exiftool reported.
    pub records: u64,
    pub rows_written: u64,
    /// Entries without a usable file name.
    pub skipped: u64,
    pub checkpoint: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildResult {
    pub rows_read: u64,
    pub items_written: u64,
    pub dropped: u64,
    pub dataset: PathBuf,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThumbnailResult {
    pub sources: u64,
    pub generated: Vec<PathBuf>,
    pub failed: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Type alias for progress callback
pub type ProgressCallback = dyn Fn(&str, u64, u64, &str) + Send + Sync;

/// Throttled progress reporter: emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback,
    last_emit: Cell<Option<Instant>>,
}

impl<'a> ThrottledProgress<'a> {
    const MIN_INTERVAL: Duration = Duration::from_millis(200);

    pub fn new(inner: &'a ProgressCallback) -> Self {
        Self {
            inner,
            last_emit: Cell::new(None),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            if let Some(last) = self.last_emit.get() {
                if last.elapsed() < Self::MIN_INTERVAL {
                    return;
                }
            }
            self.last_emit.set(Some(Instant::now()));
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Extract metadata from the photo directory, normalize it and write the
/// checkpoint CSV. Replaces any existing checkpoint.
pub fn scan(layout: &SiteLayout, options: &ExtractOptions) -> Result<ScanResult> {
    let tool = options.resolve_tool(&layout.root);
    let records = extract::extract_metadata(&layout.photos_dir, &tool, &options.extensions)?;
    tracing::info!("exiftool reported {} entries", records.len());

    let rows = normalize::normalize_records(&records, &layout.prefixes());
    checkpoint::save(&layout.checkpoint, &rows)?;
    tracing::info!("wrote {} rows -> {}", rows.len(), layout.checkpoint.display());

    Ok(ScanResult {
        records: records.len() as u64,
        rows_written: rows.len() as u64,
        skipped: (records.len() - rows.len()) as u64,
        checkpoint: layout.checkpoint.clone(),
    })
}

/// Read the (possibly hand-edited) checkpoint, validate it and write the
/// dataset script.
pub fn build(layout: &SiteLayout) -> Result<BuildResult> {
    let records = checkpoint::load(&layout.checkpoint)?;
    let assembly = dataset::assemble(&records);
    dataset::write_dataset(&layout.dataset, &assembly.items)?;
    tracing::info!(
        "wrote {} items -> {} ({} rows dropped)",
        assembly.items.len(),
        layout.dataset.display(),
        assembly.rejected.len()
    );

    Ok(BuildResult {
        rows_read: records.len() as u64,
        items_written: assembly.items.len() as u64,
        dropped: assembly.rejected.len() as u64,
        dataset: layout.dataset.clone(),
        warnings: assembly.rejected.iter().map(|e| e.to_string()).collect(),
    })
}

/// Regenerate a thumbnail for every image in the photo directory.
pub fn make_thumbnails(
    layout: &SiteLayout,
    options: &ThumbnailOptions,
    progress_callback: &ProgressCallback,
) -> Result<ThumbnailResult> {
    let tp = ThrottledProgress::new(progress_callback);
    let result = thumbs::generate_thumbnails(&layout.photos_dir, &layout.thumbs_dir, options, &tp)?;
    tracing::info!(
        "thumbnails: {} generated, {} failed -> {}",
        result.generated.len(),
        result.failed,
        layout.thumbs_dir.display()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_default_layout() {
        let layout = SiteLayout::default();
        assert_eq!(layout.photos_dir, Path::new(".").join("photos"));
        assert_eq!(layout.checkpoint, Path::new(".").join("data.csv"));
        let prefixes = layout.prefixes();
        assert_eq!(prefixes.photos, "photos");
        assert_eq!(prefixes.thumbs, "thumbs");
    }

    #[test]
    fn test_throttled_progress_always_emits_last() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let cb = move |_: &str, _: u64, _: u64, _: &str| {
            counter.fetch_add(1, Ordering::Relaxed);
        };
        let tp = ThrottledProgress::new(&cb);
        for i in 0..1000 {
            tp.report("thumbs", i, 1000, "");
        }
        let n = calls.load(Ordering::Relaxed);
        assert!(n >= 2, "first and last report must be emitted, got {n}");
        assert!(n < 1000);
    }

    #[test]
    fn test_build_missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let err = build(&SiteLayout::new(dir.path())).unwrap_err();
        assert!(matches!(err, GeoalbumError::MissingInput(_)));
    }

    #[test]
    fn test_scan_missing_photos_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan(&SiteLayout::new(dir.path()), &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, GeoalbumError::MissingInput(_)));
    }

    #[test]
    fn test_extract_options_from_json() {
        let opts: ExtractOptions = serde_json::from_str(r#"{"exiftool": "/usr/bin/exiftool"}"#).unwrap();
        assert_eq!(opts.exiftool.as_deref(), Some(Path::new("/usr/bin/exiftool")));
        assert_eq!(opts.extensions, vec!["jpg", "jpeg"]);
        assert_eq!(opts.resolve_tool(Path::new(".")), PathBuf::from("/usr/bin/exiftool"));
    }
}
