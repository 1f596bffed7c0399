use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use exif::{In, Reader, Tag};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::error::{GeoalbumError, Result};
use crate::paths;
use crate::{ThrottledProgress, ThumbnailOptions, ThumbnailResult};

/// Images directly inside `photos_dir` with an allowed extension, sorted.
pub fn list_sources(photos_dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !photos_dir.is_dir() {
        return Err(GeoalbumError::MissingInput(photos_dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(photos_dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && paths::has_extension(p, extensions))
        .collect();
    files.sort();
    Ok(files)
}

/// EXIF orientation (1-8). Anything unreadable counts as upright.
pub fn read_orientation(bytes: &[u8]) -> u32 {
    let Ok(reader) = Reader::new().read_from_container(&mut Cursor::new(bytes)) else {
        return 1;
    };
    reader
        .get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .filter(|o| (1..=8).contains(o))
        .unwrap_or(1)
}

/// Bake an EXIF orientation into the pixels.
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Largest size with the same aspect ratio inside `max_w` x `max_h`.
/// Never enlarges.
pub fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width <= max_w && height <= max_h {
        return (width, height);
    }
    let scale = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}

/// Decode `source`, upright it, shrink it and write a JPEG to `dest`.
pub fn make_thumbnail(source: &Path, dest: &Path, options: &ThumbnailOptions) -> Result<()> {
    let bytes = fs::read(source)?;
    let image = image::load_from_memory(&bytes)?;
    let image = apply_orientation(image, read_orientation(&bytes));

    let (w, h) = image.dimensions();
    let (tw, th) = fit_within(w, h, options.max_width, options.max_height);
    let image = if (tw, th) != (w, h) {
        image.resize_exact(tw, th, FilterType::Lanczos3)
    } else {
        image
    };
    let rgb = image.to_rgb8();

    // Use temp file for atomic write
    let tmp_path = dest.with_extension("tmp.jpg");
    if let Err(e) = write_jpeg(&tmp_path, &rgb, options.quality) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp_path, dest) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    if let Ok(meta) = fs::metadata(source) {
        let mtime = filetime::FileTime::from_last_modification_time(&meta);
        filetime::set_file_mtime(dest, mtime).ok();
    }

    Ok(())
}

fn write_jpeg(path: &Path, rgb: &image::RgbImage, quality: u8) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut writer, quality).encode_image(rgb)?;
    writer.flush()?;
    Ok(())
}

/// Thumbnail every listed source. A file that fails is recorded and skipped.
pub fn generate_thumbnails(
    photos_dir: &Path,
    thumbs_dir: &Path,
    options: &ThumbnailOptions,
    progress: &ThrottledProgress,
) -> Result<ThumbnailResult> {
    let sources = list_sources(photos_dir, &options.extensions)?;
    let total = sources.len() as u64;
    let mut result = ThumbnailResult::default();

    if sources.is_empty() {
        tracing::warn!("no images in {}", photos_dir.display());
        return Ok(result);
    }

    fs::create_dir_all(thumbs_dir)?;

    for (i, source) in sources.iter().enumerate() {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        progress.report("thumbs", i as u64, total, &name);

        let outcome = match paths::thumb_path_for(source, thumbs_dir) {
            Some(dest) => make_thumbnail(source, &dest, options).map(|_| dest),
            None => Err(GeoalbumError::ThumbnailEncode {
                file: source.clone(),
                reason: "file name is not valid UTF-8".to_string(),
            }),
        };

        match outcome {
            Ok(dest) => {
                tracing::debug!("OK {}", dest.display());
                result.generated.push(dest);
            }
            Err(e) => {
                let failure = match e {
                    e @ GeoalbumError::ThumbnailEncode { .. } => e,
                    other => GeoalbumError::ThumbnailEncode {
                        file: source.clone(),
                        reason: other.to_string(),
                    },
                };
                tracing::warn!("{}", failure);
                result.warnings.push(failure.to_string());
                result.failed += 1;
            }
        }
    }

    result.sources = total;
    Ok(result)
}
