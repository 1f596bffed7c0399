use std::path::{Component, Path, PathBuf};

/// Appended to the source stem to name its thumbnail.
pub const THUMB_SUFFIX: &str = "_thumb";
/// Thumbnails are always re-encoded as JPEG.
pub const THUMB_EXT: &str = "jpg";

/// Last path segment of an exiftool `SourceFile`, accepting either separator.
/// Returns None for sidecar-ish entries with no usable name.
pub fn resolve_file_name(source: &str) -> Option<String> {
    let normalized = source.replace('\\', "/");
    let name = normalized.trim_end_matches('/').rsplit('/').next()?;
    match name {
        "" | "." | ".." => None,
        _ => Some(name.to_string()),
    }
}

/// `a.jpg` -> `a_thumb.jpg`. Shared by the normalizer and the thumbnail
/// generator; nothing else links a photo to its thumbnail.
pub fn thumb_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    format!("{}{}.{}", stem, THUMB_SUFFIX, THUMB_EXT)
}

/// Thumbnail path for a source image inside `thumbs_dir`.
pub fn thumb_path_for(source: &Path, thumbs_dir: &Path) -> Option<PathBuf> {
    let name = source.file_name()?.to_str()?;
    Some(thumbs_dir.join(thumb_file_name(name)))
}

/// `dir` relative to the site `root`, as a `/`-separated URL prefix.
pub fn site_prefix(root: &Path, dir: &Path) -> String {
    let relative = pathdiff::diff_paths(dir, root)
        .filter(|p| !p.is_absolute())
        .or_else(|| {
            let dir = std::fs::canonicalize(dir).ok()?;
            let root = std::fs::canonicalize(root).ok()?;
            pathdiff::diff_paths(dir, root)
        })
        .filter(|p| !p.is_absolute());

    match relative {
        Some(rel) => to_url_path(&rel),
        None => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

/// Join a site prefix and a file name without doubling or leading slashes.
pub fn join_url(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), name)
    }
}

fn to_url_path(path: &Path) -> String {
    let mut parts = Vec::new();
    for c in path.components() {
        match c {
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            Component::ParentDir => parts.push("..".to_string()),
            _ => {}
        }
    }
    parts.join("/")
}

/// Case-insensitive extension allow-list check.
pub fn has_extension(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| allowed.iter().any(|a| a.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_file_name() {
        assert_eq!(resolve_file_name("./photos/a.jpg").as_deref(), Some("a.jpg"));
        assert_eq!(resolve_file_name("C:\\pics\\sub\\B.JPG").as_deref(), Some("B.JPG"));
        assert_eq!(resolve_file_name("a.jpg").as_deref(), Some("a.jpg"));
        assert_eq!(resolve_file_name("photos/sub/").as_deref(), Some("sub"));
        assert_eq!(resolve_file_name(""), None);
        assert_eq!(resolve_file_name("/"), None);
        assert_eq!(resolve_file_name("photos/."), None);
        assert_eq!(resolve_file_name(".."), None);
    }

    #[test]
    fn test_thumb_file_name() {
        assert_eq!(thumb_file_name("a.jpg"), "a_thumb.jpg");
        assert_eq!(thumb_file_name("IMG_0001.JPEG"), "IMG_0001_thumb.jpg");
        assert_eq!(thumb_file_name("pic.png"), "pic_thumb.jpg");
        assert_eq!(thumb_file_name("a.b.jpg"), "a.b_thumb.jpg");
        assert_eq!(thumb_file_name("noext"), "noext_thumb.jpg");
        assert_eq!(thumb_file_name(".hidden"), ".hidden_thumb.jpg");
    }

    #[test]
    fn test_thumb_path_matches_name_rule() {
        let p = thumb_path_for(Path::new("/site/photos/x.webp"), Path::new("/site/thumbs")).unwrap();
        assert_eq!(p, PathBuf::from("/site/thumbs/x_thumb.jpg"));
    }

    #[test]
    fn test_site_prefix_default_layout() {
        let root = Path::new(".");
        assert_eq!(site_prefix(root, &root.join("photos")), "photos");
        assert_eq!(site_prefix(root, &root.join("thumbs")), "thumbs");
    }

    #[test]
    fn test_site_prefix_nested_and_same() {
        let root = Path::new("/site");
        assert_eq!(site_prefix(root, Path::new("/site/media/photos")), "media/photos");
        assert_eq!(site_prefix(root, Path::new("/site")), "");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("photos", "a.jpg"), "photos/a.jpg");
        assert_eq!(join_url("photos/", "a.jpg"), "photos/a.jpg");
        assert_eq!(join_url("", "a.jpg"), "a.jpg");
    }

    #[test]
    fn test_has_extension() {
        let allowed = vec!["jpg".to_string(), "jpeg".to_string()];
        assert!(has_extension(Path::new("a.JPG"), &allowed));
        assert!(has_extension(Path::new("a.jpeg"), &allowed));
        assert!(!has_extension(Path::new("a.png"), &allowed));
        assert!(!has_extension(Path::new("jpg"), &allowed));
    }
}
