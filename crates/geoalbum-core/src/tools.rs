// External tool resolution for exiftool.
//
// Resolution order:
// 1) Explicit path from the caller
// 2) GEOALBUM_EXIFTOOL_PATH environment variable
// 3) <tools_dir>/exiftool.exe, then <tools_dir>/exiftool
// 4) Bare name, looked up on PATH when spawned

use std::env;
use std::path::{Path, PathBuf};

pub const EXIFTOOL_ENV: &str = "GEOALBUM_EXIFTOOL_PATH";

const EXIFTOOL_NAME: &str = "exiftool";

/// Resolve the exiftool executable.
pub fn exiftool_path(explicit: Option<&Path>, tools_dir: &Path) -> PathBuf {
    resolve_tool(explicit, EXIFTOOL_ENV, tools_dir, EXIFTOOL_NAME)
}

fn resolve_tool(explicit: Option<&Path>, env_key: &str, tools_dir: &Path, name: &str) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    if let Ok(v) = env::var(env_key) {
        let p = PathBuf::from(&v);
        if p.exists() {
            return p;
        }
    }

    let with_exe = tools_dir.join(format!("{}.exe", name));
    if with_exe.is_file() {
        return with_exe;
    }

    let bare = tools_dir.join(name);
    if bare.is_file() {
        return bare;
    }

    PathBuf::from(name)
}
