use std::path::{Path, PathBuf};

pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const COOKIE_CACHE_FILE: &str = "deepseek_nwafu_cookies.json";

#[must_use]
pub fn cookie_cache_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(COOKIE_CACHE_FILE)
}

pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
