mod fs;

pub use fs::{copy_dir_recursive, remove_dir_if_exists, resolve_path};

use std::path::{Path, PathBuf};

/// Prefix accepted in front of notebook locations
pub const FILE_URL_PREFIX: &str = "file://";

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Strip a `file://` prefix and trailing separators from a notebook location
pub fn normalize_location(location: &str) -> String {
    let trimmed = location.strip_prefix(FILE_URL_PREFIX).unwrap_or(location);
    let without_trailing = trimmed.trim_end_matches(['/', '\\']);
    if without_trailing.is_empty() {
        trimmed.to_string()
    } else {
        without_trailing.to_string()
    }
}

/// Join a child name onto a folder location, keeping URL-like locations intact
pub fn join_location(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        return name.to_string();
    }
    if folder.ends_with('/') || folder.ends_with('\\') {
        format!("{}{}", folder, name)
    } else {
        format!("{}/{}", folder, name)
    }
}

/// Path on disk for a notebook location
pub fn location_path(location: &str) -> PathBuf {
    PathBuf::from(normalize_location(location))
}

/// Last path component of a location, used as the notebook display name
pub fn location_name(location: &str) -> String {
    let normalized = normalize_location(location);
    Path::new(&normalized)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or(normalized)
}
