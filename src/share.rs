//! Share links and JSON export.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::SnapshotError;
use crate::fragment;
use crate::state::ProjectState;

/// File stem used when the caller does not name the export.
pub const DEFAULT_EXPORT_NAME: &str = "project-state";

/// `base` (origin + path) joined with the encoded configuration.
///
/// Any fragment already on `base` is replaced.
pub fn build_share_url(base: &str, state: &ProjectState) -> Result<String, SnapshotError> {
    let base = base.split_once('#').map_or(base, |(before, _)| before);
    Ok(format!("{base}#{}", fragment::encode(state)?))
}

/// Pretty-printed JSON of the raw configuration.
pub fn export_json(state: &ProjectState) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(state)
}

/// Write `<name>.json` into `dir` and return its path.
pub fn write_export(state: &ProjectState, dir: &Path, name: Option<&str>) -> io::Result<PathBuf> {
    let json = export_json(state).map_err(io::Error::other)?;
    let path = dir.join(format!("{}.json", name.unwrap_or(DEFAULT_EXPORT_NAME)));
    fs::write(&path, json)?;
    info!(path = ?path, "state_exported");
    Ok(path)
}
