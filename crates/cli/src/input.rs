//! Loading of specifications and configuration files.

use std::path::{Path, PathBuf};

use kbx_core::{Definition, SynthesisConfig};

/// Default configuration file name.
pub(crate) const CONFIG_FILE: &str = "kbx.toml";

pub(crate) fn load_definition(path: &Path) -> Result<Definition, String> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading file '{}': {}", path.display(), e))?;
    serde_json::from_str(&src)
        .map_err(|e| format!("error parsing specification '{}': {}", path.display(), e))
}

pub(crate) fn load_config(path: &Path) -> Result<SynthesisConfig, String> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading config '{}': {}", path.display(), e))?;
    toml::from_str(&src).map_err(|e| format!("error parsing config '{}': {}", path.display(), e))
}

/// `explicit`, or the default file name inside `dir`.
pub(crate) fn config_path(explicit: Option<&Path>, dir: &Path) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => dir.join(CONFIG_FILE),
    }
}

/// Directory containing `file`; `.` for bare file names.
pub(crate) fn parent_dir(file: &Path) -> &Path {
    match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// File name without extension, used to name generated files.
pub(crate) fn stem(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "spec".to_owned())
}
