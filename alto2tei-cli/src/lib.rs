// All conversion functionality is in alto2tei-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod logging;
pub mod stages;

// Re-export core types for convenience
pub use alto2tei_core::*;

use std::path::{Path, PathBuf};

/// `<input name>.xml` in the current directory
pub fn default_output_path(input: &Path) -> PathBuf {
    let canonical = input.canonicalize().ok();
    let stem = canonical
        .as_deref()
        .unwrap_or(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "output".to_string());
    PathBuf::from(format!("{stem}.xml"))
}
