//! I/O utility functions

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Temporary sibling of `path` used while writing
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write content to a file atomically using write-then-rename pattern.
///
/// The content is first written to `<file>.tmp` next to the target, then
/// renamed over it, so readers never observe a half-written report.
///
/// # Example
/// ```ignore
/// atomic_write(&out_dir.join("tables.html"), &html)?;
/// ```
pub fn atomic_write(path: &Path, content: impl AsRef<[u8]>) -> io::Result<()> {
    let temp = temp_path(path);
    fs::write(&temp, content)?;
    fs::rename(&temp, path)?;
    Ok(())
}
