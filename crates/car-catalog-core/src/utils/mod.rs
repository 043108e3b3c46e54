//! Small filesystem helpers shared by the writers.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Create a temporary file next to `dest` so the final rename stays on one filesystem
pub fn sibling_temp(dest: &Path, suffix: &str) -> std::io::Result<NamedTempFile> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    tempfile::Builder::new()
        .prefix(".car-catalog-")
        .suffix(suffix)
        .tempfile_in(dir)
}

/// Write `bytes` to a sibling temporary file, then rename it over `dest`
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = sibling_temp(dest, ".tmp")?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Make `path` world-readable and owner-writable (0644)
#[cfg(unix)]
pub fn set_public_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
pub fn set_public_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
