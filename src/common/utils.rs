//! Path display and process helpers.

use std::path::Path;

/// Render a path with the home directory replaced by `~`.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(rest) = path.strip_prefix(&home)
    {
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

/// Whether a process with this PID is alive.
pub fn is_process_running(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

/// Write `contents` to `path` via a temporary file in the same directory.
pub fn write_atomically(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    use anyhow::Context;
    use std::io::Write;

    let dir = path
        .parent()
        .with_context(|| format!("{} has no parent directory", private_path(path)))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", private_path(dir)))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", private_path(dir)))?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .with_context(|| format!("Failed to write {}", private_path(path)))?;
    Ok(())
}
