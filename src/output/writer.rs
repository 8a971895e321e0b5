//! File writer and assets copier

use crate::output::{OutputEntry, OutputError, OutputOwner};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Files never copied from the assets directory
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Creates the output directory, removing previous contents when `clean`
pub async fn prepare_output_dir(dir: &Path, clean: bool) -> Result<(), OutputError> {
    if clean && tokio::fs::try_exists(dir).await? {
        tracing::debug!("Cleaning output directory {}", dir.display());
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// Writes one entry below `root`, creating parent directories
///
/// # Returns
///
/// * `Ok(PathBuf)` - The absolute path written
/// * `Err(OutputError)` - The relative path escapes `root` or the write failed
pub async fn write_entry(root: &Path, entry: &OutputEntry) -> Result<PathBuf, OutputError> {
    let target = resolve_under(root, &entry.path)?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| OutputError::Write {
                path: entry.path.clone(),
                reason: e.to_string(),
            })?;
    }

    tokio::fs::write(&target, &entry.bytes)
        .await
        .map_err(|e| OutputError::Write {
            path: entry.path.clone(),
            reason: e.to_string(),
        })?;

    Ok(target)
}

/// Joins a '/'-separated relative path onto `root`, refusing to leave it
fn resolve_under(root: &Path, relative: &str) -> Result<PathBuf, OutputError> {
    let relative_path = Path::new(relative);
    let safe = !relative.is_empty()
        && relative_path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if !safe {
        return Err(OutputError::UnsafePath(relative.to_string()));
    }

    Ok(root.join(relative_path))
}

/// Reads every file under the assets directory as output entries
///
/// Entries are sorted by relative path so asset registration is
/// deterministic.
pub fn collect_assets(dir: &Path) -> Result<Vec<OutputEntry>, OutputError> {
    if !dir.is_dir() {
        return Err(OutputError::Assets(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(dir).sort_by_file_name() {
        let item = item.map_err(|e| OutputError::Assets(e.to_string()))?;
        if !item.file_type().is_file() {
            continue;
        }

        let name = item.file_name().to_str().unwrap_or_default();
        if IGNORED_FILES.contains(&name) {
            continue;
        }

        let relative = item
            .path()
            .strip_prefix(dir)
            .map_err(|e| OutputError::Assets(e.to_string()))?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let bytes = std::fs::read(item.path())?;
        entries.push(OutputEntry::new(OutputOwner::Asset(relative.clone()), relative, bytes));
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}
