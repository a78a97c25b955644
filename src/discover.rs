//! File discovery for bundle creation
//!
//! Inputs may be files or directories. Directories are walked
//! recursively with symlinks skipped. Every discovered file gets a
//! bundle-relative POSIX path against a deterministic base directory;
//! the base rule matters because it feeds the Merkle root and therefore
//! the bundle's identity.

use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A file selected for bundling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Absolute path on the local filesystem
    pub absolute_path: PathBuf,
    /// Relative POSIX path the file will carry inside the bundle
    pub bundle_path: String,
    /// File size in bytes
    pub size_bytes: u64,
}

/// Discover all files reachable from the input paths.
///
/// The base directory is the single input's parent when one path is
/// given, otherwise the nearest common ancestor of all inputs. Results
/// are sorted by bundle path.
pub fn discover_files(inputs: &[PathBuf]) -> Result<Vec<DiscoveredFile>> {
    if inputs.is_empty() {
        return Err(Error::NoFilesFound);
    }

    let mut resolved = Vec::with_capacity(inputs.len());
    for input in inputs {
        let path = input.canonicalize().map_err(|_| Error::InvalidPath {
            path: input.display().to_string(),
            reason: "path does not exist".to_string(),
        })?;
        resolved.push(path);
    }

    let base = base_directory(&resolved);
    debug!(base = %base.display(), "resolved bundle base directory");

    let mut discovered = Vec::new();
    for path in &resolved {
        if path.is_file() {
            discovered.push(discovered_file(path, &base)?);
        } else if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(false) {
                let entry = entry.map_err(|e| Error::Storage {
                    reason: format!("walk failed under {}: {e}", path.display()),
                })?;
                if entry.file_type().is_file() && !entry.path_is_symlink() {
                    discovered.push(discovered_file(entry.path(), &base)?);
                }
            }
        }
    }

    if discovered.is_empty() {
        return Err(Error::NoFilesFound);
    }

    discovered.sort_by(|a, b| a.bundle_path.cmp(&b.bundle_path));
    Ok(discovered)
}

/// Base directory for relative paths: the parent of a single input, or
/// the nearest common ancestor of several.
fn base_directory(paths: &[PathBuf]) -> PathBuf {
    if paths.len() == 1 {
        return paths[0]
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
    }

    let mut common: Vec<Component> = anchor_components(&paths[0]);
    for path in &paths[1..] {
        let components = anchor_components(path);
        let shared = common
            .iter()
            .zip(components.iter())
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
    }

    let mut base = PathBuf::new();
    for component in common {
        base.push(component.as_os_str());
    }
    if base.as_os_str().is_empty() {
        base.push("/");
    }
    base
}

/// Components of the directory that anchors a path: the path itself for
/// a directory, its parent for a file.
fn anchor_components(path: &Path) -> Vec<Component> {
    let anchor = if path.is_file() {
        path.parent().unwrap_or(path)
    } else {
        path
    };
    anchor.components().collect()
}

fn discovered_file(path: &Path, base: &Path) -> Result<DiscoveredFile> {
    let relative = path.strip_prefix(base).unwrap_or_else(|_| {
        // Not under the base; fall back to the bare file name.
        Path::new(path.file_name().expect("file path has a name"))
    });

    let bundle_path = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let size_bytes = std::fs::metadata(path)?.len();

    Ok(DiscoveredFile {
        absolute_path: path.to_path_buf(),
        bundle_path,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn bundle_paths(files: &[DiscoveredFile]) -> Vec<&str> {
        files.iter().map(|f| f.bundle_path.as_str()).collect()
    }

    #[test]
    fn test_single_file_uses_parent_as_base() -> crate::Result<()> {
        let dir = TempDir::new()?;
        let file = write(dir.path(), "solo.txt", b"data");

        let found = discover_files(&[file])?;
        assert_eq!(bundle_paths(&found), vec!["solo.txt"]);
        assert_eq!(found[0].size_bytes, 4);
        Ok(())
    }

    #[test]
    fn test_single_directory_preserves_its_name() -> crate::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "tree/a.txt", b"a");
        write(dir.path(), "tree/sub/b.txt", b"bb");

        let found = discover_files(&[dir.path().join("tree")])?;
        assert_eq!(bundle_paths(&found), vec!["tree/a.txt", "tree/sub/b.txt"]);
        Ok(())
    }

    #[test]
    fn test_multiple_inputs_share_common_ancestor() -> crate::Result<()> {
        let dir = TempDir::new()?;
        let a = write(dir.path(), "left/a.txt", b"a");
        let b = write(dir.path(), "right/b.txt", b"b");

        let found = discover_files(&[a, b])?;
        assert_eq!(bundle_paths(&found), vec!["left/a.txt", "right/b.txt"]);
        Ok(())
    }

    #[test]
    fn test_missing_input_rejected() {
        let dir = TempDir::new().unwrap();
        let result = discover_files(&[dir.path().join("absent")]);
        assert!(matches!(result, Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_empty_directory_yields_no_files() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty");
        fs::create_dir_all(&empty).unwrap();
        let result = discover_files(&[empty]);
        assert!(matches!(result, Err(Error::NoFilesFound)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() -> crate::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "tree/real.txt", b"real");
        std::os::unix::fs::symlink(
            dir.path().join("tree/real.txt"),
            dir.path().join("tree/link.txt"),
        )?;

        let found = discover_files(&[dir.path().join("tree")])?;
        assert_eq!(bundle_paths(&found), vec!["tree/real.txt"]);
        Ok(())
    }
}
