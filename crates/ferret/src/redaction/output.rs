//! Output structure manager.
//!
//! Mirrors each input path under the configured output root with secure
//! permissions (0700 directories, 0600 files). Name collisions get a numeric
//! suffix.

use crate::error::{FerretError, Result};
use std::path::{Component, Path, PathBuf};

pub struct OutputManager {
    root: PathBuf,
}

impl OutputManager {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|err| FerretError::from(err).with_path(&root))?;
        restrict_dir_permissions(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mirror an input path under the root, creating parents, and resolve
    /// collisions with a numeric suffix.
    pub fn prepare(&self, input: &Path) -> Result<PathBuf> {
        // Strip roots and parent hops so the mirror stays inside the output
        // tree.
        let relative: PathBuf = input
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        let mut candidate = self.root.join(&relative);

        if let Some(parent) = candidate.parent() {
            std::fs::create_dir_all(parent).map_err(|err| FerretError::from(err).with_path(parent))?;
            let mut dir = parent.to_path_buf();
            while dir.starts_with(&self.root) {
                restrict_dir_permissions(&dir)?;
                if !dir.pop() {
                    break;
                }
            }
        }

        let mut counter = 1u32;
        while candidate.exists() {
            let stem = relative.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
            let name = match relative.extension().and_then(|e| e.to_str()) {
                Some(ext) => format!("{}_{}.{}", stem, counter, ext),
                None => format!("{}_{}", stem, counter),
            };
            candidate = match relative.parent() {
                Some(parent) => self.root.join(parent).join(name),
                None => self.root.join(name),
            };
            counter += 1;
        }
        Ok(candidate)
    }

    /// Write bytes at a prepared path with 0600 permissions.
    pub fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        std::fs::write(path, bytes).map_err(|err| FerretError::from(err).with_path(path))?;
        restrict_file_permissions(path)
    }
}

#[cfg(unix)]
pub fn restrict_file_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|err| FerretError::from(err).with_path(path))
}

#[cfg(unix)]
pub fn restrict_dir_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|err| FerretError::from(err).with_path(path))
}

#[cfg(not(unix))]
pub fn restrict_file_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(not(unix))]
pub fn restrict_dir_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_input_path_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let manager = OutputManager::new(dir.path().join("out")).unwrap();
        let out = manager.prepare(Path::new("/data/reports/q3.txt")).unwrap();
        assert!(out.starts_with(manager.root()));
        assert!(out.ends_with("data/reports/q3.txt"));
    }

    #[test]
    fn collision_appends_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let manager = OutputManager::new(dir.path().join("out")).unwrap();

        let first = manager.prepare(Path::new("notes.txt")).unwrap();
        manager.write(&first, b"one").unwrap();
        let second = manager.prepare(Path::new("notes.txt")).unwrap();
        assert!(second.ends_with("notes_1.txt"), "got {:?}", second);
    }

    #[cfg(unix)]
    #[test]
    fn written_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let manager = OutputManager::new(dir.path().join("out")).unwrap();
        let out = manager.prepare(Path::new("secret.txt")).unwrap();
        manager.write(&out, b"hidden").unwrap();

        let mode = std::fs::metadata(&out).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let dir_mode = std::fs::metadata(manager.root()).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn parent_traversal_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let manager = OutputManager::new(dir.path().join("out")).unwrap();
        let out = manager.prepare(Path::new("../../etc/passwd")).unwrap();
        assert!(out.starts_with(manager.root()));
    }
}
