// ABOUTME: Drop guard for temporary files created during an upload
// ABOUTME: Removes the file on every exit path, success or error

use crate::error::{ImgupError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    // Removed after the file itself when the guard drops
    dir: Option<TempDir>,
}

impl ScratchFile {
    /// Take ownership of an existing file.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dir: None,
        }
    }

    /// Copy `source` into a fresh directory under `dir`. The copy keeps the
    /// source's filename so the upload is named after it.
    pub fn copy_into(source: &Path, dir: &Path) -> Result<Self> {
        let name = source.file_name().ok_or_else(|| {
            ImgupError::Configuration(format!("{} has no filename", source.display()))
        })?;
        std::fs::create_dir_all(dir).map_err(|e| ImgupError::io(dir, e))?;
        let unique = tempfile::Builder::new()
            .prefix("upload-")
            .tempdir_in(dir)
            .map_err(|e| ImgupError::io(dir, e))?;

        let path = unique.path().join(name);
        if same_file(source, &path) {
            return Err(ImgupError::Configuration(format!(
                "{} is its own scratch copy",
                source.display()
            )));
        }
        std::fs::copy(source, &path).map_err(|e| ImgupError::io(source, e))?;
        log::debug!("Copied {} to {}", source.display(), path.display());
        Ok(Self {
            path,
            dir: Some(unique),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed scratch file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove {}: {}", self.path.display(), e),
        }
        if let Some(dir) = self.dir.take() {
            let shown = dir.path().display().to_string();
            if let Err(e) = dir.close() {
                log::warn!("Could not remove {shown}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_and_cleanup() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.jpg");
        std::fs::write(&source, b"bytes").unwrap();
        let scratch_root = dir.path().join("scratch");

        let copied_path = {
            let scratch = ScratchFile::copy_into(&source, &scratch_root).unwrap();
            assert_eq!(scratch.path().file_name().unwrap(), "photo.jpg");
            assert_eq!(std::fs::read(scratch.path()).unwrap(), b"bytes");
            scratch.path().to_path_buf()
        };

        assert!(!copied_path.exists());
        assert_eq!(std::fs::read_dir(&scratch_root).unwrap().count(), 0);
        assert!(source.exists());
    }

    #[test]
    fn test_same_filename_from_two_folders_gets_two_copies() {
        let dir = TempDir::new().unwrap();
        let scratch_root = dir.path().join("scratch");
        let mut sources = Vec::new();
        for (folder, body) in [("a", b"first"), ("b", b"other")] {
            std::fs::create_dir(dir.path().join(folder)).unwrap();
            let path = dir.path().join(folder).join("photo.jpg");
            std::fs::write(&path, body).unwrap();
            sources.push(path);
        }

        let first = ScratchFile::copy_into(&sources[0], &scratch_root).unwrap();
        let second = ScratchFile::copy_into(&sources[1], &scratch_root).unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read(first.path()).unwrap(), b"first");
        assert_eq!(std::fs::read(second.path()).unwrap(), b"other");
    }

    #[test]
    fn test_source_inside_scratch_dir_is_left_intact() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.jpg");
        std::fs::write(&source, b"original").unwrap();

        {
            let scratch = ScratchFile::copy_into(&source, dir.path()).unwrap();
            assert_ne!(scratch.path(), source.as_path());
            assert_eq!(std::fs::read(scratch.path()).unwrap(), b"original");
        }

        assert_eq!(std::fs::read(&source).unwrap(), b"original");
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = ScratchFile::copy_into(&dir.path().join("nope.jpg"), dir.path()).unwrap_err();
        assert!(matches!(err, ImgupError::Io { .. }));
    }

    #[test]
    fn test_adopt_tolerates_already_removed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.jpg");
        drop(ScratchFile::adopt(&path));
        assert!(!path.exists());
    }
}
