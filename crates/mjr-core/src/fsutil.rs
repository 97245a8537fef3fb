//! Small filesystem helpers used by the runner's cleanup path.

use std::io;
use std::path::Path;

/// Remove `path` if it exists. Returns whether a file was actually removed.
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_existing_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.mp4");
        std::fs::write(&path, b"partial").unwrap();

        assert!(remove_file_if_exists(&path).unwrap());
        assert!(!path.exists());
        assert!(!remove_file_if_exists(&path).unwrap());
    }
}
