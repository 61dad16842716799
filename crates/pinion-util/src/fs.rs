//! Filesystem helpers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Read a file to a string, replacing invalid UTF-8 sequences.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write `bytes` to `path` atomically: write to a temporary file in the
/// same directory, then rename over the destination.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written or the rename
/// fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_sibling(path);
    fs::write(&tmp, bytes)?;
    match fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(err) => {
            // Windows cannot rename over an existing file; fall back to
            // copy-and-delete.
            if path.exists() {
                fs::copy(&tmp, path)?;
                fs::remove_file(&tmp)?;
                Ok(())
            } else {
                let _ = fs::remove_file(&tmp);
                Err(err)
            }
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| String::from("out"), |n| n.to_string_lossy().into_owned());
    let tmp_name = format!(".{name}.tmp.{}", std::process::id());
    path.with_file_name(tmp_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_to_string_lossy_replaces_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        fs::write(&path, [b'h', b'i', 0xFF, b'!']).unwrap();
        let content = read_to_string_lossy(&path).unwrap();
        assert_eq!(content, "hi\u{FFFD}!");
    }

    #[test]
    fn test_atomic_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn test_atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, b"old").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        atomic_write(&path, b"data").unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
