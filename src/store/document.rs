/// JSON document I/O shared by the configuration store and backup manifests
///
/// Reads distinguish "absent" from "present but unparseable". Writes go to a
/// temp file in the same directory, get fsynced, then renamed over the target.

use crate::error::{RecallError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Read a JSON document
///
/// # Returns
/// * `Ok(None)` - The file does not exist
/// * `Ok(Some(T))` - The file exists and parsed
/// * `Err(RecallError::CorruptRecord)` - The file exists but does not parse as `T`
/// * `Err(RecallError::Io)` - Any other read failure
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| RecallError::CorruptRecord {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Write a JSON document atomically (pretty-printed)
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_bytes(path, &json)
}

/// Write raw bytes atomically: temp file + fsync + rename
///
/// Readers never observe a half-written file. Any failure maps to
/// `StorageWrite` for the final path.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    write_atomic(path, bytes).map_err(|source| RecallError::StorageWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let temp_path = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        // Don't leave the temp file behind
        let _ = fs::remove_file(&temp_path);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn test_read_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let doc: Option<Doc> = read_json(&temp.path().join("nope.json")).unwrap();
        assert!(doc.is_none());
    }

    #[test]
    fn test_read_corrupt_is_distinct() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "{ \"name\": \"half").unwrap();

        match read_json::<Doc>(&path) {
            Err(RecallError::CorruptRecord { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected CorruptRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("doc.json");
        let doc = Doc {
            name: "web".to_string(),
            count: 3,
        };

        write_json(&path, &doc).unwrap();
        let loaded: Doc = read_json(&path).unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.json");

        write_bytes(&path, b"first").unwrap();
        write_bytes(&path, b"second").unwrap();

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["doc.json".to_string()]);
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_write_failure_is_storage_write() {
        let temp = TempDir::new().unwrap();
        // A regular file where a directory is needed
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        match write_bytes(&blocker.join("doc.json"), b"data") {
            Err(RecallError::StorageWrite { path, .. }) => {
                assert_eq!(path, blocker.join("doc.json"))
            }
            other => panic!("Expected StorageWrite, got {:?}", other),
        }
    }
}
