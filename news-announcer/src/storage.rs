use crate::types::{AnnouncerError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error};

/// Read a snapshot, falling back to `T::default()` when the file is missing,
/// unreadable or corrupt. Corruption is logged, never fatal.
pub fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No snapshot at {}, starting empty", path.display());
            return T::default();
        }
        Err(e) => {
            error!("Failed to read {}: {}. Starting empty", path.display(), e);
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            error!("Corrupt snapshot {}: {}. Starting empty", path.display(), e);
            T::default()
        }
    }
}

/// Serialize `value` and atomically replace the file at `path`: the body goes
/// to a sibling `.tmp` file that is then renamed over the target.
pub fn write_snapshot<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let persist_err = |source: std::io::Error| AnnouncerError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let body = serde_json::to_string_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, body).map_err(persist_err)?;
    fs::rename(&tmp, path).map_err(persist_err)?;

    debug!("Wrote snapshot {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let value: Vec<String> = load_or_default(&dir.path().join("absent.json"));
        assert!(value.is_empty());
    }

    #[test]
    fn corrupt_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let value: Vec<String> = load_or_default(&path);
        assert!(value.is_empty());
    }

    #[test]
    fn snapshot_round_trips_and_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        write_snapshot(&path, &vec!["a".to_string(), "b".to_string()]).unwrap();
        let value: Vec<String> = load_or_default(&path);

        assert_eq!(value, vec!["a", "b"]);
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    fn unwritable_target_is_a_persist_error() {
        let dir = TempDir::new().unwrap();
        // A directory sits where the temp file must go.
        let path = dir.path().join("state.json");
        fs::create_dir_all(dir.path().join("state.json.tmp")).unwrap();

        let err = write_snapshot(&path, &Vec::<String>::new()).unwrap_err();
        assert!(err.is_persistence());
    }
}
