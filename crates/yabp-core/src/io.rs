use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting config files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write `value` as pretty JSON (2-space indent), atomically.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    atomic_write(path, data.as_bytes())
}

/// Read a JSON file, returning `T::default()` when the file does not exist.
pub fn read_json_or_default<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Write `data` to a file that must not exist yet. Used for write-once logs.
pub fn write_new(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    f.write_all(data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/config.json");
        atomic_write(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn read_json_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let value: serde_json::Map<String, serde_json::Value> =
            read_json_or_default(&dir.path().join("nope.json")).unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn write_json_uses_two_space_indent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn write_new_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.md");
        write_new(&path, b"first").unwrap();
        assert!(write_new(&path, b"second").is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");
    }
}
