use crate::error::{BoothError, BoothResult};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Flat string key-value persistence.
///
/// Every call goes to the backing medium; nothing is cached between calls.
pub trait Storage {
    fn get_item(&self, key: &str) -> BoothResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> BoothResult<()>;

    fn remove_item(&self, key: &str) -> BoothResult<()>;
}

/// Key-value blob kept as a JSON object in a single file
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> BoothResult<BTreeMap<String, String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(BoothError::storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&text).map_err(|e| {
            BoothError::storage(format!("corrupt storage file {}: {e}", self.path.display()))
        })
    }

    fn write_all(&self, map: &BTreeMap<String, String>) -> BoothResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    BoothError::storage(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }

        let text = serde_json::to_string(map)
            .map_err(|e| BoothError::storage(format!("failed to serialize storage: {e}")))?;

        // Write then rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)
            .map_err(|e| BoothError::storage(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            BoothError::storage(format!("failed to replace {}: {e}", self.path.display()))
        })
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> BoothResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> BoothResult<()> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value.to_string());
        self.write_all(&map)
    }

    fn remove_item(&self, key: &str) -> BoothResult<()> {
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }
}

/// In-process storage, used by tests and throwaway sessions
#[derive(Default)]
pub struct MemoryStorage {
    items: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> BoothResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> BoothResult<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> BoothResult<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for &S {
    fn get_item(&self, key: &str) -> BoothResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> BoothResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> BoothResult<()> {
        (**self).remove_item(key)
    }
}

#[cfg(test)]
pub(crate) fn temp_path(name: &str) -> PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir().join(format!(
        "photo-booth-{}-{}-{}",
        name,
        std::process::id(),
        nanos
    ))
}
