// ── File-backed preferences ──
//
// A flat TOML table of string values. Reads go to disk every time so two
// processes sharing the file see each other's writes; writes replace the
// file through a sibling temp file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use netpulse_core::{CoreError, PreferenceStore};

#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the platform data directory.
    pub fn open_default() -> Self {
        Self::new(crate::preferences_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, CoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(prefs_error(&self.path, &e)),
        };
        toml::from_str(&text).map_err(|e| prefs_error(&self.path, &e))
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| prefs_error(&self.path, &e))?;
        }
        let text = toml::to_string(values).map_err(|e| prefs_error(&self.path, &e))?;
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, text).map_err(|e| prefs_error(&tmp, &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| prefs_error(&self.path, &e))
    }
}

fn prefs_error(path: &Path, err: &dyn std::fmt::Display) -> CoreError {
    CoreError::Preferences {
        message: format!("{}: {err}", path.display()),
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CoreError::Preferences {
                message: "preference writer poisoned".into(),
            })?;
        let mut values = self.read_all().unwrap_or_default();
        values.insert(key.to_owned(), value.to_owned());
        self.write_all(&values)?;
        debug!(key, value, path = %self.path.display(), "preference saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpulse_core::SELECTED_RANGE_KEY;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = FilePreferences::new(dir.path().join("prefs.toml"));
        assert_eq!(prefs.get(SELECTED_RANGE_KEY).expect("get"), None);
    }

    #[test]
    fn values_survive_a_new_handle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("prefs.toml");

        FilePreferences::new(&path)
            .set(SELECTED_RANGE_KEY, "24h")
            .expect("set");
        let reopened = FilePreferences::new(&path);
        assert_eq!(
            reopened.get(SELECTED_RANGE_KEY).expect("get").as_deref(),
            Some("24h")
        );
    }

    #[test]
    fn set_keeps_other_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = FilePreferences::new(dir.path().join("prefs.toml"));
        prefs.set("theme", "dark").expect("set theme");
        prefs.set(SELECTED_RANGE_KEY, "live").expect("set range");
        assert_eq!(prefs.get("theme").expect("get").as_deref(), Some("dark"));
    }

    #[test]
    fn corrupt_file_is_an_error_and_is_overwritten_by_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.toml");
        std::fs::write(&path, "selected_time_range = [not toml").expect("write");

        let prefs = FilePreferences::new(&path);
        assert!(matches!(
            prefs.get(SELECTED_RANGE_KEY),
            Err(CoreError::Preferences { .. })
        ));

        prefs.set(SELECTED_RANGE_KEY, "6h").expect("set");
        assert_eq!(
            prefs.get(SELECTED_RANGE_KEY).expect("get").as_deref(),
            Some("6h")
        );
    }
}
