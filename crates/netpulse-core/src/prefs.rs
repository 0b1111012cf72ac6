// ── Preference store ──
//
// Synchronous key/value persistence for UI preferences. The mode
// controller keeps the selected time range under `SELECTED_RANGE_KEY`.

use dashmap::DashMap;

use crate::error::CoreError;

/// Key holding `live` or a time range identifier.
pub const SELECTED_RANGE_KEY: &str = "selected_time_range";

/// Persists small string preferences.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: DashMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with one value.
    pub fn with(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.values.insert(key.to_owned(), value.to_owned());
        store
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryPreferences::new();
        assert_eq!(store.get(SELECTED_RANGE_KEY).ok().flatten(), None);
        store.set(SELECTED_RANGE_KEY, "6h").expect("memory set");
        assert_eq!(
            store.get(SELECTED_RANGE_KEY).ok().flatten().as_deref(),
            Some("6h")
        );
    }
}
