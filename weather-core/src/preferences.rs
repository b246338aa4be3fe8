//! Dark mode and accent colour, persisted write-through.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::PreferenceError,
    store::{ACCENT_COLOR_KEY, DARK_MODE_KEY, KeyValueStore},
};

pub const DEFAULT_ACCENT_COLOR: &str = "#0077ff";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceState {
    pub is_dark_mode: bool,
    pub accent_color_hex: String,
}

/// Owns the preference state; every setter persists before updating memory.
#[derive(Debug)]
pub struct PreferenceController {
    store: Arc<dyn KeyValueStore>,
    state: PreferenceState,
}

impl PreferenceController {
    /// Reads persisted preferences. Dark mode falls back to
    /// `system_prefers_dark` when absent; the accent colour to
    /// [`DEFAULT_ACCENT_COLOR`].
    pub fn load(store: Arc<dyn KeyValueStore>, system_prefers_dark: bool) -> Self {
        let is_dark_mode = match store.get(DARK_MODE_KEY) {
            Ok(Some(raw)) => match raw.as_str() {
                "true" => true,
                "false" => false,
                other => {
                    warn!(value = other, "ignoring unrecognised dark mode preference");
                    system_prefers_dark
                }
            },
            Ok(None) => system_prefers_dark,
            Err(err) => {
                warn!(error = %err, "could not read dark mode preference");
                system_prefers_dark
            }
        };

        let accent_color_hex = match store.get(ACCENT_COLOR_KEY) {
            Ok(Some(raw)) => match normalize_hex(&raw) {
                Some(hex) => hex,
                None => {
                    warn!(value = %raw, "ignoring invalid accent colour preference");
                    DEFAULT_ACCENT_COLOR.to_string()
                }
            },
            Ok(None) => DEFAULT_ACCENT_COLOR.to_string(),
            Err(err) => {
                warn!(error = %err, "could not read accent colour preference");
                DEFAULT_ACCENT_COLOR.to_string()
            }
        };

        Self { store, state: PreferenceState { is_dark_mode, accent_color_hex } }
    }

    pub fn state(&self) -> &PreferenceState {
        &self.state
    }

    pub fn is_dark_mode(&self) -> bool {
        self.state.is_dark_mode
    }

    pub fn accent_color(&self) -> &str {
        &self.state.accent_color_hex
    }

    /// Flips dark mode and returns the new value.
    pub fn toggle_dark_mode(&mut self) -> Result<bool, PreferenceError> {
        let next = !self.state.is_dark_mode;
        self.set_dark_mode(next)?;
        Ok(next)
    }

    pub fn set_dark_mode(&mut self, enabled: bool) -> Result<(), PreferenceError> {
        self.store.set(DARK_MODE_KEY, if enabled { "true" } else { "false" })?;
        self.state.is_dark_mode = enabled;
        info!(dark = enabled, "dark mode updated");
        Ok(())
    }

    /// Accepts `#rgb` or `#rrggbb`; stored lowercase in the long form.
    pub fn set_accent_color(&mut self, hex: &str) -> Result<(), PreferenceError> {
        let normalized =
            normalize_hex(hex).ok_or_else(|| PreferenceError::InvalidAccent(hex.to_string()))?;
        self.store.set(ACCENT_COLOR_KEY, &normalized)?;
        info!(accent = %normalized, "accent colour updated");
        self.state.accent_color_hex = normalized;
        Ok(())
    }
}

fn normalize_hex(raw: &str) -> Option<String> {
    let digits = raw.trim().strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digits = digits.to_ascii_lowercase();
    match digits.len() {
        6 => Some(format!("#{digits}")),
        3 => Some(digits.chars().fold(String::from("#"), |mut acc, c| {
            acc.push(c);
            acc.push(c);
            acc
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;

    #[derive(Debug)]
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn absent_values_fall_back_to_system_and_default() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let prefs = PreferenceController::load(store.clone(), true);
        assert!(prefs.is_dark_mode());
        assert_eq!(prefs.accent_color(), DEFAULT_ACCENT_COLOR);

        let prefs = PreferenceController::load(store, false);
        assert!(!prefs.is_dark_mode());
    }

    #[test]
    fn persisted_value_beats_system_signal() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(DARK_MODE_KEY, "false").unwrap();

        let prefs = PreferenceController::load(store, true);
        assert!(!prefs.is_dark_mode());
    }

    #[test]
    fn preferences_round_trip_across_restart() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let mut prefs = PreferenceController::load(store.clone(), false);
        assert!(prefs.toggle_dark_mode().unwrap());
        prefs.set_accent_color("#FF8800").unwrap();
        let written = prefs.state().clone();
        drop(prefs);

        let reloaded = PreferenceController::load(store, false);
        assert_eq!(reloaded.state(), &written);
        assert_eq!(reloaded.accent_color(), "#ff8800");
    }

    #[test]
    fn short_hex_is_expanded() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut prefs = PreferenceController::load(store.clone(), false);

        prefs.set_accent_color("#0F8").unwrap();
        assert_eq!(prefs.accent_color(), "#00ff88");
        assert_eq!(store.get(ACCENT_COLOR_KEY).unwrap().as_deref(), Some("#00ff88"));
    }

    #[test]
    fn invalid_accent_is_rejected_and_state_kept() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut prefs = PreferenceController::load(store.clone(), false);

        for bad in ["blue", "#12345", "#gggggg", "0077ff"] {
            let err = prefs.set_accent_color(bad).unwrap_err();
            assert!(matches!(err, PreferenceError::InvalidAccent(_)), "{bad}");
        }
        assert_eq!(prefs.accent_color(), DEFAULT_ACCENT_COLOR);
        assert_eq!(store.get(ACCENT_COLOR_KEY).unwrap(), None);
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let mut prefs = PreferenceController::load(Arc::new(ReadOnlyStore), false);

        assert!(prefs.toggle_dark_mode().is_err());
        assert!(!prefs.is_dark_mode());

        assert!(prefs.set_accent_color("#123456").is_err());
        assert_eq!(prefs.accent_color(), DEFAULT_ACCENT_COLOR);
    }

    #[test]
    fn garbage_dark_mode_value_uses_system_signal() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(DARK_MODE_KEY, "").unwrap();
        assert!(PreferenceController::load(store, true).is_dark_mode());
    }
}
