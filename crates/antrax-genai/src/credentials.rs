//! Credential pool with rotation and persistence.
//!
//! The pool holds an ordered list of custom credentials plus an optional
//! primary credential (from the environment). The rotation pointer walks
//! primary → custom[0] → … → custom[n-1] → primary.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{GenAiError, GenAiResult};
use crate::metrics;

// =============================================================================
// Stores
// =============================================================================

/// Persistence for the custom credential list.
pub trait CredentialStore: Send + Sync {
    /// Saved list, or `None` when nothing has been saved yet.
    fn load(&self) -> GenAiResult<Option<Vec<String>>>;

    fn save(&self, keys: &[String]) -> GenAiResult<()>;
}

/// JSON array of strings in a file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for JsonFileStore {
    fn load(&self) -> GenAiResult<Option<Vec<String>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let keys: Vec<String> = serde_json::from_str(&raw)?;
        Ok(Some(keys))
    }

    fn save(&self, keys: &[String]) -> GenAiResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(keys)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Non-persistent store, used in tests and when no file is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: Mutex<Option<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: Mutex::new(Some(keys.into_iter().map(Into::into).collect())),
        }
    }

    /// Last saved list.
    pub fn saved(&self) -> Option<Vec<String>> {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> GenAiResult<Option<Vec<String>>> {
        Ok(self.saved())
    }

    fn save(&self, keys: &[String]) -> GenAiResult<()> {
        *self.keys.lock().unwrap_or_else(PoisonError::into_inner) = Some(keys.to_vec());
        Ok(())
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Position of the rotation pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The environment credential (or the first custom entry when unset).
    Primary,
    Custom(usize),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Primary => write!(f, "primary"),
            Slot::Custom(i) => write!(f, "custom[{}]", i),
        }
    }
}

/// Credential resolved for one attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ActiveCredential {
    pub slot: Slot,
    pub key: String,
}

impl fmt::Debug for ActiveCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveCredential")
            .field("slot", &self.slot)
            .field("key", &mask(&self.key))
            .finish()
    }
}

#[derive(Debug)]
struct PoolState {
    custom: Vec<String>,
    slot: Slot,
}

/// Ordered, never-empty set of interchangeable credentials.
///
/// All reads and writes go through one mutex, so each rotation is a single
/// read-modify-write of the pointer.
pub struct CredentialPool {
    primary: Option<String>,
    defaults: Vec<String>,
    store: Arc<dyn CredentialStore>,
    state: Mutex<PoolState>,
}

impl CredentialPool {
    /// Load the pool from `store`.
    ///
    /// Missing, corrupt or empty saved lists fall back to `defaults`, which
    /// must contain at least one credential.
    pub fn load(
        primary: Option<String>,
        defaults: Vec<String>,
        store: Arc<dyn CredentialStore>,
    ) -> GenAiResult<Self> {
        let primary = primary
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let defaults = sanitize(defaults);
        if defaults.is_empty() {
            return Err(GenAiError::config_error(
                "at least one default credential is required",
            ));
        }

        let custom = match store.load() {
            Ok(Some(saved)) => {
                let saved = sanitize(saved);
                if saved.is_empty() {
                    defaults.clone()
                } else {
                    saved
                }
            }
            Ok(None) => defaults.clone(),
            Err(e) => {
                warn!(error = %e, "Failed to load saved credentials, using defaults");
                defaults.clone()
            }
        };

        info!(
            custom = custom.len(),
            has_primary = primary.is_some(),
            "Credential pool loaded"
        );

        Ok(Self {
            primary,
            defaults,
            store,
            state: Mutex::new(PoolState {
                custom,
                slot: Slot::Primary,
            }),
        })
    }

    /// Add a credential. Returns `false` for blank or duplicate input.
    pub fn add(&self, key: &str) -> GenAiResult<bool> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(false);
        }

        let mut state = self.lock();
        if state.custom.iter().any(|k| k == key) {
            return Ok(false);
        }
        state.custom.push(key.to_string());
        self.store.save(&state.custom)?;
        debug!(count = state.custom.len(), "Credential added");
        Ok(true)
    }

    /// Remove a credential. Removing the last entry restores the defaults;
    /// the pointer falls back to primary when it no longer fits.
    pub fn remove(&self, key: &str) -> GenAiResult<bool> {
        let mut state = self.lock();
        let before = state.custom.len();
        state.custom.retain(|k| k != key);
        let removed = state.custom.len() != before;

        if state.custom.is_empty() {
            state.custom = self.defaults.clone();
        }
        self.store.save(&state.custom)?;

        if let Slot::Custom(i) = state.slot {
            if i >= state.custom.len() {
                state.slot = Slot::Primary;
            }
        }
        debug!(removed, count = state.custom.len(), "Credential removed");
        Ok(removed)
    }

    /// Custom credentials in rotation order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().custom.clone()
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Number of distinct rotation positions (customs plus primary).
    pub fn slot_count(&self) -> usize {
        self.lock().custom.len() + 1
    }

    pub fn current_slot(&self) -> Slot {
        self.lock().slot
    }

    /// Credential for the current pointer position.
    pub fn active(&self) -> Option<ActiveCredential> {
        let state = self.lock();
        let key = match state.slot {
            Slot::Primary => self.primary.clone().or_else(|| state.custom.first().cloned()),
            Slot::Custom(i) => state.custom.get(i).cloned().or_else(|| self.primary.clone()),
        }?;
        Some(ActiveCredential {
            slot: state.slot,
            key,
        })
    }

    /// Advance the pointer, wrapping to primary after the last custom entry.
    pub fn rotate(&self) -> Slot {
        let mut state = self.lock();
        let next = match state.slot {
            Slot::Primary if !state.custom.is_empty() => Slot::Custom(0),
            Slot::Custom(i) if i + 1 < state.custom.len() => Slot::Custom(i + 1),
            _ => Slot::Primary,
        };
        state.slot = next;
        metrics::record_rotation(&next.to_string());
        info!(slot = %next, "Credential rotated");
        next
    }

    /// Return the pointer to primary.
    pub fn reset_rotation(&self) {
        self.lock().slot = Slot::Primary;
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("CredentialPool")
            .field("has_primary", &self.has_primary())
            .field("custom", &state.custom.len())
            .field("slot", &state.slot)
            .finish()
    }
}

fn sanitize(keys: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys {
        let key = key.trim();
        if !key.is_empty() && !out.iter().any(|k| k == key) {
            out.push(key.to_string());
        }
    }
    out
}

/// Last four characters only, for logs.
pub fn mask(key: &str) -> String {
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("…{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(primary: Option<&str>, saved: &[&str]) -> (CredentialPool, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_keys(saved.iter().copied()));
        let pool = CredentialPool::load(
            primary.map(String::from),
            vec!["DEFAULT".to_string()],
            store.clone(),
        )
        .unwrap();
        (pool, store)
    }

    #[test]
    fn test_rotation_visits_each_slot_once() {
        let (pool, _) = pool(Some("Penv"), &["K1", "K2"]);
        let mut seen = vec![pool.active().unwrap().key];
        for _ in 0..2 {
            pool.rotate();
            seen.push(pool.active().unwrap().key);
        }
        assert_eq!(seen, vec!["Penv", "K1", "K2"]);
        assert_eq!(pool.rotate(), Slot::Primary);
    }

    #[test]
    fn test_primary_slot_without_env_uses_first_custom() {
        let (pool, _) = pool(None, &["K1", "K2"]);
        assert_eq!(pool.active().unwrap().key, "K1");
        assert_eq!(pool.active().unwrap().slot, Slot::Primary);
    }

    #[test]
    fn test_add_trims_and_dedupes() {
        let (pool, store) = pool(None, &["K1"]);
        assert!(pool.add("  K2  ").unwrap());
        assert!(!pool.add("K2").unwrap());
        assert!(!pool.add("   ").unwrap());
        assert_eq!(pool.keys(), vec!["K1", "K2"]);
        assert_eq!(store.saved().unwrap(), vec!["K1", "K2"]);
    }

    #[test]
    fn test_removing_last_restores_defaults() {
        let (pool, store) = pool(None, &["K1"]);
        assert!(pool.remove("K1").unwrap());
        assert_eq!(pool.keys(), vec!["DEFAULT"]);
        assert_eq!(store.saved().unwrap(), vec!["DEFAULT"]);
    }

    #[test]
    fn test_remove_clamps_pointer() {
        let (pool, _) = pool(Some("Penv"), &["K1", "K2"]);
        pool.rotate();
        pool.rotate();
        assert_eq!(pool.current_slot(), Slot::Custom(1));
        pool.remove("K2").unwrap();
        assert_eq!(pool.current_slot(), Slot::Primary);
    }

    #[test]
    fn test_empty_saved_list_falls_back() {
        let (pool, _) = pool(None, &[]);
        assert_eq!(pool.keys(), vec!["DEFAULT"]);
    }

    #[test]
    fn test_empty_defaults_rejected() {
        let result = CredentialPool::load(None, vec![" ".into()], Arc::new(MemoryStore::new()));
        assert!(matches!(result, Err(GenAiError::Config(_))));
    }

    #[test]
    fn test_reset_rotation() {
        let (pool, _) = pool(Some("Penv"), &["K1"]);
        pool.rotate();
        pool.reset_rotation();
        assert_eq!(pool.active().unwrap().key, "Penv");
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("keys.json"));
        assert!(store.load().unwrap().is_none());
        store.save(&["A".to_string(), "B".to_string()]).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, "not json").unwrap();
        let pool = CredentialPool::load(
            None,
            vec!["DEFAULT".into()],
            Arc::new(JsonFileStore::new(&path)),
        )
        .unwrap();
        assert_eq!(pool.keys(), vec!["DEFAULT"]);
    }

    #[test]
    fn test_mask_hides_key() {
        assert_eq!(mask("AIzaSECRET1234"), "…1234");
        let active = ActiveCredential { slot: Slot::Primary, key: "supersecret".into() };
        assert!(!format!("{:?}", active).contains("supersecret"));
    }
}
