//! Device flag sources
//!
//! Flags are keyed by `(namespace, key)` pairs and read with typed defaults.
//! A source also exposes a change-generation stream: every bump means "flags
//! may have changed" and triggers the configuration manager's debounced
//! re-resolution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::sync::watch;

use alcove_core::prelude::*;
use alcove_core::DeviceFlags;

/// A device flag address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlagKey {
    pub namespace: &'static str,
    pub key: &'static str,
}

pub const FLAG_CLOUD_MEDIA: FlagKey = FlagKey {
    namespace: "alcove",
    key: "cloud_media_enabled",
};
pub const FLAG_ALBUM_GRID: FlagKey = FlagKey {
    namespace: "alcove",
    key: "album_grid_enabled",
};
pub const FLAG_ORDERED_SELECTION: FlagKey = FlagKey {
    namespace: "alcove",
    key: "ordered_selection_enabled",
};
pub const FLAG_EXPRESSIVE_THEME: FlagKey = FlagKey {
    namespace: "alcove",
    key: "expressive_theme_enabled",
};

/// A source of device flags.
///
/// Reads are synchronous and infallible (the typed default covers missing or
/// malformed entries). `subscribe` yields a generation counter; receivers
/// treat any bump as a change notification and re-read.
pub trait FlagSource: Send + Sync {
    fn read_bool(&self, key: FlagKey, default: bool) -> bool;

    /// Subscribe to change notifications (a monotonically bumped generation).
    fn subscribe(&self) -> watch::Receiver<u64>;
}

/// Resolve the full [`DeviceFlags`] set from a source with typed defaults.
pub fn resolve_flags(source: &dyn FlagSource) -> DeviceFlags {
    let defaults = DeviceFlags::default();
    DeviceFlags {
        cloud_media_enabled: source.read_bool(FLAG_CLOUD_MEDIA, defaults.cloud_media_enabled),
        album_grid_enabled: source.read_bool(FLAG_ALBUM_GRID, defaults.album_grid_enabled),
        ordered_selection_enabled: source
            .read_bool(FLAG_ORDERED_SELECTION, defaults.ordered_selection_enabled),
        expressive_theme_enabled: source
            .read_bool(FLAG_EXPRESSIVE_THEME, defaults.expressive_theme_enabled),
    }
}

// ─────────────────────────────────────────────────────────────────
// StaticFlagSource
// ─────────────────────────────────────────────────────────────────

/// In-memory flag source. The default for hosts without a flag service, and
/// the test double everywhere.
pub struct StaticFlagSource {
    values: Mutex<HashMap<(&'static str, String), bool>>,
    generation_tx: watch::Sender<u64>,
}

impl StaticFlagSource {
    pub fn new() -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self {
            values: Mutex::new(HashMap::new()),
            generation_tx,
        }
    }

    /// Set a flag and bump the change generation.
    pub fn set_bool(&self, key: FlagKey, value: bool) {
        self.values
            .lock()
            .unwrap()
            .insert((key.namespace, key.key.to_string()), value);
        self.generation_tx.send_modify(|generation| *generation += 1);
    }
}

impl Default for StaticFlagSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagSource for StaticFlagSource {
    fn read_bool(&self, key: FlagKey, default: bool) -> bool {
        self.values
            .lock()
            .unwrap()
            .get(&(key.namespace, key.key.to_string()))
            .copied()
            .unwrap_or(default)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation_tx.subscribe()
    }
}

// ─────────────────────────────────────────────────────────────────
// TomlFlagSource
// ─────────────────────────────────────────────────────────────────

/// File-backed flag source reading `[namespace] key = bool` TOML tables.
///
/// The file is read once at construction; `reload()` re-reads it and bumps
/// the change generation.
#[derive(Debug)]
pub struct TomlFlagSource {
    path: PathBuf,
    values: Mutex<HashMap<(String, String), bool>>,
    generation_tx: watch::Sender<u64>,
}

impl TomlFlagSource {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = Self::read_file(&path)?;
        let (generation_tx, _) = watch::channel(0);
        Ok(Self {
            path,
            values: Mutex::new(values),
            generation_tx,
        })
    }

    /// Re-read the backing file and notify subscribers.
    pub fn reload(&self) -> Result<()> {
        let values = Self::read_file(&self.path)?;
        *self.values.lock().unwrap() = values;
        self.generation_tx.send_modify(|generation| *generation += 1);
        Ok(())
    }

    fn read_file(path: &Path) -> Result<HashMap<(String, String), bool>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::flag_file(format!("cannot read {}: {e}", path.display())))?;
        let table: toml::Table = toml::from_str(&contents)?;

        let mut values = HashMap::new();
        for (namespace, entry) in table {
            let toml::Value::Table(flags) = entry else {
                return Err(Error::flag_file(format!(
                    "[{namespace}] is not a table of flags"
                )));
            };
            for (key, value) in flags {
                let toml::Value::Boolean(flag) = value else {
                    return Err(Error::flag_file(format!(
                        "{namespace}.{key} is not a boolean"
                    )));
                };
                values.insert((namespace.clone(), key), flag);
            }
        }
        Ok(values)
    }
}

impl FlagSource for TomlFlagSource {
    fn read_bool(&self, key: FlagKey, default: bool) -> bool {
        self.values
            .lock()
            .unwrap()
            .get(&(key.namespace.to_string(), key.key.to_string()))
            .copied()
            .unwrap_or(default)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation_tx.subscribe()
    }
}
