//! Persisted settings document (feature flags, moderation, per-feature params).
//!
//! `ConfigStore` owns the canonical document. It is constructed once at process
//! start and shared by `Arc`; every mutation is written to disk before it becomes
//! visible in memory.

pub mod defaults;
pub mod merge;
pub mod normalize;
pub mod prefix;

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    domain::jid_user,
    errors::Error,
    jsonc,
    ports::{FeatureObserver, OwnerResolver},
    Result,
};

use self::{
    defaults::{default_document, ensure_schema_first, schema_is_first},
    merge::{deep_merge, merge_with_defaults},
    normalize::normalize_legacy_values,
    prefix::display_prefix,
};

const FEATURES: &str = "features";
const DISABLED_COMMANDS: &str = "disabled_commands";

/// On-disk locations used by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorePaths {
    /// Backing file (JSON, comments allowed on input).
    pub config_file: PathBuf,
    /// Legacy overrides file, imported once.
    pub legacy_overrides_file: PathBuf,
    /// Zero-byte marker; its existence means the import already ran.
    pub migration_marker: PathBuf,
}

impl StorePaths {
    /// Conventional layout inside a data directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config_file: dir.join("config.jsonc"),
            legacy_overrides_file: dir.join("overrides.json"),
            migration_marker: dir.join(".overrides-migrated"),
        }
    }
}

/// What a `load()` call did. Mostly useful for logging and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// The backing file was missing or unusable; defaults were seeded.
    pub seeded_defaults: bool,
    /// Load error that was recovered from, if any.
    pub recovered_from: Option<String>,
    /// The legacy overrides import ran during this call.
    pub migrated: bool,
    /// At least one legacy value was coerced.
    pub normalized: bool,
    /// The backing file was rewritten.
    pub persisted: bool,
}

pub struct ConfigStore {
    paths: StorePaths,
    defaults: Map<String, Value>,
    doc: Mutex<Map<String, Value>>,
    observers: RwLock<Vec<Arc<dyn FeatureObserver>>>,
}

impl ConfigStore {
    /// Create a store holding the built-in defaults. Nothing is read until `load()`.
    pub fn new(paths: StorePaths) -> Self {
        Self::with_defaults(paths, default_document())
    }

    pub fn with_defaults(paths: StorePaths, defaults: Map<String, Value>) -> Self {
        Self {
            paths,
            doc: Mutex::new(defaults.clone()),
            defaults,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// `new` + `load`.
    pub fn open(paths: StorePaths) -> Self {
        let store = Self::new(paths);
        store.load();
        store
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    // ============== Load Pipeline ==============

    /// Load (or seed) the backing file and bring it up to date.
    ///
    /// Never fails: an unreadable or malformed file is logged and treated as
    /// absent, so defaults are written in its place.
    pub fn load(&self) -> LoadReport {
        let mut doc = self.lock_doc();
        let mut report = LoadReport::default();

        let loaded = match self.read_backing_file() {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(error = %e, "config unreadable; falling back to defaults");
                report.recovered_from = Some(e.to_string());
                None
            }
        };

        let (mut next, mut dirty) = match loaded {
            Some(loaded) => {
                let merged = merge_with_defaults(&self.defaults, &loaded);
                let dirty = merged != loaded || !schema_is_first(&loaded);
                (merged, dirty)
            }
            None => {
                report.seeded_defaults = true;
                (self.defaults.clone(), true)
            }
        };

        if let Some(changed) = self.migrate_legacy_overrides(&mut next) {
            report.migrated = true;
            dirty |= changed;
        }

        if normalize_legacy_values(&mut next) {
            report.normalized = true;
            dirty = true;
        }

        let next = ensure_schema_first(next);

        if dirty {
            match self.write(&next) {
                Ok(()) => report.persisted = true,
                Err(e) => tracing::warn!(
                    path = %self.paths.config_file.display(),
                    error = %e,
                    "failed to persist config"
                ),
            }
        }

        *doc = next;
        report
    }

    /// Pick up out-of-band edits to the backing file.
    pub fn reload(&self) -> LoadReport {
        self.load()
    }

    /// `Ok(None)` when the file does not exist.
    fn read_backing_file(&self) -> Result<Option<Map<String, Value>>> {
        let path = &self.paths.config_file;
        if !path.exists() {
            return Ok(None);
        }

        match jsonc::load(path).map_err(|e| Error::config_load(path, e))? {
            Value::Object(map) => Ok(Some(map)),
            other => Err(Error::config_load(
                path,
                format!("top-level value must be an object, found {}", type_name(&other)),
            )),
        }
    }

    /// One-time import of the legacy overrides file.
    ///
    /// `None` if the import is not due; `Some(changed)` if it ran. The marker is
    /// written even when the overrides file is empty or malformed.
    fn migrate_legacy_overrides(&self, doc: &mut Map<String, Value>) -> Option<bool> {
        let legacy = &self.paths.legacy_overrides_file;
        if !legacy.exists() || self.paths.migration_marker.exists() {
            return None;
        }

        let before = doc.clone();
        match jsonc::load(legacy) {
            Ok(Value::Object(overrides)) => {
                deep_merge(doc, &overrides);
                tracing::info!(
                    path = %legacy.display(),
                    keys = overrides.len(),
                    "imported legacy config overrides"
                );
            }
            Ok(other) => tracing::warn!(
                path = %legacy.display(),
                found = type_name(&other),
                "legacy overrides are not an object; skipping import"
            ),
            Err(e) => tracing::warn!(
                path = %legacy.display(),
                error = %e,
                "legacy overrides unreadable; skipping import"
            ),
        }

        if let Err(e) = write_marker(&self.paths.migration_marker) {
            tracing::warn!(
                path = %self.paths.migration_marker.display(),
                error = %e,
                "failed to write migration marker"
            );
        }

        Some(*doc != before)
    }

    // ============== Generic Access ==============

    pub fn get(&self, key: &str, default: Value) -> Value {
        self.get_nested(&[key], default)
    }

    /// Walk `keys`; `default` as soon as a node is missing or not a section.
    pub fn get_nested(&self, keys: &[&str], default: Value) -> Value {
        let doc = self.lock_doc();
        lookup(&doc, keys).cloned().unwrap_or(default)
    }

    /// Typed read; `None` if the key is missing or does not deserialize into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_nested_as(&[key])
    }

    pub fn get_nested_as<T: DeserializeOwned>(&self, keys: &[&str]) -> Option<T> {
        let doc = self.lock_doc();
        let value = lookup(&doc, keys)?.clone();
        serde_json::from_value(value).ok()
    }

    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_nested(&[key], value)
    }

    /// Write `value` at `keys`, creating intermediate sections, then persist.
    pub fn set_nested(&self, keys: &[&str], value: Value) -> Result<()> {
        self.mutate(|doc| {
            insert_nested(doc, keys, value)?;
            Ok(true)
        })
        .map(|_| ())
    }

    /// Whole document, `$schema` first.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.lock_doc().clone())
    }

    // ============== Feature Flags ==============

    pub fn get_feature(&self, name: &str) -> bool {
        self.get_nested(&[FEATURES, name], Value::Bool(false))
            .as_bool()
            .unwrap_or(false)
    }

    /// Persist the flag, then notify subscribers.
    pub fn set_feature(&self, name: &str, enabled: bool) -> Result<()> {
        self.set_nested(&[FEATURES, name], Value::Bool(enabled))?;

        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_feature_changed(name, enabled);
        }
        Ok(())
    }

    /// Boolean entries of the `features` section; other values are skipped.
    pub fn get_all_features(&self) -> BTreeMap<String, bool> {
        let doc = self.lock_doc();
        let Some(Value::Object(features)) = doc.get(FEATURES) else {
            return BTreeMap::new();
        };
        features
            .iter()
            .filter_map(|(k, v)| v.as_bool().map(|b| (k.clone(), b)))
            .collect()
    }

    pub fn subscribe(&self, observer: Arc<dyn FeatureObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    // ============== Disabled Commands ==============

    pub fn disabled_commands(&self) -> Vec<String> {
        let doc = self.lock_doc();
        match doc.get(DISABLED_COMMANDS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_command_enabled(&self, name: &str) -> bool {
        let name = command_key(name);
        !self
            .disabled_commands()
            .iter()
            .any(|c| c.to_lowercase() == name)
    }

    /// `Ok(true)` if the command was disabled and is now enabled.
    pub fn enable_command(&self, name: &str) -> Result<bool> {
        let name = command_key(name);
        if name.is_empty() {
            return Ok(false);
        }

        self.mutate(|doc| {
            let Some(Value::Array(items)) = doc.get_mut(DISABLED_COMMANDS) else {
                return Ok(false);
            };
            let before = items.len();
            items.retain(|v| v.as_str().map(str::to_lowercase).as_deref() != Some(name.as_str()));
            Ok(items.len() != before)
        })
    }

    /// `Ok(true)` if the command was enabled and is now disabled.
    pub fn disable_command(&self, name: &str) -> Result<bool> {
        let name = command_key(name);
        if name.is_empty() {
            return Ok(false);
        }

        self.mutate(|doc| {
            let entry = doc
                .entry(DISABLED_COMMANDS.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !entry.is_array() {
                *entry = Value::Array(Vec::new());
            }
            let Value::Array(items) = entry else {
                return Ok(false);
            };

            let exists = items
                .iter()
                .filter_map(Value::as_str)
                .any(|c| c.to_lowercase() == name);
            if exists {
                return Ok(false);
            }
            items.push(Value::String(name.clone()));
            Ok(true)
        })
    }

    // ============== Owner ==============

    /// Configured owner JID; `None` when unset or empty.
    pub fn get_owner_jid(&self) -> Option<String> {
        self.get_nested(&["bot", "owner_jid"], Value::Null)
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn set_owner_jid(&self, jid: &str) -> Result<()> {
        self.set_nested(&["bot", "owner_jid"], Value::String(jid.trim().to_string()))
    }

    /// Compare only the user part of both JIDs (no cross-identifier-space lookup).
    pub fn is_owner(&self, sender_jid: &str) -> bool {
        let Some(owner) = self.get_owner_jid() else {
            return false;
        };
        same_user(&owner, sender_jid)
    }

    /// Owner check that can see through alternate identifier spaces.
    ///
    /// A positive `is_owner` is final. Otherwise both JIDs go through `resolver`
    /// (unmapped ids are compared as given); resolver errors fall back to `false`.
    pub async fn is_owner_resolved(&self, sender_jid: &str, resolver: &dyn OwnerResolver) -> bool {
        if self.is_owner(sender_jid) {
            return true;
        }
        let Some(owner) = self.get_owner_jid() else {
            return false;
        };

        let owner_canonical = match resolver.resolve(&owner).await {
            Ok(resolved) => resolved.unwrap_or(owner),
            Err(e) => {
                tracing::debug!(error = %e, "owner jid resolution failed");
                return false;
            }
        };
        let sender_canonical = match resolver.resolve(sender_jid).await {
            Ok(resolved) => resolved.unwrap_or_else(|| sender_jid.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "sender jid resolution failed");
                return false;
            }
        };

        same_user(&owner_canonical, &sender_canonical)
    }

    // ============== Prefix ==============

    /// One example prefix character for help texts (see `prefix::display_prefix`).
    pub fn get_display_prefix(&self) -> String {
        let raw = self.get_nested(&["bot", "prefix"], Value::from("."));
        display_prefix(raw.as_str().unwrap_or("."))
    }

    // ============== Internals ==============

    fn lock_doc(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read-modify-write under the document lock.
    ///
    /// `f` edits a copy and reports whether anything changed. A changed copy is
    /// persisted and only then committed, so a failed write leaves memory as it was.
    fn mutate(&self, f: impl FnOnce(&mut Map<String, Value>) -> Result<bool>) -> Result<bool> {
        let mut doc = self.lock_doc();
        let mut next = doc.clone();
        if !f(&mut next)? {
            return Ok(false);
        }
        let next = ensure_schema_first(next);
        self.write(&next)?;
        *doc = next;
        Ok(true)
    }

    fn write(&self, doc: &Map<String, Value>) -> Result<()> {
        jsonc::save(&self.paths.config_file, &Value::Object(doc.clone()))
    }
}

fn lookup<'a>(doc: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    let (first, rest) = keys.split_first()?;
    let mut cur = doc.get(*first)?;
    for key in rest {
        cur = cur.as_object()?.get(*key)?;
    }
    Some(cur)
}

fn insert_nested(doc: &mut Map<String, Value>, keys: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = keys.split_last() else {
        return Err(Error::InvalidKeyPath("empty key path".to_string()));
    };

    let mut cur = doc;
    for key in parents {
        let entry = cur
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(section) = entry else {
            return Err(Error::InvalidKeyPath(keys.join(".")));
        };
        cur = section;
    }

    cur.insert(last.to_string(), value);
    Ok(())
}

fn write_marker(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, b"")?;
    Ok(())
}

fn command_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn same_user(a: &str, b: &str) -> bool {
    let a = jid_user(a.trim());
    !a.is_empty() && a == jid_user(b.trim())
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
