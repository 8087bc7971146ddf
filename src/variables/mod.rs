//! Scoped variable store shared by every evaluation.
//!
//! Variables are addressed by `(scope, correlation key, name)`. Rule actions
//! write them, later evaluations read them back, which is how rules correlate
//! state across events of the same process or container.
//!
//! The store is the only mutable state shared between evaluation workers. It is
//! a sharded [`DashMap`], so operations on one key are linearizable and
//! operations on unrelated keys do not contend.

pub mod scope;
pub mod snapshot;

pub use scope::{FieldKey, GlobalKey, Scope, ScopeKeyProvider, ScopeRegistry};
pub use snapshot::{SnapshotEntry, VariableSnapshot};

use crate::config::VariableConfig;
use crate::value::Value;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Address of one variable instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableKey {
    pub scope: Scope,
    /// Correlation key: empty for global variables, the process or container
    /// identity otherwise.
    pub key: String,
    pub name: String,
}

impl VariableKey {
    pub fn new(scope: Scope, key: &str, name: &str) -> Self {
        Self {
            scope,
            key: key.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: Value,
    expires_at: Option<Instant>,
}

impl StoredValue {
    /// A TTL too large to be represented as a deadline never expires.
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

/// Counters describing store usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariableStoreStats {
    /// Entries currently held, including expired ones not yet evicted.
    pub entries: usize,
    /// Writes refused because their scope was at capacity.
    pub rejected_writes: u64,
    /// Writes skipped because the event had no key in the target scope.
    pub skipped_writes: u64,
    /// Entries evicted after their TTL elapsed.
    pub expired: u64,
}

/// Concurrent store of scoped variables.
///
/// Reads of unset variables return the value declared for `(scope, name)` with
/// [`declare`](Self::declare), or `Bool(false)` for undeclared variables.
/// Expired entries are evicted lazily on access, or in bulk by
/// [`purge_expired`](Self::purge_expired).
///
/// # Example
/// ```rust,ignore
/// let store = VariableStore::new();
/// store.declare(Scope::Container, "foo", Value::Int(0));
///
/// store.set(Scope::Container, "abc", "foo", Value::Int(1));
/// assert_eq!(store.get(&Scope::Container, "abc", "foo"), Value::Int(1));
/// assert_eq!(store.get(&Scope::Container, "def", "foo"), Value::Int(0));
/// ```
#[derive(Debug, Default)]
pub struct VariableStore {
    entries: DashMap<VariableKey, StoredValue>,
    declarations: DashMap<(Scope, String), Value>,
    scope_counts: DashMap<Scope, AtomicUsize>,
    config: VariableConfig,
    rejected_writes: AtomicU64,
    skipped_writes: AtomicU64,
    expired: AtomicU64,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::with_config(VariableConfig::default())
    }

    pub fn with_config(config: VariableConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &VariableConfig {
        &self.config
    }

    /// Record the default returned for `(scope, name)` while it is unset.
    pub fn declare(&self, scope: Scope, name: &str, default: Value) {
        self.declarations.insert((scope, name.to_string()), default);
    }

    /// Default value of `(scope, name)`.
    pub fn default_value(&self, scope: &Scope, name: &str) -> Value {
        self.declarations
            .get(&(scope.clone(), name.to_string()))
            .map(|declared| declared.value().clone())
            .unwrap_or(Value::Bool(false))
    }

    /// Current value, or the default when unset or expired.
    pub fn get(&self, scope: &Scope, key: &str, name: &str) -> Value {
        self.lookup(scope, key, name)
            .unwrap_or_else(|| self.default_value(scope, name))
    }

    /// Current value, or `None` when unset or expired.
    pub fn lookup(&self, scope: &Scope, key: &str, name: &str) -> Option<Value> {
        let variable = VariableKey::new(scope.clone(), key, name);
        self.evict_if_expired(&variable);
        self.entries
            .get(&variable)
            .map(|stored| stored.value.clone())
    }

    /// Overwrite a variable, using the configured default TTL.
    ///
    /// Returns `false` when the write was rejected by the scope capacity.
    pub fn set(&self, scope: Scope, key: &str, name: &str, value: Value) -> bool {
        let ttl = self.config.default_ttl();
        self.set_with_ttl(scope, key, name, value, ttl)
    }

    pub fn set_with_ttl(
        &self,
        scope: Scope,
        key: &str,
        name: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> bool {
        let variable = VariableKey::new(scope, key, name);
        match self.entries.entry(variable) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(StoredValue::new(value, ttl));
                true
            }
            Entry::Vacant(vacant) => {
                if !self.reserve_slot(&vacant.key().scope) {
                    self.reject(vacant.key());
                    return false;
                }
                vacant.insert(StoredValue::new(value, ttl));
                true
            }
        }
    }

    /// Append to an array variable, promoting a scalar to a one-element array.
    ///
    /// An unset or expired variable starts from `value` alone. Returns `false`
    /// when the write was rejected by capacity or the element kinds differ.
    pub fn append(
        &self,
        scope: Scope,
        key: &str,
        name: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> bool {
        let ttl = ttl.or_else(|| self.config.default_ttl());
        let variable = VariableKey::new(scope, key, name);
        match self.entries.entry(variable) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(StoredValue::new(value.into_array(), ttl));
                    return true;
                }
                let current_kind = occupied.get().value.kind();
                if current_kind != value.kind() {
                    warn!(
                        variable = %occupied.key().name,
                        expected = current_kind.name(),
                        found = value.kind().name(),
                        "variable append with mismatched kind ignored"
                    );
                    return false;
                }
                let stored = occupied.get_mut();
                let current = std::mem::replace(&mut stored.value, Value::Bool(false));
                match current.append(value) {
                    Some(merged) => {
                        *stored = StoredValue::new(merged, ttl);
                        true
                    }
                    None => false,
                }
            }
            Entry::Vacant(vacant) => {
                if !self.reserve_slot(&vacant.key().scope) {
                    self.reject(vacant.key());
                    return false;
                }
                vacant.insert(StoredValue::new(value.into_array(), ttl));
                true
            }
        }
    }

    /// Remove one variable. Returns whether a live value was removed.
    pub fn remove(&self, scope: &Scope, key: &str, name: &str) -> bool {
        let variable = VariableKey::new(scope.clone(), key, name);
        match self.entries.remove(&variable) {
            Some((_, stored)) => {
                self.release_slots(scope, 1);
                !stored.is_expired()
            }
            None => false,
        }
    }

    /// Drop every variable of `scope` tied to correlation key `key`, for
    /// instance when the process or container it identifies goes away.
    pub fn release(&self, scope: &Scope, key: &str) -> usize {
        let mut removed = 0;
        self.entries.retain(|variable, _| {
            let matches = variable.scope == *scope && variable.key == key;
            if matches {
                removed += 1;
            }
            !matches
        });
        self.release_slots(scope, removed);
        if removed > 0 {
            debug!(scope = %scope, key, removed, "released scoped variables");
        }
        removed
    }

    /// Evict every expired entry.
    pub fn purge_expired(&self) -> usize {
        let mut per_scope: HashMap<Scope, usize> = HashMap::new();
        self.entries.retain(|variable, stored| {
            if stored.is_expired() {
                *per_scope.entry(variable.scope.clone()).or_default() += 1;
                false
            } else {
                true
            }
        });

        let mut total = 0;
        for (scope, count) in per_scope {
            self.release_slots(&scope, count);
            total += count;
        }
        self.expired.fetch_add(total as u64, Ordering::Relaxed);
        total
    }

    /// Entries currently held by `scope`.
    pub fn scope_len(&self, scope: &Scope) -> usize {
        self.scope_counts
            .get(scope)
            .map(|count| count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> VariableStoreStats {
        VariableStoreStats {
            entries: self.entries.len(),
            rejected_writes: self.rejected_writes.load(Ordering::Relaxed),
            skipped_writes: self.skipped_writes.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }

    /// Count a write that could not be addressed because the event has no
    /// correlation key in `scope`.
    pub fn record_skipped_write(&self, scope: &Scope, name: &str) {
        self.skipped_writes.fetch_add(1, Ordering::Relaxed);
        warn!(scope = %scope, variable = name, "no correlation key, variable write skipped");
    }

    /// Copy every live entry together with its remaining TTL.
    pub fn snapshot(&self) -> VariableSnapshot {
        let mut entries: Vec<SnapshotEntry> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired())
            .map(|entry| SnapshotEntry {
                scope: entry.key().scope.clone(),
                key: entry.key().key.clone(),
                name: entry.key().name.clone(),
                value: entry.value().value.clone(),
                ttl_remaining_ms: entry
                    .value()
                    .remaining_ttl()
                    .map(|ttl| ttl.as_millis() as u64),
            })
            .collect();
        entries.sort_by(|a, b| {
            (&a.scope, &a.key, &a.name).cmp(&(&b.scope, &b.key, &b.name))
        });
        VariableSnapshot { entries }
    }

    /// Write every entry of `snapshot`, overwriting existing values.
    ///
    /// Returns the number of entries written; entries rejected by capacity are
    /// skipped.
    pub fn restore(&self, snapshot: &VariableSnapshot) -> usize {
        snapshot
            .entries
            .iter()
            .filter(|entry| {
                self.set_with_ttl(
                    entry.scope.clone(),
                    &entry.key,
                    &entry.name,
                    entry.value.clone(),
                    entry.ttl_remaining_ms.map(Duration::from_millis),
                )
            })
            .count()
    }

    fn evict_if_expired(&self, variable: &VariableKey) {
        if self
            .entries
            .remove_if(variable, |_, stored| stored.is_expired())
            .is_some()
        {
            self.release_slots(&variable.scope, 1);
            self.expired.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn reserve_slot(&self, scope: &Scope) -> bool {
        // Shared read lock once the scope has a counter.
        let counter = match self.scope_counts.get(scope) {
            Some(counter) => counter,
            None => self.scope_counts.entry(scope.clone()).or_default().downgrade(),
        };
        let Some(max) = self.config.max_entries_per_scope else {
            counter.fetch_add(1, Ordering::Relaxed);
            return true;
        };
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < max).then_some(current + 1)
            })
            .is_ok()
    }

    fn release_slots(&self, scope: &Scope, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(counter) = self.scope_counts.get(scope) {
            let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(count))
            });
        }
    }

    fn reject(&self, variable: &VariableKey) {
        self.rejected_writes.fetch_add(1, Ordering::Relaxed);
        warn!(
            scope = %variable.scope,
            key = %variable.key,
            variable = %variable.name,
            "scope at capacity, variable write rejected"
        );
    }
}
