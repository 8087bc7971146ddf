//! Iterator registers for array-valued fields.

use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Identifier the rule compiler assigns to an iteration node.
pub type RegisterId = u32;

/// Last iterated position of a register and the element resolved there.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterCacheEntry {
    pub position: usize,
    pub value: Value,
}

/// Active cursor of a register: the array field it walks and the current index.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterCursor {
    pub field: Arc<str>,
    pub position: usize,
}

/// Register state displaced by re-entering a register that was already bound.
#[derive(Debug, Default)]
pub struct SavedRegister {
    cursor: Option<RegisterCursor>,
    entry: Option<RegisterCacheEntry>,
}

/// Register cursors and their element cache for one evaluation context.
///
/// A register is bound when an iteration node starts walking its field,
/// advanced once per element, and released when the node finishes. Several
/// predicates referencing the same position share the cached element instead of
/// re-resolving it.
#[derive(Debug, Default)]
pub struct RegisterFile {
    cursors: HashMap<RegisterId, RegisterCursor>,
    cache: HashMap<RegisterId, RegisterCacheEntry>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `register` to `field` at position 0, returning whatever it displaced.
    pub fn bind(&mut self, register: RegisterId, field: Arc<str>) -> SavedRegister {
        let cursor = self
            .cursors
            .insert(register, RegisterCursor { field, position: 0 });
        let entry = self.cache.remove(&register);
        SavedRegister { cursor, entry }
    }

    pub fn advance(&mut self, register: RegisterId, position: usize) {
        if let Some(cursor) = self.cursors.get_mut(&register) {
            cursor.position = position;
        }
    }

    /// Unbind `register`, restoring the state an outer iteration had saved.
    pub fn release(&mut self, register: RegisterId, saved: SavedRegister) {
        match saved.cursor {
            Some(cursor) => self.cursors.insert(register, cursor),
            None => self.cursors.remove(&register),
        };
        match saved.entry {
            Some(entry) => self.cache.insert(register, entry),
            None => self.cache.remove(&register),
        };
    }

    pub fn cursor(&self, register: RegisterId) -> Option<&RegisterCursor> {
        self.cursors.get(&register)
    }

    /// Cached element for `register`, only if it was resolved at `position`.
    pub fn cached(&self, register: RegisterId, position: usize) -> Option<&Value> {
        self.cache
            .get(&register)
            .filter(|entry| entry.position == position)
            .map(|entry| &entry.value)
    }

    pub fn entry(&self, register: RegisterId) -> Option<&RegisterCacheEntry> {
        self.cache.get(&register)
    }

    pub fn store(&mut self, register: RegisterId, position: usize, value: Value) {
        self.cache
            .insert(register, RegisterCacheEntry { position, value });
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty() && self.cache.is_empty()
    }

    /// Drop every cursor and cached element, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.cursors.clear();
        self.cache.clear();
    }

    pub fn capacity(&self) -> usize {
        self.cursors.capacity() + self.cache.capacity()
    }
}
