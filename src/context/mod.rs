//! Per-event evaluation context with typed field caches.
//!
//! An [`EvaluationContext`] binds one event for the duration of its evaluation
//! and memoizes everything rules ask about it:
//!
//! - resolved field values, split into typed caches (string, int, bool, IP network)
//! - iterator registers and the element they currently point at
//! - element counts of array fields
//! - the evaluation clock, fixed on first use
//!
//! Contexts are reused through [`ContextPool`], which resets them on release.

pub mod pool;
pub mod registers;

pub use pool::{ContextPool, PoolStats, PooledContext};
pub use registers::{RegisterCacheEntry, RegisterCursor, RegisterFile, RegisterId, SavedRegister};

use crate::error::{EvalError, Result};
use crate::event::Event;
use crate::value::{Value, ValueKind};
use chrono::{DateTime, Utc};
use ipnet::IpNet;
use std::collections::{HashMap, HashSet};
use std::slice;
use std::sync::Arc;
use tracing::{error, trace, warn};

/// Borrowed view of a cached field, as a slice of its elements.
///
/// Scalar fields are stored as one-element slices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValues<'a> {
    Strings(&'a [String]),
    Ints(&'a [i64]),
    Bools(&'a [bool]),
    IpNets(&'a [IpNet]),
}

impl<'a> FieldValues<'a> {
    /// View an owned value without copying it.
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::String(s) => FieldValues::Strings(slice::from_ref(s)),
            Value::Int(i) => FieldValues::Ints(slice::from_ref(i)),
            Value::Bool(b) => FieldValues::Bools(slice::from_ref(b)),
            Value::IpNet(n) => FieldValues::IpNets(slice::from_ref(n)),
            Value::Strings(v) => FieldValues::Strings(v),
            Value::Ints(v) => FieldValues::Ints(v),
            Value::Bools(v) => FieldValues::Bools(v),
            Value::IpNets(v) => FieldValues::IpNets(v),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValues::Strings(_) => ValueKind::String,
            FieldValues::Ints(_) => ValueKind::Int,
            FieldValues::Bools(_) => ValueKind::Bool,
            FieldValues::IpNets(_) => ValueKind::IpNet,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::Strings(v) => v.len(),
            FieldValues::Ints(v) => v.len(),
            FieldValues::Bools(v) => v.len(),
            FieldValues::IpNets(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element(&self, index: usize) -> Option<Value> {
        match self {
            FieldValues::Strings(v) => v.get(index).cloned().map(Value::String),
            FieldValues::Ints(v) => v.get(index).copied().map(Value::Int),
            FieldValues::Bools(v) => v.get(index).copied().map(Value::Bool),
            FieldValues::IpNets(v) => v.get(index).copied().map(Value::IpNet),
        }
    }

    /// Owned copy in array form, whatever the length.
    pub fn to_array(&self) -> Value {
        match self {
            FieldValues::Strings(v) => Value::Strings(v.to_vec()),
            FieldValues::Ints(v) => Value::Ints(v.to_vec()),
            FieldValues::Bools(v) => Value::Bools(v.to_vec()),
            FieldValues::IpNets(v) => Value::IpNets(v.to_vec()),
        }
    }

    /// Owned copy; single elements come back as scalars.
    pub fn to_value(&self) -> Value {
        match self {
            FieldValues::Strings([s]) => Value::String(s.clone()),
            FieldValues::Ints([i]) => Value::Int(*i),
            FieldValues::Bools([b]) => Value::Bool(*b),
            FieldValues::IpNets([n]) => Value::IpNet(*n),
            FieldValues::Strings(v) => Value::Strings(v.to_vec()),
            FieldValues::Ints(v) => Value::Ints(v.to_vec()),
            FieldValues::Bools(v) => Value::Bools(v.to_vec()),
            FieldValues::IpNets(v) => Value::IpNets(v.to_vec()),
        }
    }
}

/// Evaluation state for one event.
///
/// The context borrows the event for `'e`; a context is never shared between
/// concurrent evaluations. Every field is resolved at most once per bound event,
/// whatever the number of rules or predicates referencing it.
///
/// # Example
/// ```rust,ignore
/// let event = KernelEvent::open(process, "/etc/shadow");
/// let mut ctx = EvaluationContext::with_event(&event);
///
/// assert_eq!(ctx.strings("open.file.path")?, ["/etc/shadow"]);
/// let first = ctx.now();
/// assert_eq!(ctx.now(), first);
/// ```
#[derive(Debug, Default)]
pub struct EvaluationContext<'e> {
    event: Option<&'e dyn Event>,
    strings: HashMap<String, Vec<String>>,
    ints: HashMap<String, Vec<i64>>,
    bools: HashMap<String, Vec<bool>>,
    ip_nets: HashMap<String, Vec<IpNet>>,
    /// Cached fields the event resolved as arrays.
    array_fields: HashSet<String>,
    registers: RegisterFile,
    iterator_counts: HashMap<String, usize>,
    now: Option<DateTime<Utc>>,
    resolved_fields: Vec<String>,
}

impl<'e> EvaluationContext<'e> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(event: &'e dyn Event) -> Self {
        let mut ctx = Self::new();
        ctx.bind(event);
        ctx
    }

    /// Bind `event`, discarding whatever a previous event left behind.
    pub fn bind(&mut self, event: &'e dyn Event) {
        if !self.is_clean() {
            warn!("binding an evaluation context that was not reset");
            self.reset();
        }
        self.event = Some(event);
    }

    pub fn is_bound(&self) -> bool {
        self.event.is_some()
    }

    /// The bound event.
    ///
    /// # Errors
    /// [`EvalError::NoEventBound`] when the context is idle.
    pub fn event(&self) -> Result<&'e dyn Event> {
        self.event.ok_or_else(|| {
            error!("evaluation context consulted without a bound event");
            EvalError::NoEventBound
        })
    }

    /// Evaluation clock, read on first call and fixed until reset.
    pub fn now(&mut self) -> DateTime<Utc> {
        *self.now.get_or_insert_with(Utc::now)
    }

    /// [`now`](Self::now) as nanoseconds since the epoch.
    pub fn now_nanos(&mut self) -> i64 {
        let now = self.now();
        now.timestamp_nanos_opt().unwrap_or(i64::MAX)
    }

    /// Resolve `field` through the typed caches, calling the event on a miss.
    ///
    /// # Errors
    /// Resolver errors are returned as-is and nothing is cached for them.
    pub fn resolve(&mut self, field: &str) -> Result<FieldValues<'_>> {
        let kind = match self.cached_kind(field) {
            Some(kind) => kind,
            None => {
                let event = self.event()?;
                let value = event.resolve(field).map_err(|err| {
                    trace!(field, error = %err, "field resolution failed");
                    err
                })?;
                let kind = value.kind();
                self.store(field, value);
                #[cfg(any(test, feature = "diagnostics"))]
                self.resolved_fields.push(field.to_string());
                kind
            }
        };
        self.view(field, kind)
            .ok_or_else(|| EvalError::FieldNotFound(field.to_string()))
    }

    /// Owned value of `field`, keeping the scalar or array form the event gave it.
    pub fn value(&mut self, field: &str) -> Result<Value> {
        self.resolve(field)?;
        let is_array = self.array_fields.contains(field);
        let values = self.resolve(field)?;
        Ok(if is_array {
            values.to_array()
        } else {
            values.to_value()
        })
    }

    pub fn strings(&mut self, field: &str) -> Result<&[String]> {
        match self.resolve(field)? {
            FieldValues::Strings(v) => Ok(v),
            other => Err(mismatch(field, ValueKind::String, other.kind())),
        }
    }

    pub fn ints(&mut self, field: &str) -> Result<&[i64]> {
        match self.resolve(field)? {
            FieldValues::Ints(v) => Ok(v),
            other => Err(mismatch(field, ValueKind::Int, other.kind())),
        }
    }

    pub fn bools(&mut self, field: &str) -> Result<&[bool]> {
        match self.resolve(field)? {
            FieldValues::Bools(v) => Ok(v),
            other => Err(mismatch(field, ValueKind::Bool, other.kind())),
        }
    }

    pub fn ip_nets(&mut self, field: &str) -> Result<&[IpNet]> {
        match self.resolve(field)? {
            FieldValues::IpNets(v) => Ok(v),
            other => Err(mismatch(field, ValueKind::IpNet, other.kind())),
        }
    }

    /// Element count of `field`, memoized per event.
    pub fn iterator_count(&mut self, field: &str) -> Result<usize> {
        if let Some(&count) = self.iterator_counts.get(field) {
            return Ok(count);
        }
        let count = self.resolve(field)?.len();
        self.iterator_counts.insert(field.to_string(), count);
        Ok(count)
    }

    /// Start iterating `field` with `register`.
    ///
    /// The returned state must be handed back to [`exit_register`](Self::exit_register)
    /// once the iteration ends.
    pub fn enter_register(&mut self, register: RegisterId, field: Arc<str>) -> SavedRegister {
        self.registers.bind(register, field)
    }

    pub fn advance_register(&mut self, register: RegisterId, position: usize) {
        self.registers.advance(register, position);
    }

    pub fn exit_register(&mut self, register: RegisterId, saved: SavedRegister) {
        self.registers.release(register, saved);
    }

    /// Clear every register. Each rule starts with no iteration in progress.
    pub fn clear_registers(&mut self) {
        self.registers.clear();
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Value of `field` at the position `register` currently points at.
    ///
    /// When `field` is the array the register walks, the element is served from
    /// the register cache. Sibling arrays are indexed at the same position
    /// through the typed caches.
    pub fn element(&mut self, register: RegisterId, field: &str) -> Result<Value> {
        let cursor = self
            .registers
            .cursor(register)
            .ok_or(EvalError::RegisterNotBound(register))?;
        let position = cursor.position;
        let own_field = &*cursor.field == field;

        if own_field {
            if let Some(value) = self.registers.cached(register, position) {
                return Ok(value.clone());
            }
        }

        let value = self
            .resolve(field)?
            .element(position)
            .ok_or_else(|| EvalError::FieldNotFound(format!("{field}[{position}]")))?;
        if own_field {
            self.registers.store(register, position, value.clone());
        }
        Ok(value)
    }

    /// Fields resolved from the event since the last reset, in order.
    ///
    /// Only recorded in test builds and with the `diagnostics` feature.
    pub fn resolved_fields(&self) -> &[String] {
        &self.resolved_fields
    }

    /// Number of distinct fields currently cached.
    pub fn cached_field_count(&self) -> usize {
        self.strings.len() + self.ints.len() + self.bools.len() + self.ip_nets.len()
    }

    /// Total capacity of the internal maps, for observing storage reuse.
    pub fn capacity(&self) -> usize {
        self.strings.capacity()
            + self.ints.capacity()
            + self.bools.capacity()
            + self.ip_nets.capacity()
            + self.array_fields.capacity()
            + self.iterator_counts.capacity()
            + self.registers.capacity()
            + self.resolved_fields.capacity()
    }

    /// Clear all per-event state and unbind the event, keeping capacity.
    pub fn reset(&mut self) {
        self.event = None;
        self.strings.clear();
        self.ints.clear();
        self.bools.clear();
        self.ip_nets.clear();
        self.array_fields.clear();
        self.registers.clear();
        self.iterator_counts.clear();
        self.now = None;
        self.resolved_fields.clear();
    }

    /// Reset and release the event borrow, so the storage can outlive it.
    pub(crate) fn detach(mut self) -> EvaluationContext<'static> {
        self.reset();
        EvaluationContext {
            event: None,
            strings: self.strings,
            ints: self.ints,
            bools: self.bools,
            ip_nets: self.ip_nets,
            array_fields: self.array_fields,
            registers: self.registers,
            iterator_counts: self.iterator_counts,
            now: None,
            resolved_fields: self.resolved_fields,
        }
    }

    fn is_clean(&self) -> bool {
        self.event.is_none()
            && self.cached_field_count() == 0
            && self.registers.is_empty()
            && self.iterator_counts.is_empty()
            && self.now.is_none()
    }

    fn cached_kind(&self, field: &str) -> Option<ValueKind> {
        if self.strings.contains_key(field) {
            Some(ValueKind::String)
        } else if self.ints.contains_key(field) {
            Some(ValueKind::Int)
        } else if self.bools.contains_key(field) {
            Some(ValueKind::Bool)
        } else if self.ip_nets.contains_key(field) {
            Some(ValueKind::IpNet)
        } else {
            None
        }
    }

    fn view(&self, field: &str, kind: ValueKind) -> Option<FieldValues<'_>> {
        match kind {
            ValueKind::String => self.strings.get(field).map(|v| FieldValues::Strings(v)),
            ValueKind::Int => self.ints.get(field).map(|v| FieldValues::Ints(v)),
            ValueKind::Bool => self.bools.get(field).map(|v| FieldValues::Bools(v)),
            ValueKind::IpNet => self.ip_nets.get(field).map(|v| FieldValues::IpNets(v)),
        }
    }

    fn store(&mut self, field: &str, value: Value) {
        let field = field.to_string();
        if value.is_array() {
            self.array_fields.insert(field.clone());
        }
        match value.into_array() {
            Value::Strings(v) => {
                self.strings.insert(field, v);
            }
            Value::Ints(v) => {
                self.ints.insert(field, v);
            }
            Value::Bools(v) => {
                self.bools.insert(field, v);
            }
            Value::IpNets(v) => {
                self.ip_nets.insert(field, v);
            }
            _ => {}
        }
    }
}

fn mismatch(field: &str, expected: ValueKind, found: ValueKind) -> EvalError {
    EvalError::FieldTypeMismatch {
        field: field.to_string(),
        expected: expected.name(),
        found: found.name(),
    }
}
