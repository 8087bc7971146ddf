//! Event abstraction consumed by the evaluation core.
//!
//! The collector owns event production. The core only needs two things from an
//! event: its type name and a way to resolve a dotted field path into a
//! [`Value`]. Two implementations ship with the crate:
//!
//! - [`KernelEvent`] - typed model of open / exec / connect / container
//!   lifecycle events, resolving fields through a static dispatch table
//! - [`JsonEvent`] - adapter over `serde_json::Value` for replayed or
//!   pre-decoded events

pub mod json;
pub mod model;

use crate::error::Result;
use crate::value::Value;

pub use json::JsonEvent;
pub use model::{
    AncestorEntry, ConnectEvent, ContainerContext, ContainerLifecycleEvent, EventKind,
    EventPayload, ExecEvent, KernelEvent, OpenEvent, ProcessContext,
};

/// Field resolution capability of an event.
///
/// Resolvers may block internally (metadata lookups) but must be callable from
/// any evaluation worker, hence `Send + Sync`.
///
/// # Errors
///
/// - [`EvalError::FieldNotFound`](crate::EvalError::FieldNotFound) for unknown fields
/// - [`EvalError::FieldNotApplicable`](crate::EvalError::FieldNotApplicable) for fields
///   belonging to another event kind
/// - [`EvalError::Resolver`](crate::EvalError::Resolver) for collaborator failures
///
/// The evaluator treats all of these as "field absent".
pub trait Event: Send + Sync {
    /// Event type name (`open`, `exec`, ...).
    fn event_type(&self) -> &str;

    /// Resolve `field` into a value.
    fn resolve(&self, field: &str) -> Result<Value>;
}

impl std::fmt::Debug for dyn Event + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type())
            .finish()
    }
}

impl<E: Event + ?Sized> Event for &E {
    fn event_type(&self) -> &str {
        (**self).event_type()
    }

    fn resolve(&self, field: &str) -> Result<Value> {
        (**self).resolve(field)
    }
}

impl<E: Event + ?Sized> Event for std::sync::Arc<E> {
    fn event_type(&self) -> &str {
        (**self).event_type()
    }

    fn resolve(&self, field: &str) -> Result<Value> {
        (**self).resolve(field)
    }
}
