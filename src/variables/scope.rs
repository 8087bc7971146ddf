//! Variable scopes and correlation-key providers.

use crate::context::{EvaluationContext, FieldValues};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Namespace of a variable.
///
/// `Global` has a single instance. `Process` and `Container` variables are
/// partitioned by the identity of the process or container the event belongs
/// to. Other scopes are named by the host and need a registered key provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Process,
    Container,
    Custom(String),
}

impl Scope {
    pub fn as_str(&self) -> &str {
        match self {
            Scope::Global => "global",
            Scope::Process => "process",
            Scope::Container => "container",
            Scope::Custom(name) => name,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Self {
        match s {
            "" | "global" => Scope::Global,
            "process" => Scope::Process,
            "container" => Scope::Container,
            other => Scope::Custom(other.to_string()),
        }
    }
}

impl FromStr for Scope {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Scope::from(s))
    }
}

/// Computes the correlation key of a scope for the event bound to a context.
///
/// Returning `None` means the event has no identity in this scope (an event
/// outside any container, for instance): reads then see the default value and
/// writes are skipped.
pub trait ScopeKeyProvider: Send + Sync {
    fn correlation_key(&self, ctx: &mut EvaluationContext<'_>) -> Option<String>;
}

/// Key provider of the global scope: always the empty key.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalKey;

impl ScopeKeyProvider for GlobalKey {
    fn correlation_key(&self, _ctx: &mut EvaluationContext<'_>) -> Option<String> {
        Some(String::new())
    }
}

/// Key provider reading the first element of an event field.
///
/// Empty strings and absent fields yield no key.
#[derive(Debug, Clone)]
pub struct FieldKey {
    field: String,
}

impl FieldKey {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl ScopeKeyProvider for FieldKey {
    fn correlation_key(&self, ctx: &mut EvaluationContext<'_>) -> Option<String> {
        match ctx.resolve(&self.field).ok()? {
            FieldValues::Strings([first, ..]) if !first.is_empty() => Some(first.clone()),
            FieldValues::Ints([first, ..]) => Some(first.to_string()),
            FieldValues::IpNets([first, ..]) => Some(first.to_string()),
            _ => None,
        }
    }
}

/// Key providers by scope.
///
/// The default registry knows the built-in scopes: global, process (keyed by
/// `process.pid`) and container (keyed by `container.id`).
#[derive(Clone)]
pub struct ScopeRegistry {
    providers: HashMap<Scope, Arc<dyn ScopeKeyProvider>>,
}

impl ScopeRegistry {
    /// Registry without any provider, not even the global one.
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    pub fn register(&mut self, scope: Scope, provider: Arc<dyn ScopeKeyProvider>) {
        self.providers.insert(scope, provider);
    }

    pub fn with_provider(mut self, scope: Scope, provider: Arc<dyn ScopeKeyProvider>) -> Self {
        self.register(scope, provider);
        self
    }

    pub fn contains(&self, scope: &Scope) -> bool {
        self.providers.contains_key(scope)
    }

    /// Correlation key of `scope` for the event bound to `ctx`.
    pub fn key_for(&self, scope: &Scope, ctx: &mut EvaluationContext<'_>) -> Option<String> {
        self.providers.get(scope)?.correlation_key(ctx)
    }
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::empty()
            .with_provider(Scope::Global, Arc::new(GlobalKey))
            .with_provider(Scope::Process, Arc::new(FieldKey::new("process.pid")))
            .with_provider(Scope::Container, Arc::new(FieldKey::new("container.id")))
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut scopes: Vec<&Scope> = self.providers.keys().collect();
        scopes.sort();
        f.debug_struct("ScopeRegistry")
            .field("scopes", &scopes)
            .finish()
    }
}
