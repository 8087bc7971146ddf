//! # SECL Evaluation Core
//!
//! Runtime evaluation core for security event rules. Rules arrive already
//! compiled into expression trees; this crate evaluates them against kernel
//! events with:
//!
//! - per-event [`EvaluationContext`]s that resolve every field at most once
//! - iterator registers for `any` / `all` walks over array fields, keeping
//!   sibling fields of the same element correlated
//! - a [`ContextPool`] so contexts and their caches are reused across events
//! - a concurrent [`VariableStore`] of scoped variables (global, process,
//!   container, ...) written by rule actions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use secl_eval::prelude::*;
//! use std::time::Duration;
//!
//! let rule = Rule::new(
//!     "tag_new_container",
//!     Expr::and(vec![
//!         Expr::compare(Operand::field("container.id"), CompareOp::Ne, Operand::literal("")),
//!         Expr::age("container.created_at", CompareOp::Lt, Duration::from_secs(3)),
//!         Expr::field_eq("open.file.path", "/root/test-open"),
//!     ]),
//! )
//! .with_action(SetVariable::new(Scope::Container, "foo", 1));
//!
//! let engine = Engine::new(vec![rule])?;
//!
//! let event = KernelEvent::open(ProcessContext::new(42, "touch", "/usr/bin/touch"), "/root/test-open")
//!     .with_container(ContainerContext::new("abc", chrono::Utc::now()));
//! let result = engine.evaluate(&event);
//!
//! assert_eq!(result.matched_rules, ["tag_new_container"]);
//! assert_eq!(engine.variables().get(&Scope::Container, "abc", "foo"), Value::Int(1));
//! # Ok::<(), secl_eval::EvalError>(())
//! ```
//!
//! ## Driving contexts directly
//!
//! Hosts running their own worker loops can take contexts from the pool and
//! evaluate individual rules:
//!
//! ```rust,ignore
//! let pool = ContextPool::new();
//! let evaluator = engine.evaluator();
//!
//! let mut ctx = pool.acquire(&event);
//! let matched = evaluator.evaluate(&mut ctx, &rule)?;
//! drop(ctx); // reset and returned to the pool
//! ```
//!
//! ## Features
//!
//! - `diagnostics`: record every field resolved through a context, readable
//!   with [`EvaluationContext::resolved_fields`]. Always on in unit tests.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod eval;
pub mod event;
pub mod rule;
pub mod value;
pub mod variables;

pub use config::{
    EngineConfig, ParallelConfig, PoolConfig, VariableConfig, MAX_DEFAULT_TTL_SECS,
};
pub use context::{ContextPool, EvaluationContext, FieldValues, PoolStats, PooledContext, RegisterId};
pub use engine::{Engine, EngineBuilder, EvaluationResult};
pub use error::{EvalError, Result};
pub use eval::{CompareOp, Evaluator, Expr, Operand, Pattern, PatternKind, Quantifier, RuleOutcome};
pub use event::{Event, JsonEvent, KernelEvent};
pub use rule::{Action, Rule, RuleId, SetValue, SetVariable};
pub use value::{Value, ValueKind};
pub use variables::{
    Scope, ScopeKeyProvider, ScopeRegistry, VariableSnapshot, VariableStore, VariableStoreStats,
};

/// Common imports for hosts.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::context::{ContextPool, EvaluationContext};
    pub use crate::engine::{Engine, EvaluationResult};
    pub use crate::error::{EvalError, Result};
    pub use crate::eval::{CompareOp, Evaluator, Expr, Operand, Pattern, Quantifier};
    pub use crate::event::{
        AncestorEntry, ContainerContext, Event, JsonEvent, KernelEvent, ProcessContext,
    };
    pub use crate::rule::{Rule, SetVariable};
    pub use crate::value::Value;
    pub use crate::variables::{Scope, VariableStore};
}
