//! Rule expressions and their evaluation.
//!
//! - [`expr`]: compiled expression trees
//! - [`pattern`]: glob and regex string patterns
//! - [`evaluator`]: the tree walker

pub mod evaluator;
pub mod expr;
pub mod pattern;

pub use evaluator::{Evaluator, RuleOutcome};
pub use expr::{CompareOp, Expr, Operand, Quantifier};
pub use pattern::{Pattern, PatternKind};
