//! Compiled rule expression trees.
//!
//! Trees are produced by the rule compiler; this crate only walks them. The
//! constructors below build the same shapes for hosts and tests.

use super::pattern::Pattern;
use crate::context::RegisterId;
use crate::value::Value;
use crate::variables::Scope;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Whether `ordering` (left compared to right) satisfies the operator.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// True on the first satisfying element, false on an empty array.
    Any,
    /// False on the first failing element, true on an empty array.
    All,
}

/// Value source of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Event field, resolved through the context caches.
    Field(Arc<str>),
    /// Element of an array field at the position of an active register.
    Element { register: RegisterId, field: Arc<str> },
    /// Scoped variable, keyed by the event's correlation key for `scope`.
    Variable { scope: Scope, name: Arc<str> },
    Literal(Value),
}

impl Operand {
    pub fn field(field: &str) -> Self {
        Operand::Field(Arc::from(field))
    }

    pub fn element(register: RegisterId, field: &str) -> Self {
        Operand::Element {
            register,
            field: Arc::from(field),
        }
    }

    pub fn variable(scope: Scope, name: &str) -> Self {
        Operand::Variable {
            scope,
            name: Arc::from(name),
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }

    fn field_name(&self) -> Option<&str> {
        match self {
            Operand::Field(field) | Operand::Element { field, .. } => Some(&**field),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Field(field) => f.write_str(field),
            Operand::Element { register, field } => write!(f, "{field}[r{register}]"),
            Operand::Variable {
                scope: Scope::Global,
                name,
            } => write!(f, "${{{name}}}"),
            Operand::Variable { scope, name } => write!(f, "${{{scope}.{name}}}"),
            Operand::Literal(value) => write!(f, "{value}"),
        }
    }
}

/// Boolean expression tree of a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(bool),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// Set membership; IP network sets test containment.
    In {
        operand: Operand,
        set: Operand,
        negated: bool,
    },
    Match {
        operand: Operand,
        pattern: Pattern,
        negated: bool,
    },
    /// `now - operand` compared to `duration`, for nanosecond timestamps.
    Age {
        operand: Operand,
        op: CompareOp,
        duration: Duration,
    },
    /// Quantified walk of an array field; `body` reads elements through
    /// [`Operand::Element`] with the same register.
    Iterate {
        register: RegisterId,
        field: Arc<str>,
        quantifier: Quantifier,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn and(children: Vec<Expr>) -> Self {
        Expr::And(children)
    }

    pub fn or(children: Vec<Expr>) -> Self {
        Expr::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Expr) -> Self {
        Expr::Not(Box::new(child))
    }

    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Expr::Compare { left, op, right }
    }

    /// `field == value`
    pub fn field_eq(field: &str, value: impl Into<Value>) -> Self {
        Expr::compare(Operand::field(field), CompareOp::Eq, Operand::literal(value))
    }

    /// `field <op> value`
    pub fn field_cmp(field: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        Expr::compare(Operand::field(field), op, Operand::literal(value))
    }

    pub fn is_in(operand: Operand, set: Operand) -> Self {
        Expr::In {
            operand,
            set,
            negated: false,
        }
    }

    pub fn not_in(operand: Operand, set: Operand) -> Self {
        Expr::In {
            operand,
            set,
            negated: true,
        }
    }

    pub fn matches(operand: Operand, pattern: Pattern) -> Self {
        Expr::Match {
            operand,
            pattern,
            negated: false,
        }
    }

    pub fn not_matches(operand: Operand, pattern: Pattern) -> Self {
        Expr::Match {
            operand,
            pattern,
            negated: true,
        }
    }

    /// `field <op> duration`, as in `container.created_at < 3s`.
    pub fn age(field: &str, op: CompareOp, duration: Duration) -> Self {
        Expr::Age {
            operand: Operand::field(field),
            op,
            duration,
        }
    }

    pub fn any(register: RegisterId, field: &str, body: Expr) -> Self {
        Expr::iterate(register, field, Quantifier::Any, body)
    }

    pub fn all(register: RegisterId, field: &str, body: Expr) -> Self {
        Expr::iterate(register, field, Quantifier::All, body)
    }

    pub fn iterate(register: RegisterId, field: &str, quantifier: Quantifier, body: Expr) -> Self {
        Expr::Iterate {
            register,
            field: Arc::from(field),
            quantifier,
            body: Box::new(body),
        }
    }

    /// Event fields the tree references, in first-use order without duplicates.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    /// Scoped variables the tree reads, in first-use order without duplicates.
    pub fn variables(&self) -> Vec<(&Scope, &str)> {
        let mut variables = Vec::new();
        self.collect_variables(&mut variables);
        variables
    }

    fn operands(&self) -> Vec<&Operand> {
        match self {
            Expr::Compare { left, right, .. } => vec![left, right],
            Expr::In { operand, set, .. } => vec![operand, set],
            Expr::Match { operand, .. } | Expr::Age { operand, .. } => vec![operand],
            _ => Vec::new(),
        }
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::And(children) | Expr::Or(children) => children.iter().collect(),
            Expr::Not(child) => vec![&**child],
            Expr::Iterate { body, .. } => vec![&**body],
            _ => Vec::new(),
        }
    }

    fn collect_fields<'a>(&'a self, fields: &mut Vec<&'a str>) {
        let mut push = |field: &'a str| {
            if !fields.contains(&field) {
                fields.push(field);
            }
        };
        if let Expr::Iterate { field, .. } = self {
            push(&**field);
        }
        for operand in self.operands() {
            if let Some(field) = operand.field_name() {
                push(field);
            }
        }
        for child in self.children() {
            child.collect_fields(fields);
        }
    }

    fn collect_variables<'a>(&'a self, variables: &mut Vec<(&'a Scope, &'a str)>) {
        for operand in self.operands() {
            if let Operand::Variable { scope, name } = operand {
                let entry = (scope, &**name);
                if !variables.contains(&entry) {
                    variables.push(entry);
                }
            }
        }
        for child in self.children() {
            child.collect_variables(variables);
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Expr], separator: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        match child {
            Expr::And(_) | Expr::Or(_) => write!(f, "({child})")?,
            _ => write!(f, "{child}")?,
        }
    }
    Ok(())
}

fn write_duration(f: &mut fmt::Formatter<'_>, duration: &Duration) -> fmt::Result {
    let nanos = duration.as_nanos();
    if nanos % 1_000_000_000 == 0 {
        write!(f, "{}s", duration.as_secs())
    } else if nanos % 1_000_000 == 0 {
        write!(f, "{}ms", duration.as_millis())
    } else {
        write!(f, "{nanos}ns")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::And(children) => write_joined(f, children, " && "),
            Expr::Or(children) => write_joined(f, children, " || "),
            Expr::Not(child) => write!(f, "!({child})"),
            Expr::Compare { left, op, right } => write!(f, "{left} {op} {right}"),
            Expr::In {
                operand,
                set,
                negated,
            } => {
                let op = if *negated { "not in" } else { "in" };
                write!(f, "{operand} {op} {set}")
            }
            Expr::Match {
                operand,
                pattern,
                negated,
            } => {
                let op = if *negated { "!~" } else { "=~" };
                write!(f, "{operand} {op} {pattern}")
            }
            Expr::Age {
                operand,
                op,
                duration,
            } => {
                write!(f, "{operand} {op} ")?;
                write_duration(f, duration)
            }
            Expr::Iterate {
                register,
                field,
                quantifier,
                body,
            } => {
                let quantifier = match quantifier {
                    Quantifier::Any => "any",
                    Quantifier::All => "all",
                };
                write!(f, "{quantifier}(r{register} in {field}: {body})")
            }
        }
    }
}
