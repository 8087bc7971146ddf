//! Rules and the actions they trigger.

use crate::eval::Expr;
use crate::value::Value;
use crate::variables::Scope;
use std::time::Duration;

/// Rule identifier.
pub type RuleId = String;

/// Compiled rule: a boolean expression plus actions run, in order, when it matches.
///
/// # Example
/// ```rust,ignore
/// let rule = Rule::new(
///     "tag_container",
///     Expr::and(vec![
///         Expr::age("container.created_at", CompareOp::Lt, Duration::from_secs(3)),
///         Expr::field_eq("open.file.path", "/root/test-open"),
///     ]),
/// )
/// .with_action(SetVariable::new(Scope::Container, "foo", 1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: RuleId,
    pub expr: Expr,
    pub actions: Vec<Action>,
}

impl Rule {
    pub fn new(id: &str, expr: Expr) -> Self {
        Self {
            id: id.to_string(),
            expr,
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: impl Into<Action>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Variables written by this rule's actions.
    pub fn set_variables(&self) -> impl Iterator<Item = &SetVariable> {
        self.actions.iter().map(|action| match action {
            Action::SetVariable(set) => set,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetVariable(SetVariable),
}

impl From<SetVariable> for Action {
    fn from(set: SetVariable) -> Self {
        Action::SetVariable(set)
    }
}

/// Where a [`SetVariable`] action takes its value from.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    Literal(Value),
    /// Copy a field of the matching event.
    Field(String),
}

/// Write `value` to `scope.name` for the correlation key of the matching event.
#[derive(Debug, Clone, PartialEq)]
pub struct SetVariable {
    pub scope: Scope,
    pub name: String,
    pub value: SetValue,
    /// Append to an array variable instead of overwriting it.
    pub append: bool,
    /// Expiry of the written entry; the store default applies when `None`.
    pub ttl: Option<Duration>,
}

impl SetVariable {
    pub fn new(scope: Scope, name: &str, value: impl Into<Value>) -> Self {
        Self {
            scope,
            name: name.to_string(),
            value: SetValue::Literal(value.into()),
            append: false,
            ttl: None,
        }
    }

    pub fn from_field(scope: Scope, name: &str, field: &str) -> Self {
        Self {
            scope,
            name: name.to_string(),
            value: SetValue::Field(field.to_string()),
            append: false,
            ttl: None,
        }
    }

    pub fn appending(mut self) -> Self {
        self.append = true;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Value reads observe before the first write: the zero value of the
    /// literal's kind, as an array for appending actions. Field-sourced
    /// actions have no kind known ahead of time.
    pub fn declared_default(&self) -> Option<Value> {
        match &self.value {
            SetValue::Literal(value) => {
                let zero = Value::zero(value.kind());
                Some(if self.append || value.is_array() {
                    empty_array(zero)
                } else {
                    zero
                })
            }
            SetValue::Field(_) => None,
        }
    }
}

fn empty_array(zero: Value) -> Value {
    match zero.into_array() {
        Value::Strings(_) => Value::Strings(Vec::new()),
        Value::Ints(_) => Value::Ints(Vec::new()),
        Value::Bools(_) => Value::Bools(Vec::new()),
        Value::IpNets(_) => Value::IpNets(Vec::new()),
        scalar => scalar,
    }
}
