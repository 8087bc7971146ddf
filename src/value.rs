//! Field and variable values.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Value produced by a field resolver or stored in a variable.
///
/// Scalars and homogeneous arrays of the four element kinds the rule language
/// knows about. Array fields are how the collector exposes things like the
/// process ancestry (`process.ancestors.name`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    IpNet(IpNet),
    Strings(Vec<String>),
    Ints(Vec<i64>),
    Bools(Vec<bool>),
    IpNets(Vec<IpNet>),
}

/// Element kind of a [`Value`], regardless of arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    String,
    Int,
    Bool,
    IpNet,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::Bool => "bool",
            ValueKind::IpNet => "ip_net",
        }
    }
}

impl Value {
    /// Zero value of a kind: `""`, `0`, `false`, or the unspecified IPv4 host.
    pub fn zero(kind: ValueKind) -> Value {
        match kind {
            ValueKind::String => Value::String(String::new()),
            ValueKind::Int => Value::Int(0),
            ValueKind::Bool => Value::Bool(false),
            ValueKind::IpNet => Value::IpNet(IpNet::from(IpAddr::V4(Ipv4Addr::UNSPECIFIED))),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) | Value::Strings(_) => ValueKind::String,
            Value::Int(_) | Value::Ints(_) => ValueKind::Int,
            Value::Bool(_) | Value::Bools(_) => ValueKind::Bool,
            Value::IpNet(_) | Value::IpNets(_) => ValueKind::IpNet,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Strings(_) => "string_array",
            Value::Ints(_) => "int_array",
            Value::Bools(_) => "bool_array",
            Value::IpNets(_) => "ip_net_array",
            scalar => scalar.kind().name(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Value::Strings(_) | Value::Ints(_) | Value::Bools(_) | Value::IpNets(_)
        )
    }

    /// Number of elements; a scalar counts as one.
    pub fn len(&self) -> usize {
        match self {
            Value::Strings(v) => v.len(),
            Value::Ints(v) => v.len(),
            Value::Bools(v) => v.len(),
            Value::IpNets(v) => v.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index` as a scalar value. A scalar is its own element 0.
    pub fn element(&self, index: usize) -> Option<Value> {
        match self {
            Value::Strings(v) => v.get(index).cloned().map(Value::String),
            Value::Ints(v) => v.get(index).copied().map(Value::Int),
            Value::Bools(v) => v.get(index).copied().map(Value::Bool),
            Value::IpNets(v) => v.get(index).copied().map(Value::IpNet),
            scalar if index == 0 => Some(scalar.clone()),
            _ => None,
        }
    }

    /// Appends `other` to this value, promoting a scalar to a one-element array.
    ///
    /// Returns `None` when the element kinds differ.
    pub fn append(self, other: Value) -> Option<Value> {
        if self.kind() != other.kind() {
            return None;
        }
        let merged = match (self.into_array(), other.into_array()) {
            (Value::Strings(mut a), Value::Strings(b)) => {
                a.extend(b);
                Value::Strings(a)
            }
            (Value::Ints(mut a), Value::Ints(b)) => {
                a.extend(b);
                Value::Ints(a)
            }
            (Value::Bools(mut a), Value::Bools(b)) => {
                a.extend(b);
                Value::Bools(a)
            }
            (Value::IpNets(mut a), Value::IpNets(b)) => {
                a.extend(b);
                Value::IpNets(a)
            }
            _ => return None,
        };
        Some(merged)
    }

    /// The array form of this value; scalars become one-element arrays.
    pub fn into_array(self) -> Value {
        match self {
            Value::String(s) => Value::Strings(vec![s]),
            Value::Int(i) => Value::Ints(vec![i]),
            Value::Bool(b) => Value::Bools(vec![b]),
            Value::IpNet(n) => Value::IpNets(vec![n]),
            array => array,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, "]")
        }

        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::IpNet(n) => write!(f, "{n}"),
            Value::Strings(v) => {
                let quoted: Vec<String> = v.iter().map(|s| format!("{s:?}")).collect();
                list(f, &quoted)
            }
            Value::Ints(v) => list(f, v),
            Value::Bools(v) => list(f, v),
            Value::IpNets(v) => list(f, v),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<IpNet> for Value {
    fn from(value: IpNet) -> Self {
        Value::IpNet(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::Strings(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Value::Strings(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i64>> for Value {
    fn from(value: Vec<i64>) -> Self {
        Value::Ints(value)
    }
}

impl From<Vec<bool>> for Value {
    fn from(value: Vec<bool>) -> Self {
        Value::Bools(value)
    }
}

impl From<Vec<IpNet>> for Value {
    fn from(value: Vec<IpNet>) -> Self {
        Value::IpNets(value)
    }
}
