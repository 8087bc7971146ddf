//! JSON event adapter with dot-notation field access.

use super::Event;
use crate::error::{EvalError, Result};
use crate::value::Value;
use ipnet::IpNet;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::net::IpAddr;

/// Event backed by a decoded JSON document.
///
/// Fields are addressed with dot notation (`process.file.path`). A flat key
/// containing dots takes precedence over nested traversal. When a path segment
/// lands on an array of objects, the rest of the path is projected over every
/// element, which turns `{"process": {"ancestors": [{"name": "a"}, {"name": "b"}]}}`
/// into `process.ancestors.name = ["a", "b"]`.
///
/// Projected arrays keep one element per array entry, so sibling projections
/// (`process.ancestors.name`, `process.ancestors.pid`) stay aligned by position.
/// An entry that lacks the path or holds `null` makes the whole field absent
/// rather than shifting the elements after it. Nested arrays inside a
/// projection are a type mismatch for the same reason.
///
/// JSON has no IP type, so fields holding addresses or networks must be declared
/// with [`JsonEvent::with_ip_fields`] to resolve as [`Value::IpNet`].
///
/// # Example
/// ```rust,ignore
/// let event = JsonEvent::new("open", json!({
///     "open": {"file": {"path": "/etc/passwd"}},
///     "container": {"id": "abc"}
/// }));
///
/// assert_eq!(event.resolve("open.file.path")?, Value::from("/etc/passwd"));
/// ```
#[derive(Debug, Clone)]
pub struct JsonEvent {
    event_type: String,
    document: JsonValue,
    ip_fields: HashSet<String>,
}

impl JsonEvent {
    pub fn new(event_type: &str, document: JsonValue) -> Self {
        Self {
            event_type: event_type.to_string(),
            document,
            ip_fields: HashSet::new(),
        }
    }

    /// Build from a document carrying its own type under `event.type`.
    pub fn from_document(document: JsonValue) -> Result<Self> {
        let event_type = document
            .get("event")
            .and_then(|e| e.get("type"))
            .and_then(JsonValue::as_str)
            .ok_or_else(|| EvalError::FieldNotFound("event.type".to_string()))?
            .to_string();
        Ok(Self::new(&event_type, document))
    }

    pub fn with_ip_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ip_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn document(&self) -> &JsonValue {
        &self.document
    }

    fn lookup(&self, field: &str) -> Result<Option<Lookup<'_>>> {
        if let Some(flat) = self.document.as_object().and_then(|obj| obj.get(field)) {
            return Ok(Some(Lookup::Single(flat)));
        }

        let parts: Vec<&str> = field.split('.').collect();
        traverse(field, &self.document, &parts)
    }

    fn convert_scalar(&self, field: &str, json: &JsonValue) -> Result<Value> {
        if self.ip_fields.contains(field) {
            let text = json.as_str().ok_or_else(|| EvalError::FieldTypeMismatch {
                field: field.to_string(),
                expected: "ip_net",
                found: json_type_name(json),
            })?;
            return parse_ip_net(text).map(Value::IpNet);
        }

        match json {
            JsonValue::String(s) => Ok(Value::String(s.clone())),
            JsonValue::Bool(b) => Ok(Value::Bool(*b)),
            JsonValue::Number(n) => n.as_i64().map(Value::Int).ok_or_else(|| {
                EvalError::FieldTypeMismatch {
                    field: field.to_string(),
                    expected: "int",
                    found: "float",
                }
            }),
            JsonValue::Null => Err(EvalError::FieldNotFound(field.to_string())),
            other => Err(EvalError::FieldTypeMismatch {
                field: field.to_string(),
                expected: "scalar",
                found: json_type_name(other),
            }),
        }
    }

    fn convert_array(&self, field: &str, items: &[Option<&JsonValue>]) -> Result<Value> {
        let mut values = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item {
                Some(item) if !item.is_null() => values.push(self.convert_scalar(field, item)?),
                _ => return Err(EvalError::FieldNotFound(format!("{field}[{index}]"))),
            }
        }

        let Some(first) = values.first() else {
            return Ok(Value::Strings(Vec::new()));
        };
        let kind = first.kind();
        if let Some(mismatch) = values.iter().find(|v| v.kind() != kind) {
            return Err(EvalError::FieldTypeMismatch {
                field: field.to_string(),
                expected: kind.name(),
                found: mismatch.type_name(),
            });
        }

        let merged = values
            .into_iter()
            .map(Value::into_array)
            .reduce(|acc, v| acc.append(v).unwrap_or(Value::Strings(Vec::new())));
        Ok(merged.unwrap_or(Value::Strings(Vec::new())))
    }
}

impl Event for JsonEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn resolve(&self, field: &str) -> Result<Value> {
        match self.lookup(field)? {
            None => Err(EvalError::FieldNotFound(field.to_string())),
            Some(Lookup::Single(JsonValue::Array(items))) => {
                let slots: Vec<Option<&JsonValue>> = items.iter().map(Some).collect();
                self.convert_array(field, &slots)
            }
            Some(Lookup::Single(json)) => self.convert_scalar(field, json),
            Some(Lookup::Projected(items)) => self.convert_array(field, &items),
        }
    }
}

enum Lookup<'a> {
    Single(&'a JsonValue),
    /// One slot per array entry; `None` where the entry lacks the path.
    Projected(Vec<Option<&'a JsonValue>>),
}

fn traverse<'a>(
    field: &str,
    current: &'a JsonValue,
    parts: &[&str],
) -> Result<Option<Lookup<'a>>> {
    let Some((head, rest)) = parts.split_first() else {
        return Ok(Some(Lookup::Single(current)));
    };

    match current {
        JsonValue::Object(map) => match map.get(*head) {
            Some(next) => traverse(field, next, rest),
            None => Ok(None),
        },
        JsonValue::Array(items) => {
            let mut projected = Vec::with_capacity(items.len());
            for item in items {
                match traverse(field, item, parts)? {
                    Some(Lookup::Single(JsonValue::Array(_))) | Some(Lookup::Projected(_)) => {
                        return Err(EvalError::FieldTypeMismatch {
                            field: field.to_string(),
                            expected: "scalar",
                            found: "array",
                        });
                    }
                    Some(Lookup::Single(v)) => projected.push(Some(v)),
                    None => projected.push(None),
                }
            }
            if projected.iter().all(Option::is_none) {
                Ok(None)
            } else {
                Ok(Some(Lookup::Projected(projected)))
            }
        }
        _ => Ok(None),
    }
}

fn parse_ip_net(text: &str) -> Result<IpNet> {
    if let Ok(net) = text.parse::<IpNet>() {
        return Ok(net);
    }
    let addr: IpAddr = text
        .parse()
        .map_err(|_| EvalError::InvalidCidr(text.to_string()))?;
    Ok(IpNet::from(addr))
}

fn json_type_name(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
