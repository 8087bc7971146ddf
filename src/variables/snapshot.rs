//! Serializable copy of the variable store.

use super::Scope;
use crate::error::Result;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// One variable with its remaining lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub scope: Scope,
    pub key: String,
    pub name: String,
    pub value: Value,
    /// Milliseconds left before expiry; `None` for entries without TTL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_remaining_ms: Option<u64>,
}

/// Point-in-time copy of every live variable, sorted by address.
///
/// Produced by [`VariableStore::snapshot`](super::VariableStore::snapshot) and
/// consumed by [`VariableStore::restore`](super::VariableStore::restore), so a
/// host can carry correlation state across restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableSnapshot {
    pub entries: Vec<SnapshotEntry>,
}

impl VariableSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::variables::VariableStore;
    use std::time::Duration;

    #[test]
    fn test_snapshot_restore() {
        let store = VariableStore::new();
        store.set(Scope::Container, "abc", "foo", Value::Int(1));
        store.set(Scope::Global, "", "paths", Value::from(vec!["/a", "/b"]));
        store.set_with_ttl(
            Scope::Process,
            "42",
            "seen",
            Value::Bool(true),
            Some(Duration::from_secs(60)),
        );

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.entries[0].scope, Scope::Global);
        assert_eq!(snapshot.entries[1].scope, Scope::Process);
        assert_eq!(snapshot.entries[2].ttl_remaining_ms, None);
        let ttl = snapshot.entries[1].ttl_remaining_ms.unwrap();
        assert!(ttl > 0 && ttl <= 60_000);

        let json = snapshot.to_json().unwrap();
        let restored = VariableStore::new();
        assert_eq!(restored.restore(&VariableSnapshot::from_json(&json).unwrap()), 3);
        assert_eq!(restored.get(&Scope::Container, "abc", "foo"), Value::Int(1));
        assert_eq!(
            restored.get(&Scope::Global, "", "paths"),
            Value::from(vec!["/a", "/b"])
        );
        assert_eq!(restored.get(&Scope::Process, "42", "seen"), Value::Bool(true));
    }

    #[test]
    fn test_snapshot_skips_expired() {
        let store = VariableStore::new();
        store.set_with_ttl(
            Scope::Global,
            "",
            "gone",
            Value::Int(1),
            Some(Duration::from_millis(1)),
        );
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            VariableSnapshot::from_json("{not json"),
            Err(EvalError::Snapshot(_))
        ));
    }
}
