//! Typed kernel event model with table-driven field resolution.

use super::Event;
use crate::error::{EvalError, Result};
use crate::value::Value;
use chrono::{DateTime, Utc};
use ipnet::IpNet;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Event kind tag, one per payload variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Exec,
    Connect,
    ContainerLifecycle,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Exec => "exec",
            EventKind::Connect => "connect",
            EventKind::ContainerLifecycle => "container_lifecycle",
        }
    }
}

/// One entry of the process ancestry, closest parent first.
#[derive(Debug, Clone, PartialEq)]
pub struct AncestorEntry {
    pub pid: u32,
    pub name: String,
    pub file_path: String,
    pub is_thread: bool,
}

impl AncestorEntry {
    pub fn new(pid: u32, name: &str, file_path: &str) -> Self {
        Self {
            pid,
            name: name.to_string(),
            file_path: file_path.to_string(),
            is_thread: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessContext {
    pub pid: u32,
    pub ppid: u32,
    pub uid: u32,
    pub name: String,
    pub file_path: String,
    pub is_thread: bool,
    pub ancestors: Vec<AncestorEntry>,
}

impl ProcessContext {
    pub fn new(pid: u32, name: &str, file_path: &str) -> Self {
        Self {
            pid,
            name: name.to_string(),
            file_path: file_path.to_string(),
            ..Default::default()
        }
    }

    pub fn with_ancestors(mut self, ancestors: Vec<AncestorEntry>) -> Self {
        self.ppid = ancestors.first().map_or(0, |a| a.pid);
        self.ancestors = ancestors;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerContext {
    pub id: String,
    /// Creation time in nanoseconds since the Unix epoch.
    pub created_at: i64,
    pub runtime: String,
    pub tags: Vec<String>,
}

impl ContainerContext {
    pub fn new(id: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            created_at: created_at.timestamp_nanos_opt().unwrap_or(0),
            runtime: "docker".to_string(),
            tags: Vec::new(),
        }
    }

    pub fn with_runtime(mut self, runtime: &str) -> Self {
        self.runtime = runtime.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenEvent {
    pub file_path: String,
    pub flags: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecEvent {
    pub file_path: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectEvent {
    pub addr: IpNet,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerLifecycleEvent {
    /// `created`, `started`, `stopped`, ...
    pub action: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Open(OpenEvent),
    Exec(ExecEvent),
    Connect(ConnectEvent),
    ContainerLifecycle(ContainerLifecycleEvent),
}

/// Kernel event as produced by the collector.
///
/// Common process / container context plus one kind-specific payload. Fields are
/// resolved through a static table mapping each field name to a plain function,
/// so resolution is one hash lookup and one direct call.
///
/// # Example
/// ```rust,ignore
/// let event = KernelEvent::open(ProcessContext::new(42, "touch", "/usr/bin/touch"), "/root/test-open")
///     .with_container(ContainerContext::new("abc", Utc::now()));
///
/// assert_eq!(event.resolve("open.file.path")?, Value::from("/root/test-open"));
/// assert_eq!(event.resolve("container.id")?, Value::from("abc"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KernelEvent {
    /// Event time in nanoseconds since the Unix epoch.
    pub timestamp: i64,
    pub process: ProcessContext,
    pub container: Option<ContainerContext>,
    pub payload: EventPayload,
}

impl KernelEvent {
    pub fn new(process: ProcessContext, payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or(0),
            process,
            container: None,
            payload,
        }
    }

    pub fn open(process: ProcessContext, file_path: &str) -> Self {
        Self::new(
            process,
            EventPayload::Open(OpenEvent {
                file_path: file_path.to_string(),
                flags: 0,
            }),
        )
    }

    pub fn exec(process: ProcessContext, file_path: &str, args: &[&str]) -> Self {
        Self::new(
            process,
            EventPayload::Exec(ExecEvent {
                file_path: file_path.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            }),
        )
    }

    pub fn connect(process: ProcessContext, addr: IpNet, port: u16) -> Self {
        Self::new(process, EventPayload::Connect(ConnectEvent { addr, port }))
    }

    pub fn container_lifecycle(process: ProcessContext, action: &str) -> Self {
        Self::new(
            process,
            EventPayload::ContainerLifecycle(ContainerLifecycleEvent {
                action: action.to_string(),
            }),
        )
    }

    pub fn with_container(mut self, container: ContainerContext) -> Self {
        self.container = Some(container);
        self
    }

    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::Open(_) => EventKind::Open,
            EventPayload::Exec(_) => EventKind::Exec,
            EventPayload::Connect(_) => EventKind::Connect,
            EventPayload::ContainerLifecycle(_) => EventKind::ContainerLifecycle,
        }
    }

    /// Whether `field` exists in the schema of any event kind.
    pub fn is_known_field(field: &str) -> bool {
        field_table().contains_key(field)
    }

    /// All field names of the schema, sorted.
    pub fn fields() -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = field_table().keys().copied().collect();
        fields.sort_unstable();
        fields
    }

    fn not_applicable(&self, field: &str) -> EvalError {
        EvalError::FieldNotApplicable {
            field: field.to_string(),
            event_type: self.kind().as_str().to_string(),
        }
    }

    fn open_payload(&self, field: &str) -> Result<&OpenEvent> {
        match &self.payload {
            EventPayload::Open(open) => Ok(open),
            _ => Err(self.not_applicable(field)),
        }
    }

    fn exec_payload(&self, field: &str) -> Result<&ExecEvent> {
        match &self.payload {
            EventPayload::Exec(exec) => Ok(exec),
            _ => Err(self.not_applicable(field)),
        }
    }

    fn connect_payload(&self, field: &str) -> Result<&ConnectEvent> {
        match &self.payload {
            EventPayload::Connect(connect) => Ok(connect),
            _ => Err(self.not_applicable(field)),
        }
    }

    fn lifecycle_payload(&self, field: &str) -> Result<&ContainerLifecycleEvent> {
        match &self.payload {
            EventPayload::ContainerLifecycle(lifecycle) => Ok(lifecycle),
            _ => Err(self.not_applicable(field)),
        }
    }
}

impl Event for KernelEvent {
    fn event_type(&self) -> &str {
        self.kind().as_str()
    }

    fn resolve(&self, field: &str) -> Result<Value> {
        match field_table().get(field) {
            Some(resolver) => resolver(self),
            None => Err(EvalError::FieldNotFound(field.to_string())),
        }
    }
}

type FieldResolverFn = fn(&KernelEvent) -> Result<Value>;

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

static FIELD_TABLE: OnceLock<HashMap<&'static str, FieldResolverFn>> = OnceLock::new();

fn field_table() -> &'static HashMap<&'static str, FieldResolverFn> {
    FIELD_TABLE.get_or_init(|| {
        let mut table: HashMap<&'static str, FieldResolverFn> = HashMap::new();

        table.insert("event.type", |e| Ok(Value::from(e.kind().as_str())));
        table.insert("event.timestamp", |e| Ok(Value::Int(e.timestamp)));

        // Process context, common to every kind
        table.insert("process.pid", |e| Ok(Value::Int(e.process.pid.into())));
        table.insert("process.ppid", |e| Ok(Value::Int(e.process.ppid.into())));
        table.insert("process.uid", |e| Ok(Value::Int(e.process.uid.into())));
        table.insert("process.name", |e| Ok(Value::from(e.process.name.as_str())));
        table.insert("process.file.path", |e| {
            Ok(Value::from(e.process.file_path.as_str()))
        });
        table.insert("process.is_thread", |e| Ok(Value::Bool(e.process.is_thread)));
        table.insert("process.ancestors.pid", |e| {
            Ok(Value::Ints(
                e.process.ancestors.iter().map(|a| i64::from(a.pid)).collect(),
            ))
        });
        table.insert("process.ancestors.name", |e| {
            Ok(Value::Strings(
                e.process.ancestors.iter().map(|a| a.name.clone()).collect(),
            ))
        });
        table.insert("process.ancestors.file.path", |e| {
            Ok(Value::Strings(
                e.process
                    .ancestors
                    .iter()
                    .map(|a| a.file_path.clone())
                    .collect(),
            ))
        });
        table.insert("process.ancestors.is_thread", |e| {
            Ok(Value::Bools(
                e.process.ancestors.iter().map(|a| a.is_thread).collect(),
            ))
        });

        // Container context: host processes resolve to empty values
        table.insert("container.id", |e| {
            Ok(Value::from(
                e.container.as_ref().map_or("", |c| c.id.as_str()),
            ))
        });
        table.insert("container.created_at", |e| {
            Ok(Value::Int(e.container.as_ref().map_or(0, |c| c.created_at)))
        });
        table.insert("container.runtime", |e| {
            Ok(Value::from(
                e.container.as_ref().map_or("", |c| c.runtime.as_str()),
            ))
        });
        table.insert("container.tags", |e| {
            Ok(Value::Strings(
                e.container
                    .as_ref()
                    .map(|c| c.tags.clone())
                    .unwrap_or_default(),
            ))
        });

        // Kind-specific payloads
        table.insert("open.file.path", |e| {
            Ok(Value::from(e.open_payload("open.file.path")?.file_path.as_str()))
        });
        table.insert("open.file.name", |e| {
            Ok(Value::from(basename(
                &e.open_payload("open.file.name")?.file_path,
            )))
        });
        table.insert("open.flags", |e| {
            Ok(Value::Int(e.open_payload("open.flags")?.flags))
        });
        table.insert("exec.file.path", |e| {
            Ok(Value::from(e.exec_payload("exec.file.path")?.file_path.as_str()))
        });
        table.insert("exec.args", |e| {
            Ok(Value::Strings(e.exec_payload("exec.args")?.args.clone()))
        });
        table.insert("connect.addr.ip", |e| {
            Ok(Value::IpNet(e.connect_payload("connect.addr.ip")?.addr))
        });
        table.insert("connect.addr.port", |e| {
            Ok(Value::Int(e.connect_payload("connect.addr.port")?.port.into()))
        });
        table.insert("container_lifecycle.action", |e| {
            Ok(Value::from(
                e.lifecycle_payload("container_lifecycle.action")?
                    .action
                    .as_str(),
            ))
        });

        table
    })
}
