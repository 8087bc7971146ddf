//! Evaluation context behavior across bindings, and iteration over ancestry.

use secl_eval::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Event wrapper counting resolver calls.
struct Counted<E> {
    inner: E,
    calls: AtomicUsize,
}

impl<E: Event> Counted<E> {
    fn new(inner: E) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<E: Event> Event for Counted<E> {
    fn event_type(&self) -> &str {
        self.inner.event_type()
    }

    fn resolve(&self, field: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(field)
    }
}

fn sshd_session() -> KernelEvent {
    let process = ProcessContext::new(300, "bash", "/bin/bash").with_ancestors(vec![
        AncestorEntry::new(200, "sshd", "/usr/sbin/sshd"),
        AncestorEntry::new(100, "sshd", "/usr/sbin/sshd"),
        AncestorEntry::new(1, "systemd", "/lib/systemd/systemd"),
    ]);
    KernelEvent::exec(process, "/usr/bin/id", &["-u"])
}

fn cron_job() -> KernelEvent {
    let process = ProcessContext::new(900, "sh", "/bin/sh").with_ancestors(vec![
        AncestorEntry::new(800, "cron", "/usr/sbin/cron"),
        AncestorEntry::new(1, "systemd", "/lib/systemd/systemd"),
    ]);
    KernelEvent::open(process, "/etc/crontab")
}

#[test]
fn test_rebinding_exposes_nothing_from_previous_event() {
    let pool = ContextPool::new();
    let first = sshd_session();
    let second = cron_job();

    {
        let mut ctx = pool.acquire(&first);
        assert_eq!(ctx.strings("process.name").unwrap(), ["bash"]);
        assert_eq!(ctx.strings("exec.file.path").unwrap(), ["/usr/bin/id"]);
        assert_eq!(ctx.iterator_count("process.ancestors.name").unwrap(), 3);
    }

    let mut ctx = pool.acquire(&second);
    assert_eq!(pool.stats().reused, 1);
    assert_eq!(ctx.cached_field_count(), 0);
    assert!(ctx.registers().is_empty());
    assert_eq!(ctx.strings("process.name").unwrap(), ["sh"]);
    assert_eq!(ctx.iterator_count("process.ancestors.name").unwrap(), 2);
    assert!(ctx.strings("exec.file.path").is_err());
}

#[test]
fn test_now_is_fixed_per_binding() {
    let event = cron_job();
    let pool = ContextPool::new();

    let first = {
        let mut ctx = pool.acquire(&event);
        let now = ctx.now();
        thread::sleep(Duration::from_millis(2));
        assert_eq!(ctx.now(), now);
        now
    };

    let mut ctx = pool.acquire(&event);
    assert!(ctx.now() > first);
}

#[test]
fn test_each_field_resolved_once_across_rules() {
    let event = Counted::new(sshd_session());
    let rules = vec![
        Rule::new("a", Expr::field_eq("exec.file.path", "/usr/bin/id")),
        Rule::new("b", Expr::field_eq("exec.file.path", "/usr/bin/whoami")),
        Rule::new(
            "c",
            Expr::and(vec![
                Expr::field_eq("process.name", "bash"),
                Expr::matches(
                    Operand::field("exec.file.path"),
                    Pattern::glob("/usr/bin/*").unwrap(),
                ),
            ]),
        ),
    ];
    let engine = Engine::new(rules).unwrap();

    let result = engine.evaluate(&event);
    assert_eq!(result.matched_rules, ["a", "c"]);
    assert_eq!(event.calls(), 2);
}

#[test]
fn test_unbound_context_is_an_error() {
    let store = VariableStore::new();
    let scopes = Default::default();
    let evaluator = Evaluator::new(&store, &scopes);
    let mut ctx = EvaluationContext::new();

    let rule = Rule::new("r", Expr::field_eq("process.name", "bash"));
    assert_eq!(evaluator.evaluate(&mut ctx, &rule), Err(EvalError::NoEventBound));
}

fn ancestor_named(register: u32, name: &str) -> Expr {
    Expr::compare(
        Operand::element(register, "process.ancestors.name"),
        CompareOp::Eq,
        Operand::literal(name),
    )
}

#[test]
fn test_quantifiers_over_ancestry() {
    let engine = Engine::new(vec![
        Rule::new(
            "spawned_by_sshd",
            Expr::any(0, "process.ancestors.name", ancestor_named(0, "sshd")),
        ),
        Rule::new(
            "all_sshd",
            Expr::all(0, "process.ancestors.name", ancestor_named(0, "sshd")),
        ),
        Rule::new(
            "all_system_binaries",
            Expr::all(
                0,
                "process.ancestors.file.path",
                Expr::matches(
                    Operand::element(0, "process.ancestors.file.path"),
                    Pattern::regex("^/(usr/)?s?bin/|^/lib/").unwrap(),
                ),
            ),
        ),
    ])
    .unwrap();

    let session = engine.evaluate(&sshd_session());
    assert_eq!(session.matched_rules, ["spawned_by_sshd", "all_system_binaries"]);

    let cron = engine.evaluate(&cron_job());
    assert_eq!(cron.matched_rules, ["all_system_binaries"]);
}

#[test]
fn test_empty_ancestry() {
    let orphan = KernelEvent::open(ProcessContext::new(1, "init", "/sbin/init"), "/etc/fstab");
    let engine = Engine::new(vec![
        Rule::new(
            "any",
            Expr::any(0, "process.ancestors.name", Expr::Literal(true)),
        ),
        Rule::new(
            "all",
            Expr::all(0, "process.ancestors.name", Expr::Literal(false)),
        ),
    ])
    .unwrap();

    assert_eq!(engine.evaluate(&orphan).matched_rules, ["all"]);
}

#[test]
fn test_sibling_fields_of_one_ancestor() {
    // An sshd ancestor with pid 100, checked on the same element.
    let correlated = Expr::any(
        0,
        "process.ancestors.name",
        Expr::and(vec![
            ancestor_named(0, "sshd"),
            Expr::compare(
                Operand::element(0, "process.ancestors.pid"),
                CompareOp::Eq,
                Operand::literal(100),
            ),
        ]),
    );
    // A systemd ancestor with pid 200 does not exist, though both values occur.
    let mismatched = Expr::any(
        0,
        "process.ancestors.name",
        Expr::and(vec![
            ancestor_named(0, "systemd"),
            Expr::compare(
                Operand::element(0, "process.ancestors.pid"),
                CompareOp::Eq,
                Operand::literal(200),
            ),
        ]),
    );
    let engine = Engine::new(vec![
        Rule::new("correlated", correlated),
        Rule::new("mismatched", mismatched),
    ])
    .unwrap();

    assert_eq!(engine.evaluate(&sshd_session()).matched_rules, ["correlated"]);
}

#[test]
fn test_partially_populated_ancestry_never_misaligns() {
    // The first ancestor has no name; the sshd ancestor has pid 7.
    let event = JsonEvent::new(
        "exec",
        serde_json::json!({
            "process": {"ancestors": [{"pid": 10}, {"name": "sshd", "pid": 7}]}
        }),
    );
    let sshd_is = |pid: i64| {
        Expr::any(
            0,
            "process.ancestors.name",
            Expr::and(vec![
                ancestor_named(0, "sshd"),
                Expr::compare(
                    Operand::element(0, "process.ancestors.pid"),
                    CompareOp::Eq,
                    Operand::literal(pid),
                ),
            ]),
        )
    };
    let engine = Engine::new(vec![
        Rule::new("sshd_is_10", sshd_is(10)),
        Rule::new("sshd_is_7", sshd_is(7)),
    ])
    .unwrap();

    let result = engine.evaluate(&event);
    assert!(result.matched_rules.is_empty());
    assert!(result.failed_rules.is_empty());
}

#[test]
fn test_nested_iteration() {
    // Two distinct ancestors share a name.
    let repeated_name = Expr::any(
        0,
        "process.ancestors.name",
        Expr::any(
            1,
            "process.ancestors.name",
            Expr::and(vec![
                Expr::compare(
                    Operand::element(0, "process.ancestors.name"),
                    CompareOp::Eq,
                    Operand::element(1, "process.ancestors.name"),
                ),
                Expr::compare(
                    Operand::element(0, "process.ancestors.pid"),
                    CompareOp::Ne,
                    Operand::element(1, "process.ancestors.pid"),
                ),
            ]),
        ),
    );
    let engine = Engine::new(vec![Rule::new("repeated_name", repeated_name)]).unwrap();

    assert!(engine.evaluate(&sshd_session()).is_match());
    assert!(!engine.evaluate(&cron_job()).is_match());
}

#[test]
fn test_reentering_a_register_restores_outer_iteration() {
    // The inner walk reuses register 0; the outer comparison after it must
    // still see the outer element.
    let reentrant = Expr::any(
        0,
        "process.ancestors.name",
        Expr::and(vec![
            Expr::any(0, "process.ancestors.pid", Expr::Literal(true)),
            ancestor_named(0, "systemd"),
        ]),
    );
    let engine = Engine::new(vec![Rule::new("reentrant", reentrant)]).unwrap();
    assert!(engine.evaluate(&sshd_session()).is_match());
}
