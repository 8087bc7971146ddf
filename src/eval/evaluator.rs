//! Expression tree walker.

use super::expr::{CompareOp, Expr, Operand, Quantifier};
use super::pattern::Pattern;
use crate::context::{EvaluationContext, FieldValues, RegisterId};
use crate::error::{EvalError, Result};
use crate::rule::{Action, Rule, SetValue, SetVariable};
use crate::value::Value;
use crate::variables::{ScopeRegistry, VariableStore};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace};

/// Outcome of one rule against one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    pub matched: bool,
    /// Actions that wrote to the variable store.
    pub actions_applied: usize,
}

/// Walks rule expressions against an evaluation context.
///
/// The evaluator itself is stateless; per-event state lives in the context and
/// cross-event state in the variable store. One evaluator can serve any number
/// of workers.
///
/// Field resolution failures make the predicate that needed the field false.
/// They never fail the rule.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    variables: &'a VariableStore,
    scopes: &'a ScopeRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(variables: &'a VariableStore, scopes: &'a ScopeRegistry) -> Self {
        Self { variables, scopes }
    }

    /// Evaluate `rule` and run its actions when it matches.
    ///
    /// # Errors
    /// [`EvalError::NoEventBound`] when `ctx` has no event, and
    /// [`EvalError::RegisterNotBound`] for trees reading a register outside its
    /// iteration.
    pub fn evaluate(&self, ctx: &mut EvaluationContext<'_>, rule: &Rule) -> Result<bool> {
        Ok(self.evaluate_rule(ctx, rule)?.matched)
    }

    pub fn evaluate_rule(&self, ctx: &mut EvaluationContext<'_>, rule: &Rule) -> Result<RuleOutcome> {
        if !ctx.is_bound() {
            error!(rule = %rule.id, "rule evaluated without a bound event");
            return Err(EvalError::NoEventBound);
        }

        ctx.clear_registers();
        if !self.matches(ctx, &rule.expr)? {
            return Ok(RuleOutcome::default());
        }
        debug!(rule = %rule.id, "rule matched");

        let mut actions_applied = 0;
        for action in &rule.actions {
            let applied = match action {
                Action::SetVariable(set) => self.set_variable(ctx, rule, set)?,
            };
            if applied {
                actions_applied += 1;
            }
        }
        Ok(RuleOutcome {
            matched: true,
            actions_applied,
        })
    }

    /// Evaluate an expression without running any action.
    pub fn matches(&self, ctx: &mut EvaluationContext<'_>, expr: &Expr) -> Result<bool> {
        match expr {
            Expr::Literal(value) => Ok(*value),
            Expr::And(children) => {
                for child in children {
                    if !self.matches(ctx, child)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Or(children) => {
                for child in children {
                    if self.matches(ctx, child)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::Not(child) => Ok(!self.matches(ctx, child)?),
            Expr::Compare { left, op, right } => {
                absent_as_false(self.compare(ctx, left, *op, right))
            }
            Expr::In {
                operand,
                set,
                negated,
            } => absent_as_false(self.membership(ctx, operand, set, *negated)),
            Expr::Match {
                operand,
                pattern,
                negated,
            } => absent_as_false(self.pattern_match(ctx, operand, pattern, *negated)),
            Expr::Age {
                operand,
                op,
                duration,
            } => absent_as_false(self.age(ctx, operand, *op, *duration)),
            Expr::Iterate {
                register,
                field,
                quantifier,
                body,
            } => absent_as_false(self.iterate(ctx, *register, field, *quantifier, body)),
        }
    }

    fn compare(
        &self,
        ctx: &mut EvaluationContext<'_>,
        left: &Operand,
        op: CompareOp,
        right: &Operand,
    ) -> Result<Option<bool>> {
        let right = self.operand_value(ctx, right)?;
        let right = FieldValues::of(&right);
        match left {
            Operand::Field(field) => Ok(compare_values(ctx.resolve(field)?, op, right)),
            other => {
                let left = self.operand_value(ctx, other)?;
                Ok(compare_values(FieldValues::of(&left), op, right))
            }
        }
    }

    fn membership(
        &self,
        ctx: &mut EvaluationContext<'_>,
        operand: &Operand,
        set: &Operand,
        negated: bool,
    ) -> Result<Option<bool>> {
        let set = self.operand_value(ctx, set)?;
        let set = FieldValues::of(&set);
        let found = match operand {
            Operand::Field(field) => contains_any(ctx.resolve(field)?, set),
            other => {
                let value = self.operand_value(ctx, other)?;
                contains_any(FieldValues::of(&value), set)
            }
        };
        Ok(found.map(|found| found != negated))
    }

    fn pattern_match(
        &self,
        ctx: &mut EvaluationContext<'_>,
        operand: &Operand,
        pattern: &Pattern,
        negated: bool,
    ) -> Result<Option<bool>> {
        let found = match operand {
            Operand::Field(field) => any_string_matches(ctx.resolve(field)?, pattern),
            other => {
                let value = self.operand_value(ctx, other)?;
                any_string_matches(FieldValues::of(&value), pattern)
            }
        };
        Ok(found.map(|found| found != negated))
    }

    fn age(
        &self,
        ctx: &mut EvaluationContext<'_>,
        operand: &Operand,
        op: CompareOp,
        duration: Duration,
    ) -> Result<Option<bool>> {
        let now = ctx.now_nanos();
        let limit = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        let holds = |timestamps: &[i64]| {
            let positive = if op == CompareOp::Ne { CompareOp::Eq } else { op };
            let found = timestamps
                .iter()
                .any(|ts| positive.holds(now.saturating_sub(*ts).cmp(&limit)));
            found != (op == CompareOp::Ne)
        };

        match operand {
            Operand::Field(field) => Ok(Some(holds(ctx.ints(field)?))),
            other => match &*self.operand_value(ctx, other)? {
                Value::Int(ts) => Ok(Some(holds(std::slice::from_ref(ts)))),
                Value::Ints(ts) => Ok(Some(holds(ts))),
                _ => Ok(None),
            },
        }
    }

    fn iterate(
        &self,
        ctx: &mut EvaluationContext<'_>,
        register: RegisterId,
        field: &Arc<str>,
        quantifier: Quantifier,
        body: &Expr,
    ) -> Result<Option<bool>> {
        let count = ctx.iterator_count(field)?;
        let saved = ctx.enter_register(register, Arc::clone(field));
        let outcome = self.walk(ctx, register, count, quantifier, body);
        ctx.exit_register(register, saved);
        outcome.map(Some)
    }

    fn walk(
        &self,
        ctx: &mut EvaluationContext<'_>,
        register: RegisterId,
        count: usize,
        quantifier: Quantifier,
        body: &Expr,
    ) -> Result<bool> {
        for position in 0..count {
            ctx.advance_register(register, position);
            let holds = self.matches(ctx, body)?;
            match quantifier {
                Quantifier::Any if holds => return Ok(true),
                Quantifier::All if !holds => return Ok(false),
                _ => {}
            }
        }
        Ok(quantifier == Quantifier::All)
    }

    /// Owned or borrowed value of a non-field operand. Field operands are copied
    /// out of the cache; comparisons borrow them directly instead.
    fn operand_value<'o>(
        &self,
        ctx: &mut EvaluationContext<'_>,
        operand: &'o Operand,
    ) -> Result<Cow<'o, Value>> {
        match operand {
            Operand::Literal(value) => Ok(Cow::Borrowed(value)),
            Operand::Field(field) => Ok(Cow::Owned(ctx.value(field)?)),
            Operand::Element { register, field } => Ok(Cow::Owned(ctx.element(*register, field)?)),
            Operand::Variable { scope, name } => {
                let value = match self.scopes.key_for(scope, ctx) {
                    Some(key) => self.variables.get(scope, &key, name),
                    None => self.variables.default_value(scope, name),
                };
                Ok(Cow::Owned(value))
            }
        }
    }

    fn set_variable(
        &self,
        ctx: &mut EvaluationContext<'_>,
        rule: &Rule,
        set: &SetVariable,
    ) -> Result<bool> {
        let Some(key) = self.scopes.key_for(&set.scope, ctx) else {
            self.variables.record_skipped_write(&set.scope, &set.name);
            return Ok(false);
        };

        let value = match &set.value {
            SetValue::Literal(value) => value.clone(),
            SetValue::Field(field) => match ctx.value(field) {
                Ok(value) => value,
                Err(err) if err.is_field_absent() => {
                    debug!(rule = %rule.id, field = %field, "source field absent, variable not set");
                    return Ok(false);
                }
                Err(err) => return Err(err),
            },
        };

        let ttl = set.ttl.or_else(|| self.variables.config().default_ttl());
        let written = if set.append {
            self.variables
                .append(set.scope.clone(), &key, &set.name, value, ttl)
        } else {
            self.variables
                .set_with_ttl(set.scope.clone(), &key, &set.name, value, ttl)
        };
        if written {
            debug!(
                rule = %rule.id,
                scope = %set.scope,
                key = %key,
                variable = %set.name,
                "variable set"
            );
        }
        Ok(written)
    }
}

/// Fold "field absent" errors and kind mismatches into a false predicate.
fn absent_as_false(result: Result<Option<bool>>) -> Result<bool> {
    match result {
        Ok(outcome) => Ok(outcome.unwrap_or(false)),
        Err(err) if err.is_field_absent() => {
            trace!(error = %err, "predicate false on absent field");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

fn any_pair<T>(left: &[T], right: &[T], holds: impl Fn(&T, &T) -> bool) -> bool {
    left.iter().any(|l| right.iter().any(|r| holds(l, r)))
}

/// Any-element comparison. `None` when the kinds cannot be compared.
fn compare_values(left: FieldValues<'_>, op: CompareOp, right: FieldValues<'_>) -> Option<bool> {
    let positive = if op == CompareOp::Ne { CompareOp::Eq } else { op };
    let check = |ordering: Ordering| positive.holds(ordering);
    let found = match (left, right) {
        (FieldValues::Strings(l), FieldValues::Strings(r)) => any_pair(l, r, |a, b| check(a.cmp(b))),
        (FieldValues::Ints(l), FieldValues::Ints(r)) => any_pair(l, r, |a, b| check(a.cmp(b))),
        (FieldValues::Bools(l), FieldValues::Bools(r)) => any_pair(l, r, |a, b| check(a.cmp(b))),
        (FieldValues::IpNets(l), FieldValues::IpNets(r)) => any_pair(l, r, |a, b| check(a.cmp(b))),
        _ => return None,
    };
    Some(found != (op == CompareOp::Ne))
}

fn contains_any(values: FieldValues<'_>, set: FieldValues<'_>) -> Option<bool> {
    let found = match (values, set) {
        (FieldValues::Strings(v), FieldValues::Strings(s)) => v.iter().any(|x| s.contains(x)),
        (FieldValues::Ints(v), FieldValues::Ints(s)) => v.iter().any(|x| s.contains(x)),
        (FieldValues::Bools(v), FieldValues::Bools(s)) => v.iter().any(|x| s.contains(x)),
        (FieldValues::IpNets(v), FieldValues::IpNets(s)) => v
            .iter()
            .any(|addr| s.iter().any(|net| net.contains(addr))),
        _ => return None,
    };
    Some(found)
}

fn any_string_matches(values: FieldValues<'_>, pattern: &Pattern) -> Option<bool> {
    match values {
        FieldValues::Strings(v) => Some(v.iter().any(|s| pattern.is_match(s))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::JsonEvent;
    use crate::variables::Scope;
    use ipnet::IpNet;
    use serde_json::json;

    struct Harness {
        store: VariableStore,
        scopes: ScopeRegistry,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: VariableStore::new(),
                scopes: ScopeRegistry::default(),
            }
        }

        fn evaluator(&self) -> Evaluator<'_> {
            Evaluator::new(&self.store, &self.scopes)
        }

        fn check(&self, event: &JsonEvent, expr: Expr) -> bool {
            let mut ctx = EvaluationContext::with_event(event);
            self.evaluator().matches(&mut ctx, &expr).unwrap()
        }
    }

    fn exec_event() -> JsonEvent {
        JsonEvent::new(
            "exec",
            json!({
                "exec": {"file": {"path": "/usr/bin/curl"}, "args": ["-s", "http://x"]},
                "process": {
                    "pid": 42,
                    "ancestors": [
                        {"name": "bash", "pid": 40, "uid": 1000},
                        {"name": "sshd", "pid": 7, "uid": 0},
                        {"name": "systemd", "pid": 1, "uid": 0}
                    ]
                },
                "network": {"ip": "10.1.2.3"},
                "container": {"id": "abc"}
            }),
        )
        .with_ip_fields(["network.ip"])
    }

    #[test]
    fn test_comparisons() {
        let h = Harness::new();
        let event = exec_event();
        assert!(h.check(&event, Expr::field_eq("exec.file.path", "/usr/bin/curl")));
        assert!(h.check(&event, Expr::field_cmp("process.pid", CompareOp::Gt, 10)));
        assert!(h.check(&event, Expr::field_cmp("process.pid", CompareOp::Le, 42)));
        assert!(!h.check(&event, Expr::field_cmp("process.pid", CompareOp::Lt, 42)));
        assert!(h.check(&event, Expr::field_cmp("process.pid", CompareOp::Ne, 1)));
    }

    #[test]
    fn test_array_field_matches_any_element() {
        let h = Harness::new();
        let event = exec_event();
        assert!(h.check(&event, Expr::field_eq("process.ancestors.name", "sshd")));
        assert!(!h.check(&event, Expr::field_eq("process.ancestors.name", "init")));
        assert!(h.check(
            &event,
            Expr::field_cmp("process.ancestors.name", CompareOp::Ne, "init")
        ));
        assert!(!h.check(
            &event,
            Expr::field_cmp("process.ancestors.name", CompareOp::Ne, "sshd")
        ));
    }

    #[test]
    fn test_absent_field_is_false_for_negations_too() {
        let h = Harness::new();
        let event = exec_event();
        assert!(!h.check(&event, Expr::field_eq("open.file.path", "/etc/passwd")));
        assert!(!h.check(
            &event,
            Expr::field_cmp("open.file.path", CompareOp::Ne, "/etc/passwd")
        ));
        assert!(!h.check(
            &event,
            Expr::not_in(
                Operand::field("open.file.path"),
                Operand::literal(vec!["/a", "/b"])
            )
        ));
        assert!(!h.check(
            &event,
            Expr::not_matches(Operand::field("open.file.path"), Pattern::glob("/tmp/*").unwrap())
        ));
    }

    #[test]
    fn test_kind_mismatch_is_false() {
        let h = Harness::new();
        let event = exec_event();
        assert!(!h.check(&event, Expr::field_eq("process.pid", "42")));
        assert!(!h.check(&event, Expr::field_cmp("process.pid", CompareOp::Ne, "42")));
    }

    #[test]
    fn test_membership_and_cidr() {
        let h = Harness::new();
        let event = exec_event();
        assert!(h.check(
            &event,
            Expr::is_in(
                Operand::field("exec.file.path"),
                Operand::literal(vec!["/usr/bin/wget", "/usr/bin/curl"])
            )
        ));
        assert!(h.check(
            &event,
            Expr::not_in(Operand::field("process.pid"), Operand::literal(vec![1i64, 2]))
        ));

        let private: Vec<IpNet> = vec!["10.0.0.0/8".parse().unwrap(), "192.168.0.0/16".parse().unwrap()];
        assert!(h.check(
            &event,
            Expr::is_in(Operand::field("network.ip"), Operand::literal(private))
        ));
        let public: Vec<IpNet> = vec!["8.8.8.0/24".parse().unwrap()];
        assert!(h.check(
            &event,
            Expr::not_in(Operand::field("network.ip"), Operand::literal(public))
        ));
    }

    #[test]
    fn test_pattern_match() {
        let h = Harness::new();
        let event = exec_event();
        assert!(h.check(
            &event,
            Expr::matches(Operand::field("exec.args"), Pattern::glob("http://*").unwrap())
        ));
        assert!(h.check(
            &event,
            Expr::not_matches(Operand::field("exec.file.path"), Pattern::glob("/tmp/*").unwrap())
        ));
        assert!(!h.check(
            &event,
            Expr::matches(Operand::field("process.pid"), Pattern::glob("4*").unwrap())
        ));
    }

    #[test]
    fn test_boolean_short_circuit() {
        let h = Harness::new();
        let event = exec_event();
        let mut ctx = EvaluationContext::with_event(&event);
        let expr = Expr::or(vec![
            Expr::field_eq("exec.file.path", "/usr/bin/curl"),
            Expr::field_eq("process.pid", 42),
        ]);
        assert!(h.evaluator().matches(&mut ctx, &expr).unwrap());
        assert_eq!(ctx.resolved_fields(), ["exec.file.path"]);

        let expr = Expr::and(vec![
            Expr::field_eq("exec.file.path", "/bin/sh"),
            Expr::field_eq("container.id", "abc"),
        ]);
        assert!(!h.evaluator().matches(&mut ctx, &expr).unwrap());
        assert_eq!(ctx.resolved_fields(), ["exec.file.path"]);

        assert!(h.check(&event, Expr::not(Expr::field_eq("process.pid", 1))));
    }

    #[test]
    fn test_quantifiers() {
        let h = Harness::new();
        let event = exec_event();
        let root = Expr::compare(
            Operand::element(0, "process.ancestors.uid"),
            CompareOp::Eq,
            Operand::literal(0),
        );
        assert!(h.check(&event, Expr::any(0, "process.ancestors.uid", root.clone())));
        assert!(!h.check(&event, Expr::all(0, "process.ancestors.uid", root)));

        let event = JsonEvent::new("exec", json!({"exec": {"args": []}}));
        let body = Expr::Literal(true);
        assert!(!h.check(&event, Expr::any(0, "exec.args", body.clone())));
        assert!(h.check(&event, Expr::all(0, "exec.args", body.clone())));
        assert!(!h.check(&event, Expr::all(0, "exec.missing", body)));
    }

    #[test]
    fn test_sibling_fields_stay_correlated() {
        let h = Harness::new();
        let event = exec_event();
        let sshd_is_pid_7 = Expr::any(
            0,
            "process.ancestors.name",
            Expr::and(vec![
                Expr::compare(
                    Operand::element(0, "process.ancestors.name"),
                    CompareOp::Eq,
                    Operand::literal("sshd"),
                ),
                Expr::compare(
                    Operand::element(0, "process.ancestors.pid"),
                    CompareOp::Eq,
                    Operand::literal(7),
                ),
            ]),
        );
        assert!(h.check(&event, sshd_is_pid_7));

        let bash_is_pid_7 = Expr::any(
            0,
            "process.ancestors.name",
            Expr::and(vec![
                Expr::compare(
                    Operand::element(0, "process.ancestors.name"),
                    CompareOp::Eq,
                    Operand::literal("bash"),
                ),
                Expr::compare(
                    Operand::element(0, "process.ancestors.pid"),
                    CompareOp::Eq,
                    Operand::literal(7),
                ),
            ]),
        );
        assert!(!h.check(&event, bash_is_pid_7));
    }

    #[test]
    fn test_nested_iteration_distinct_registers() {
        let h = Harness::new();
        let event = exec_event();
        // Some ancestor has a pid larger than another ancestor's pid.
        let expr = Expr::any(
            0,
            "process.ancestors.pid",
            Expr::any(
                1,
                "process.ancestors.pid",
                Expr::compare(
                    Operand::element(0, "process.ancestors.pid"),
                    CompareOp::Gt,
                    Operand::element(1, "process.ancestors.pid"),
                ),
            ),
        );
        assert!(h.check(&event, expr));

        // No ancestor pid is larger than every ancestor pid, itself included.
        let expr = Expr::any(
            0,
            "process.ancestors.pid",
            Expr::all(
                1,
                "process.ancestors.pid",
                Expr::compare(
                    Operand::element(0, "process.ancestors.pid"),
                    CompareOp::Gt,
                    Operand::element(1, "process.ancestors.pid"),
                ),
            ),
        );
        assert!(!h.check(&event, expr));
    }

    #[test]
    fn test_registers_released_after_iteration() {
        let h = Harness::new();
        let event = exec_event();
        let mut ctx = EvaluationContext::with_event(&event);
        let expr = Expr::any(0, "process.ancestors.name", Expr::Literal(false));
        assert!(!h.evaluator().matches(&mut ctx, &expr).unwrap());
        assert!(ctx.registers().cursor(0).is_none());

        let stray = Expr::field_eq("unused", 1);
        let element_outside = Expr::compare(
            Operand::element(9, "process.ancestors.name"),
            CompareOp::Eq,
            Operand::literal("bash"),
        );
        assert!(!h.evaluator().matches(&mut ctx, &stray).unwrap());
        assert_eq!(
            h.evaluator().matches(&mut ctx, &element_outside),
            Err(EvalError::RegisterNotBound(9))
        );
    }

    #[test]
    fn test_age_comparison() {
        let h = Harness::new();
        let created = chrono::Utc::now() - chrono::Duration::seconds(1);
        let event = JsonEvent::new(
            "open",
            json!({"container": {"created_at": created.timestamp_nanos_opt().unwrap()}}),
        );
        let three = Duration::from_secs(3);
        assert!(h.check(&event, Expr::age("container.created_at", CompareOp::Lt, three)));
        assert!(!h.check(&event, Expr::age("container.created_at", CompareOp::Gt, three)));
        assert!(!h.check(&event, Expr::age("container.missing", CompareOp::Lt, three)));
    }

    #[test]
    fn test_variables_and_actions() {
        let h = Harness::new();
        let event = exec_event();
        let rule = Rule::new("tag", Expr::field_eq("exec.file.path", "/usr/bin/curl"))
            .with_action(SetVariable::new(Scope::Container, "curl_seen", true))
            .with_action(SetVariable::from_field(Scope::Process, "last_exec", "exec.file.path"))
            .with_action(SetVariable::from_field(Scope::Global, "nothing", "open.file.path"));

        let mut ctx = EvaluationContext::with_event(&event);
        let outcome = h.evaluator().evaluate_rule(&mut ctx, &rule).unwrap();
        assert_eq!(
            outcome,
            RuleOutcome {
                matched: true,
                actions_applied: 2
            }
        );
        assert_eq!(h.store.get(&Scope::Container, "abc", "curl_seen"), Value::Bool(true));
        assert_eq!(
            h.store.get(&Scope::Process, "42", "last_exec"),
            Value::from("/usr/bin/curl")
        );

        let check = Expr::compare(
            Operand::variable(Scope::Container, "curl_seen"),
            CompareOp::Eq,
            Operand::literal(true),
        );
        assert!(h.check(&event, check));
    }

    #[test]
    fn test_single_element_array_copied_as_array() {
        let h = Harness::new();
        let event = JsonEvent::new(
            "exec",
            json!({"exec": {"args": ["-s"]}, "container": {"id": "abc"}}),
        );
        let rule = Rule::new("args", Expr::Literal(true))
            .with_action(SetVariable::from_field(Scope::Container, "args", "exec.args"));

        let mut ctx = EvaluationContext::with_event(&event);
        h.evaluator().evaluate_rule(&mut ctx, &rule).unwrap();
        assert_eq!(
            h.store.get(&Scope::Container, "abc", "args"),
            Value::from(vec!["-s"])
        );
    }

    #[test]
    fn test_write_skipped_without_key() {
        let h = Harness::new();
        let event = JsonEvent::new("open", json!({"open": {"file": {"path": "/tmp/x"}}}));
        let rule = Rule::new("r", Expr::Literal(true))
            .with_action(SetVariable::new(Scope::Container, "foo", 1));

        let mut ctx = EvaluationContext::with_event(&event);
        let outcome = h.evaluator().evaluate_rule(&mut ctx, &rule).unwrap();
        assert!(outcome.matched);
        assert_eq!(outcome.actions_applied, 0);
        assert_eq!(h.store.stats().skipped_writes, 1);
        assert!(h.store.is_empty());
    }

    #[test]
    fn test_unbound_context_fails() {
        let h = Harness::new();
        let mut ctx = EvaluationContext::new();
        let rule = Rule::new("r", Expr::Literal(true));
        assert_eq!(h.evaluator().evaluate(&mut ctx, &rule), Err(EvalError::NoEventBound));
    }
}
