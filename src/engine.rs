//! Primary evaluation engine.
//!
//! [`Engine`] ties the pieces together: it owns the compiled rules, the context
//! pool, the shared variable store and the scope registry, and evaluates events
//! one at a time or in batches.

use crate::config::EngineConfig;
use crate::context::ContextPool;
use crate::error::{EvalError, Result};
use crate::eval::Evaluator;
use crate::event::Event;
use crate::rule::{Rule, RuleId};
use crate::variables::{ScopeRegistry, VariableStore};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, error};

/// Result of evaluating one event against every rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationResult {
    /// IDs of rules that matched, in rule order.
    pub matched_rules: Vec<RuleId>,
    pub rules_evaluated: usize,
    /// Variable writes performed by the actions of matching rules.
    pub actions_applied: usize,
    /// Rules whose evaluation failed; the remaining rules still ran.
    pub failed_rules: Vec<RuleId>,
}

impl EvaluationResult {
    pub fn is_match(&self) -> bool {
        !self.matched_rules.is_empty()
    }
}

/// Rule evaluation engine.
///
/// The engine is `Sync`: any number of threads may call
/// [`evaluate`](Self::evaluate) concurrently. Each call draws its own context
/// from the pool, so only the variable store is shared between evaluations.
///
/// # Example
/// ```rust,ignore
/// use secl_eval::prelude::*;
///
/// let rule = Rule::new("tag_container", Expr::field_eq("open.file.path", "/root/test-open"))
///     .with_action(SetVariable::new(Scope::Container, "foo", 1));
/// let engine = Engine::new(vec![rule])?;
///
/// let result = engine.evaluate(&event);
/// assert_eq!(result.matched_rules, ["tag_container"]);
/// ```
#[derive(Debug)]
pub struct Engine {
    rules: Vec<Rule>,
    pool: ContextPool,
    variables: Arc<VariableStore>,
    scopes: ScopeRegistry,
    config: EngineConfig,
    thread_pool: Option<rayon::ThreadPool>,
}

impl Engine {
    /// Engine with the default configuration.
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        Self::builder().rules(rules).build()
    }

    pub fn with_config(rules: Vec<Rule>, config: EngineConfig) -> Result<Self> {
        Self::builder().rules(rules).config(config).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Evaluate `event` against every rule, in order.
    ///
    /// A rule that fails is logged and reported in
    /// [`EvaluationResult::failed_rules`]; evaluation continues with the next
    /// rule.
    pub fn evaluate(&self, event: &dyn Event) -> EvaluationResult {
        let mut ctx = self.pool.acquire(event);
        let evaluator = self.evaluator();
        let mut result = EvaluationResult::default();

        for rule in &self.rules {
            result.rules_evaluated += 1;
            match evaluator.evaluate_rule(&mut ctx, rule) {
                Ok(outcome) => {
                    if outcome.matched {
                        result.matched_rules.push(rule.id.clone());
                        result.actions_applied += outcome.actions_applied;
                    }
                }
                Err(err) => {
                    error!(rule = %rule.id, error = %err, "rule evaluation failed");
                    result.failed_rules.push(rule.id.clone());
                }
            }
        }
        result
    }

    /// Evaluate several events, in parallel when the batch is large enough.
    ///
    /// Results come back in event order.
    pub fn evaluate_batch<E: Event>(&self, events: &[E]) -> Vec<EvaluationResult> {
        let parallel = &self.config.parallel;
        if !parallel.enabled || events.len() < parallel.min_batch_size_for_parallelism {
            return events.iter().map(|event| self.evaluate(event)).collect();
        }

        debug!(events = events.len(), "evaluating batch in parallel");
        let run = || {
            events
                .par_iter()
                .map(|event| self.evaluate(event))
                .collect::<Vec<_>>()
        };
        match &self.thread_pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    /// Evaluator over this engine's store and scopes, for driving contexts directly.
    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.variables, &self.scopes)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn contains_rule(&self, id: &str) -> bool {
        self.rules.iter().any(|rule| rule.id == id)
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    pub fn variables(&self) -> &Arc<VariableStore> {
        &self.variables
    }

    pub fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Builder for [`Engine`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    rules: Vec<Rule>,
    config: EngineConfig,
    scopes: Option<ScopeRegistry>,
    variables: Option<Arc<VariableStore>>,
}

impl EngineBuilder {
    pub fn rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default global / process / container scopes.
    pub fn scopes(mut self, scopes: ScopeRegistry) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Share an existing store instead of creating one from the config.
    pub fn variables(mut self, variables: Arc<VariableStore>) -> Self {
        self.variables = Some(variables);
        self
    }

    /// # Errors
    /// [`EvalError::InvalidConfig`] when the configuration does not validate or
    /// the dedicated worker pool cannot be created.
    pub fn build(self) -> Result<Engine> {
        let config = self.config;
        config.validate()?;

        let variables = self
            .variables
            .unwrap_or_else(|| Arc::new(VariableStore::with_config(config.variables.clone())));
        for rule in &self.rules {
            for set in rule.set_variables() {
                if let Some(default) = set.declared_default() {
                    variables.declare(set.scope.clone(), &set.name, default);
                }
            }
        }

        let thread_pool = if config.parallel.enabled
            && config.parallel.num_threads != rayon::current_num_threads()
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.parallel.num_threads)
                .thread_name(|i| format!("secl-eval-{i}"))
                .build()
                .map_err(|err| EvalError::InvalidConfig(err.to_string()))?;
            Some(pool)
        } else {
            None
        };

        debug!(
            rules = self.rules.len(),
            max_idle = config.pool.max_idle,
            "engine created"
        );
        Ok(Engine {
            rules: self.rules,
            pool: ContextPool::with_config(&config.pool),
            variables,
            scopes: self.scopes.unwrap_or_default(),
            config,
            thread_pool,
        })
    }
}
