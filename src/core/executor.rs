//! CN-030: Recipe engine — orchestration of the two-pass protocol.
//!
//! One invocation: validate → Pass 1 in collect mode → if nothing was
//! collected, Pass 1 is the committed run → otherwise pick a transport;
//! inline answers trigger a full Pass 2 re-execution with the answers as
//! the highest-priority scope, a deferral surfaces the reserved exit code.
//! With `--answers` covering every model-dependent step, the collect pass
//! is skipped entirely; an uncovered recipe raises its own round.

use super::answers::{load_answers, suggested_answers_path};
use super::collector::Collector;
use super::config::CocinaConfig;
use super::context::{bind_positionals, check_variables, merge_scopes, StepContext};
use super::parser::validate_recipe;
use super::types::{RecipeDefinition, RecipeResult, TransportResult};
use crate::tools::action::ActionRegistry;
use crate::tools::{execute_step, validate_step};
use crate::transport::{defer, resolve_requests, AskMode};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

/// Options for one engine invocation, shared by every recipe in a group.
pub struct EngineOptions {
    pub project_root: PathBuf,
    pub config: CocinaConfig,
    pub registry: ActionRegistry,
    pub dry_run: bool,
    pub force: bool,
    pub no_defaults: bool,
    /// Caller variables from `--set` (override positional bindings)
    pub set_vars: IndexMap<String, serde_yaml_ng::Value>,
    pub ask: Option<AskMode>,
    pub answers_file: Option<PathBuf>,
    /// Reject positional tokens beyond the declared indexes
    pub strict_positionals: bool,
}

impl EngineOptions {
    pub fn new(project_root: PathBuf, config: CocinaConfig) -> Self {
        Self {
            project_root,
            config,
            registry: ActionRegistry::with_builtins(),
            dry_run: false,
            force: false,
            no_defaults: false,
            set_vars: IndexMap::new(),
            ask: None,
            answers_file: None,
            strict_positionals: true,
        }
    }
}

/// Outcome of running one recipe through the engine.
#[derive(Debug)]
pub enum EngineOutcome {
    Completed(RecipeResult),
    /// Resolution was deferred; the process should exit with this code
    AnswersPending(i32),
}

/// Run one recipe. `remaining` are the leftover resolver tokens that bind
/// to positional variables.
pub fn run_recipe(
    recipe: &RecipeDefinition,
    remaining: &[String],
    opts: &EngineOptions,
    collector: &mut Collector,
) -> Result<EngineOutcome, String> {
    let errors = validate_recipe(recipe);
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
        return Err(format!(
            "recipe '{}' is invalid:\n  {}",
            recipe.name,
            messages.join("\n  ")
        ));
    }

    let mut caller = bind_positionals(recipe, remaining, opts.strict_positionals)?;
    for (k, v) in &opts.set_vars {
        caller.insert(k.clone(), v.clone());
    }

    // Resumption: when the loaded answers cover every model-dependent step
    // of this recipe, skip Pass 1 and run once with them, collect off. A
    // recipe whose requests were not part of the answered round falls
    // through to the normal protocol and raises its own round.
    if let Some(ref path) = opts.answers_file {
        let loaded = load_answers(path)?;
        if let Some(answers) = recipe_answers(recipe, &loaded.answers) {
            collector.clear();
            let result = execute_pass(recipe, &caller, &answers, opts, collector)?;
            return Ok(EngineOutcome::Completed(result));
        }
    }

    let no_answers = IndexMap::new();

    // Nothing model-dependent: one plain pass, no collect bookkeeping.
    if !recipe.steps.iter().any(|s| s.spec.is_model_dependent()) {
        collector.clear();
        let result = execute_pass(recipe, &caller, &no_answers, opts, collector)?;
        return Ok(EngineOutcome::Completed(result));
    }

    // Pass 1: collect mode.
    collector.clear();
    collector.enter_collect()?;
    let pass1 = execute_pass(recipe, &caller, &no_answers, opts, collector)?;

    if !pass1.success {
        collector.clear();
        return Ok(EngineOutcome::Completed(pass1));
    }

    if !collector.has_entries() {
        // Nothing model-dependent: Pass 1 was the real execution.
        collector.clear();
        return Ok(EngineOutcome::Completed(pass1));
    }

    // Request ids leave the engine qualified by recipe name so sibling
    // recipes in a group can share one answers file without colliding.
    let mut requests = collector.entries().to_vec();
    collector.clear();
    for request in &mut requests {
        request.id = qualified_id(&recipe.name, &request.id);
    }

    if opts.dry_run {
        // A dry run contacts no transport; preview what would be asked.
        let answers_path = suggested_answers_path(&opts.project_root);
        println!("{}", defer::prompt_document(&requests, &answers_path));
        return Ok(EngineOutcome::Completed(pass1));
    }

    match resolve_requests(&requests, &opts.config, opts.ask, &opts.project_root)? {
        TransportResult::Resolved(resolved) => {
            let answers = recipe_answers(recipe, &resolved).ok_or_else(|| {
                format!(
                    "transport did not answer every request of recipe '{}'",
                    recipe.name
                )
            })?;
            // Pass 2: full re-execution with answers as the highest scope.
            let pass2 = execute_pass(recipe, &caller, &answers, opts, collector)?;
            Ok(EngineOutcome::Completed(pass2))
        }
        TransportResult::Deferred(code) => Ok(EngineOutcome::AnswersPending(code)),
    }
}

/// Qualify a request id by its recipe so an answers file can hold answers
/// for several sibling recipes at once.
fn qualified_id(recipe_name: &str, step_id: &str) -> String {
    format!("{}/{}", recipe_name, step_id)
}

/// Answers covering every model-dependent step of the recipe, keyed by
/// bare step id. Qualified keys win; bare keys are accepted for
/// hand-written files. `None` when any step's answer is absent.
fn recipe_answers(
    recipe: &RecipeDefinition,
    available: &IndexMap<String, String>,
) -> Option<IndexMap<String, String>> {
    let mut answers = IndexMap::new();
    for (i, step) in recipe.steps.iter().enumerate() {
        if !step.spec.is_model_dependent() {
            continue;
        }
        let id = step.id(i);
        let text = available
            .get(&qualified_id(&recipe.name, &id))
            .or_else(|| available.get(&id))?;
        answers.insert(id, text.clone());
    }
    Some(answers)
}

/// Execute every step of one pass, sequentially, aborting the recipe at
/// the first failed step. Hard validation errors are fatal to the whole
/// invocation, not just the recipe.
fn execute_pass(
    recipe: &RecipeDefinition,
    caller: &IndexMap<String, serde_yaml_ng::Value>,
    answers: &IndexMap<String, String>,
    opts: &EngineOptions,
    collector: &mut Collector,
) -> Result<RecipeResult, String> {
    let started = Instant::now();

    // All steps are validated before any executes.
    let mut hard_errors = Vec::new();
    for (i, step) in recipe.steps.iter().enumerate() {
        let v = validate_step(step, i, &opts.registry);
        hard_errors.extend(v.errors);
        for warning in v.warnings {
            eprintln!("warning: {}", warning);
        }
    }
    if !hard_errors.is_empty() {
        return Err(format!(
            "recipe '{}' failed validation:\n  {}",
            recipe.name,
            hard_errors.join("\n  ")
        ));
    }

    let mut ctx = StepContext::new(opts.project_root.clone(), opts.dry_run, opts.force);
    let mut results = Vec::new();
    let mut success = true;
    let mut warned: HashSet<String> = HashSet::new();

    for (i, step) in recipe.steps.iter().enumerate() {
        ctx.variables = merge_scopes(recipe, step, caller, answers, opts.no_defaults);
        for warning in check_variables(recipe, &ctx.variables)? {
            if warned.insert(warning.clone()) {
                eprintln!("warning: {}", warning);
            }
        }

        let result = execute_step(step, i, &ctx, collector, &opts.registry);
        let failed = !result.success;

        if result.success {
            if let Some(ref output) = result.output {
                for key in &step.writes {
                    ctx.shared.insert(key.clone(), output.clone());
                }
            }
        }
        ctx.prior_results.insert(result.name.clone(), result.clone());
        results.push(result);

        if failed {
            success = false;
            break;
        }
    }

    Ok(RecipeResult {
        recipe: recipe.name.clone(),
        success,
        steps: results,
        duration: started.elapsed(),
    })
}
