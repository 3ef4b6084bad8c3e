//! CN-010: Tool dispatch — validate/execute per step kind.
//!
//! Every step runs through `validate_step` then `execute_step`. Validation
//! separates hard errors (unknown action, malformed location rule) from
//! warnings; only hard errors block execution. Dispatch is an exhaustive
//! match over the closed step union.

pub mod action;
pub mod add;
pub mod ai;
pub mod echo;
pub mod inject;
pub mod setup;
pub mod shell;

use crate::core::collector::Collector;
use crate::core::context::StepContext;
use crate::core::types::{Step, StepResult, StepSpec};
use action::ActionRegistry;
use std::time::Instant;

/// Outcome of validating one step against its context.
#[derive(Debug, Default)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, msg: String) {
        self.errors.push(msg);
    }
}

/// Validate a step. Hard errors block execution; warnings do not.
pub fn validate_step(step: &Step, index: usize, registry: &ActionRegistry) -> Validation {
    let mut v = Validation::default();
    let id = step.id(index);

    match &step.spec {
        StepSpec::Action { action, .. } => {
            if !registry.contains(action) {
                v.error(format!(
                    "step '{}': action '{}' is not registered (known: {})",
                    id,
                    action,
                    registry.names().join(", ")
                ));
            }
        }
        StepSpec::Add { path, .. } => {
            if path.is_empty() {
                v.error(format!("step '{}': add requires a path", id));
            }
        }
        StepSpec::Inject {
            path,
            before,
            after,
            line,
            prepend,
            append,
            ..
        } => {
            if path.is_empty() {
                v.error(format!("step '{}': inject requires a path", id));
            }
            let rules = [before.is_some(), after.is_some(), line.is_some(), *prepend, *append]
                .iter()
                .filter(|b| **b)
                .count();
            if rules != 1 {
                v.error(format!(
                    "step '{}': inject needs exactly one location rule, found {}",
                    id, rules
                ));
            }
        }
        StepSpec::Shell { command, .. } => {
            if command.trim().is_empty() {
                v.error(format!("step '{}': shell requires a command", id));
            }
        }
        StepSpec::Setup { dirs, .. } => {
            if dirs.is_empty() {
                v.warnings
                    .push(format!("step '{}': setup declares no directories", id));
            }
        }
        StepSpec::Echo { .. } => {}
        StepSpec::Ai { prompt, output, .. } => {
            if prompt.trim().is_empty() {
                v.error(format!("step '{}': ai requires a prompt", id));
            }
            if output.is_empty() {
                v.error(format!("step '{}': ai requires an output path", id));
            } else if !output.contains('.') {
                v.suggestions.push(format!(
                    "step '{}': output '{}' has no file extension",
                    id, output
                ));
            }
        }
    }

    v
}

/// Execute a step. Errors become failed StepResults; the recipe engine
/// decides what a failure aborts.
pub fn execute_step(
    step: &Step,
    index: usize,
    ctx: &StepContext,
    collector: &mut Collector,
    registry: &ActionRegistry,
) -> StepResult {
    let id = step.id(index);
    let tool = step.spec.tool_name();
    let started = Instant::now();

    let outcome = match &step.spec {
        StepSpec::Action { action, params } => action::execute(registry, action, params, ctx),
        StepSpec::Add { path, content, force } => add::execute(path, content, *force, ctx),
        StepSpec::Inject {
            path,
            content,
            before,
            after,
            line,
            prepend,
            append,
            skip_if,
            trailing_newline,
        } => inject::execute(
            path,
            content,
            inject::Location {
                before: before.as_deref(),
                after: after.as_deref(),
                line: *line,
                prepend: *prepend,
                append: *append,
            },
            skip_if.as_deref(),
            *trailing_newline,
            ctx,
        ),
        StepSpec::Shell { command, cwd, once } => {
            shell::execute(command, cwd.as_deref(), *once, ctx, collector)
        }
        StepSpec::Setup { dirs, base } => setup::execute(dirs, base.as_deref(), ctx),
        StepSpec::Echo { message } => echo::execute(message, ctx),
        StepSpec::Ai {
            prompt,
            context_files,
            examples,
            guardrails,
            max_retries,
            budget_tokens,
            output,
        } => ai::execute(
            &id,
            prompt,
            context_files,
            examples,
            guardrails,
            *max_retries,
            *budget_tokens,
            output,
            ctx,
            collector,
        ),
    };

    let mut result = match outcome {
        Ok(r) => r,
        Err(e) => StepResult::failed(&id, tool, e),
    };
    result.name = id;
    result.tool = tool.to_string();
    result.duration = started.elapsed();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_recipe;

    fn ctx(root: &std::path::Path) -> StepContext {
        StepContext::new(root.to_path_buf(), false, false)
    }

    #[test]
    fn test_cn010_validate_unknown_action() {
        let recipe = parse_recipe(
            "name: t\nsteps:\n  - tool: action\n    action: no-such-action",
        )
        .unwrap();
        let registry = ActionRegistry::with_builtins();
        let v = validate_step(&recipe.steps[0], 0, &registry);
        assert!(!v.is_valid());
        assert!(v.errors[0].contains("not registered"));
    }

    #[test]
    fn test_cn010_validate_inject_location() {
        let recipe = parse_recipe(
            "name: t\nsteps:\n  - tool: inject\n    path: a.txt\n    content: x",
        )
        .unwrap();
        let v = validate_step(&recipe.steps[0], 0, &ActionRegistry::with_builtins());
        assert!(v.errors.iter().any(|e| e.contains("location rule")));
    }

    #[test]
    fn test_cn010_validate_warning_not_blocking() {
        let recipe = parse_recipe("name: t\nsteps:\n  - tool: setup\n    dirs: []").unwrap();
        let v = validate_step(&recipe.steps[0], 0, &ActionRegistry::with_builtins());
        assert!(v.is_valid());
        assert_eq!(v.warnings.len(), 1);
    }

    #[test]
    fn test_cn010_execute_sets_identity() {
        let dir = tempfile::tempdir().unwrap();
        let recipe =
            parse_recipe("name: t\nsteps:\n  - name: say\n    tool: echo\n    message: hi").unwrap();
        let mut collector = Collector::new();
        let registry = ActionRegistry::with_builtins();
        let r = execute_step(&recipe.steps[0], 0, &ctx(dir.path()), &mut collector, &registry);
        assert!(r.success);
        assert_eq!(r.name, "say");
        assert_eq!(r.tool, "echo");
    }

    #[test]
    fn test_cn010_execute_error_becomes_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = parse_recipe(
            "name: t\nsteps:\n  - tool: inject\n    path: ghost.txt\n    content: x\n    append: true",
        )
        .unwrap();
        let mut collector = Collector::new();
        let registry = ActionRegistry::with_builtins();
        let r = execute_step(&recipe.steps[0], 0, &ctx(dir.path()), &mut collector, &registry);
        assert!(!r.success);
        assert_eq!(r.name, "step-1-inject");
        assert!(r.error.as_deref().unwrap_or("").contains("ghost.txt"));
    }

    #[test]
    fn test_cn010_anonymous_step_id() {
        let recipe = parse_recipe("name: t\nsteps:\n  - tool: echo\n    message: hi").unwrap();
        assert_eq!(recipe.steps[0].id(4), "step-5-echo");
    }
}
