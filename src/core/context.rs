//! CN-004: Step context — variable scope merging and template rendering.
//!
//! Scope precedence, lowest to highest: recipe-level defaults < step-local
//! overrides < caller-supplied variables (CLI --set, positional bindings) <
//! model-provided answers (Pass 2 only). Merge is shallow key override.

use super::types::{RecipeDefinition, Step, StepResult, VariableDecl};
use indexmap::IndexMap;
use std::path::PathBuf;

/// Per-(recipe, pass) execution context, created fresh each pass.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Merged variables for the step about to execute
    pub variables: IndexMap<String, serde_yaml_ng::Value>,
    pub project_root: PathBuf,
    /// Results of earlier steps this pass, keyed by step id
    pub prior_results: IndexMap<String, StepResult>,
    /// Shared-state values published via steps' `writes` metadata
    pub shared: IndexMap<String, String>,
    pub dry_run: bool,
    pub force: bool,
}

impl StepContext {
    pub fn new(project_root: PathBuf, dry_run: bool, force: bool) -> Self {
        Self {
            variables: IndexMap::new(),
            project_root,
            prior_results: IndexMap::new(),
            shared: IndexMap::new(),
            dry_run,
            force,
        }
    }

    /// Resolve `{{var}}` and `{{shared.key}}` templates in a string.
    pub fn render(&self, template: &str) -> Result<String, String> {
        let mut result = template.to_string();
        let mut start = 0;

        while let Some(open) = result[start..].find("{{") {
            let open = start + open;
            let close = result[open..]
                .find("}}")
                .ok_or_else(|| format!("unclosed template at position {}", open))?;
            let close = open + close + 2;
            let key = result[open + 2..close - 2].trim();

            let value = if let Some(shared_key) = key.strip_prefix("shared.") {
                self.shared
                    .get(shared_key)
                    .cloned()
                    .ok_or_else(|| format!("unknown shared key: {}", shared_key))?
            } else {
                self.variables
                    .get(key)
                    .map(value_to_string)
                    .ok_or_else(|| format!("unknown variable: {}", key))?
            };

            result.replace_range(open..close, &value);
            start = open + value.len();
        }

        Ok(result)
    }
}

/// Convert a YAML value to a string for template substitution.
pub fn value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

/// Bind leftover positional tokens onto variables by declared index.
/// In strict mode, tokens beyond the highest declared index are an error.
pub fn bind_positionals(
    recipe: &RecipeDefinition,
    remaining: &[String],
    strict: bool,
) -> Result<IndexMap<String, serde_yaml_ng::Value>, String> {
    let mut bound = IndexMap::new();
    let mut used = 0;

    for (name, decl) in &recipe.variables {
        if let Some(pos) = decl.positional {
            if let Some(token) = remaining.get(pos) {
                bound.insert(
                    name.clone(),
                    serde_yaml_ng::Value::String(token.clone()),
                );
                used = used.max(pos + 1);
            }
        }
    }

    if strict && used < remaining.len() {
        return Err(format!(
            "recipe '{}' does not accept positional argument(s): {}",
            recipe.name,
            remaining[used..].join(", ")
        ));
    }

    Ok(bound)
}

/// Merge variable scopes for one step, lowest to highest precedence.
pub fn merge_scopes(
    recipe: &RecipeDefinition,
    step: &Step,
    caller: &IndexMap<String, serde_yaml_ng::Value>,
    answers: &IndexMap<String, String>,
    no_defaults: bool,
) -> IndexMap<String, serde_yaml_ng::Value> {
    let mut merged = IndexMap::new();

    if !no_defaults {
        for (name, decl) in &recipe.variables {
            if let Some(ref default) = decl.default {
                merged.insert(name.clone(), default.clone());
            }
        }
    }

    for (name, value) in &step.vars {
        merged.insert(name.clone(), value.clone());
    }

    for (name, value) in caller {
        merged.insert(name.clone(), value.clone());
    }

    for (id, text) in answers {
        merged.insert(id.clone(), serde_yaml_ng::Value::String(text.clone()));
    }

    merged
}

/// Validate merged variables against declarations.
/// Hard errors (missing required, type mismatch) fail; a missing optional
/// variable without a default is only a warning.
pub fn check_variables(
    recipe: &RecipeDefinition,
    merged: &IndexMap<String, serde_yaml_ng::Value>,
) -> Result<Vec<String>, String> {
    let mut warnings = Vec::new();

    for (name, decl) in &recipe.variables {
        match merged.get(name) {
            Some(value) => check_type(name, decl, value)?,
            None if decl.required => {
                return Err(format!(
                    "recipe '{}' requires variable '{}' (type: {})",
                    recipe.name, name, decl.var_type
                ));
            }
            None => {
                warnings.push(format!(
                    "optional variable '{}' is unset; templates referencing it will fail",
                    name
                ));
            }
        }
    }

    Ok(warnings)
}

/// Validate a single value against its declared type.
fn check_type(
    name: &str,
    decl: &VariableDecl,
    value: &serde_yaml_ng::Value,
) -> Result<(), String> {
    match decl.var_type.as_str() {
        "string" | "path" => Ok(()),
        "int" => match value {
            serde_yaml_ng::Value::Number(n) if n.as_i64().is_some() => Ok(()),
            serde_yaml_ng::Value::String(s) if s.parse::<i64>().is_ok() => Ok(()),
            _ => Err(format!("variable '{}' must be an integer", name)),
        },
        "bool" => match value {
            serde_yaml_ng::Value::Bool(_) => Ok(()),
            serde_yaml_ng::Value::String(s) if s == "true" || s == "false" => Ok(()),
            _ => Err(format!("variable '{}' must be a boolean", name)),
        },
        "enum" => {
            let s = value_to_string(value);
            if decl.choices.contains(&s) {
                Ok(())
            } else {
                Err(format!(
                    "variable '{}' must be one of: {}",
                    name,
                    decl.choices.join(", ")
                ))
            }
        }
        other => Err(format!("unknown variable type '{}' for '{}'", other, name)),
    }
}
