//! CN-002: Recipe YAML parsing and structural validation.
//!
//! Parses a recipe definition and validates structural constraints:
//! - Recipe and variable names must be non-empty
//! - Variable types must be known; enum variables need choices
//! - Positional indexes must be unique
//! - Step names must be unique
//! - Inject steps must declare exactly one location rule

use super::types::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File name of a recipe definition inside a recipe directory.
pub const RECIPE_FILE: &str = "recipe.yaml";

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Whether the path is a flat recipe file: a YAML file that is not a
/// `recipe.yaml` marker or a kit/cookbook manifest.
pub fn is_flat_recipe_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let yaml = path
        .extension()
        .is_some_and(|e| e == "yaml" || e == "yml");
    if !yaml {
        return false;
    }
    !matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some(RECIPE_FILE | "kit.yaml" | "cookbook.yaml")
    )
}

/// Locate the recipe file for a path that may be a directory or a file.
pub fn recipe_file_for(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(RECIPE_FILE)
    } else {
        path.to_path_buf()
    }
}

/// Parse a recipe definition from disk. Accepts a recipe file or a
/// directory containing `recipe.yaml`.
pub fn load_recipe(path: &Path) -> Result<RecipeDefinition, String> {
    let file = recipe_file_for(path);
    let content = std::fs::read_to_string(&file)
        .map_err(|e| format!("cannot read recipe {}: {}", file.display(), e))?;
    parse_recipe(&content)
}

/// Parse a recipe definition from a YAML string.
pub fn parse_recipe(yaml: &str) -> Result<RecipeDefinition, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("recipe parse error: {}", e))
}

const KNOWN_VAR_TYPES: &[&str] = &["string", "int", "bool", "path", "enum"];

/// Validate a parsed recipe. Returns a list of errors (empty = valid).
pub fn validate_recipe(recipe: &RecipeDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if recipe.name.is_empty() {
        errors.push(ValidationError {
            message: "recipe name must not be empty".to_string(),
        });
    }

    if recipe.steps.is_empty() {
        errors.push(ValidationError {
            message: format!("recipe '{}' has no steps", recipe.name),
        });
    }

    // Variable declarations
    let mut seen_positions = HashSet::new();
    for (name, decl) in &recipe.variables {
        if name.is_empty() {
            errors.push(ValidationError {
                message: format!("recipe '{}' declares an unnamed variable", recipe.name),
            });
        }
        if !KNOWN_VAR_TYPES.contains(&decl.var_type.as_str()) {
            errors.push(ValidationError {
                message: format!(
                    "variable '{}' has unknown type '{}' (expected one of: {})",
                    name,
                    decl.var_type,
                    KNOWN_VAR_TYPES.join(", ")
                ),
            });
        }
        if decl.var_type == "enum" && decl.choices.is_empty() {
            errors.push(ValidationError {
                message: format!("enum variable '{}' declares no choices", name),
            });
        }
        if let Some(pos) = decl.positional {
            if !seen_positions.insert(pos) {
                errors.push(ValidationError {
                    message: format!("variable '{}' reuses positional index {}", name, pos),
                });
            }
        }
        if decl.required && decl.default.is_some() {
            errors.push(ValidationError {
                message: format!("variable '{}' is required but declares a default", name),
            });
        }
    }

    // Step names unique, inject location rules well-formed
    let mut seen_names = HashSet::new();
    for (i, step) in recipe.steps.iter().enumerate() {
        if let Some(ref name) = step.name {
            if !seen_names.insert(name.clone()) {
                errors.push(ValidationError {
                    message: format!("duplicate step name '{}'", name),
                });
            }
        }
        if let StepSpec::Inject {
            before,
            after,
            line,
            prepend,
            append,
            ..
        } = &step.spec
        {
            let rules = [
                before.is_some(),
                after.is_some(),
                line.is_some(),
                *prepend,
                *append,
            ]
            .iter()
            .filter(|b| **b)
            .count();
            if rules != 1 {
                errors.push(ValidationError {
                    message: format!(
                        "inject step '{}' must declare exactly one location rule \
                         (before/after/line/prepend/append), found {}",
                        step.id(i),
                        rules
                    ),
                });
            }
        }
    }

    errors
}
