//! CN-031: Group executor — sibling recipes run in discovery order.
//!
//! A group directory holds child directories that each contain a recipe.
//! Discovery order is sorted directory order; there is no inter-recipe
//! dependency graph. Default policy is fail-fast: the first failing
//! recipe stops the group. A deferral from any member recipe pauses the
//! whole group immediately.

use super::collector::Collector;
use super::executor::{run_recipe, EngineOptions, EngineOutcome};
use super::parser::{is_flat_recipe_file, load_recipe, RECIPE_FILE};
use super::types::{GroupEntry, GroupResult};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Outcome of running a group.
#[derive(Debug)]
pub enum GroupOutcome {
    Completed(GroupResult),
    /// A member recipe deferred; exit with this code
    AnswersPending(i32),
}

/// Immediate children holding a recipe, sorted by name: subdirectories
/// with `recipe.yaml` plus flat recipe files.
pub fn discover_recipes(group_dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries = std::fs::read_dir(group_dir)
        .map_err(|e| format!("cannot read group {}: {}", group_dir.display(), e))?;

    let mut found: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.join(RECIPE_FILE).is_file() || is_flat_recipe_file(p))
        .collect();
    found.sort();
    Ok(found)
}

/// Run every recipe in a group through the engine.
pub fn run_group(
    group_dir: &Path,
    remaining: &[String],
    opts: &EngineOptions,
    collector: &mut Collector,
    continue_on_error: bool,
) -> Result<GroupOutcome, String> {
    let started = Instant::now();
    let recipe_dirs = discover_recipes(group_dir)?;
    if recipe_dirs.is_empty() {
        return Err(format!(
            "group {} contains no recipes",
            group_dir.display()
        ));
    }

    let group_name = group_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| group_dir.display().to_string());

    let mut entries = Vec::new();
    let mut success = true;

    for dir in &recipe_dirs {
        let recipe = load_recipe(dir)?;
        match run_recipe(&recipe, remaining, opts, collector)? {
            EngineOutcome::Completed(result) => {
                entries.push(GroupEntry {
                    recipe: result.recipe.clone(),
                    success: result.success,
                    steps: result.steps.len(),
                });
                if !result.success {
                    success = false;
                    if !continue_on_error {
                        break;
                    }
                }
            }
            EngineOutcome::AnswersPending(code) => {
                return Ok(GroupOutcome::AnswersPending(code));
            }
        }
    }

    Ok(GroupOutcome::Completed(GroupResult {
        group: group_name,
        success,
        entries,
        duration: started.elapsed(),
    }))
}
