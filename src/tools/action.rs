//! CN-011: Named action registry.
//!
//! Actions are project-agnostic helpers a recipe can invoke by name.
//! The registry maps names to functions; referencing an unregistered
//! name is a hard validation error, raised before execution starts.

use crate::core::context::{value_to_string, StepContext};
use crate::core::types::StepResult;
use indexmap::IndexMap;
use std::path::PathBuf;

pub type ActionFn =
    fn(&IndexMap<String, serde_yaml_ng::Value>, &StepContext) -> Result<StepResult, String>;

pub struct ActionRegistry {
    actions: IndexMap<String, ActionFn>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: IndexMap::new(),
        }
    }

    /// Registry preloaded with the built-in actions.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        r.register("copy", action_copy);
        r.register("ensure-dir", action_ensure_dir);
        r
    }

    pub fn register(&mut self, name: &str, f: ActionFn) {
        self.actions.insert(name.to_string(), f);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Dispatch a named action.
pub fn execute(
    registry: &ActionRegistry,
    action: &str,
    params: &IndexMap<String, serde_yaml_ng::Value>,
    ctx: &StepContext,
) -> Result<StepResult, String> {
    let f = registry
        .actions
        .get(action)
        .ok_or_else(|| format!("action '{}' is not registered", action))?;

    // Render templates in string-valued params before handing them over
    let mut rendered = IndexMap::new();
    for (k, v) in params {
        let value = match v {
            serde_yaml_ng::Value::String(s) => {
                serde_yaml_ng::Value::String(ctx.render(s)?)
            }
            other => other.clone(),
        };
        rendered.insert(k.clone(), value);
    }

    f(&rendered, ctx)
}

fn param<'a>(
    params: &'a IndexMap<String, serde_yaml_ng::Value>,
    name: &str,
    action: &str,
) -> Result<String, String> {
    params
        .get(name)
        .map(value_to_string)
        .ok_or_else(|| format!("action '{}' requires parameter '{}'", action, name))
}

/// Built-in: copy a file within the project.
fn action_copy(
    params: &IndexMap<String, serde_yaml_ng::Value>,
    ctx: &StepContext,
) -> Result<StepResult, String> {
    let from = ctx.project_root.join(param(params, "from", "copy")?);
    let to = ctx.project_root.join(param(params, "to", "copy")?);

    let mut result = StepResult::new("", "action");
    if ctx.dry_run {
        result
            .messages
            .push(format!("[dry-run] would copy {} -> {}", from.display(), to.display()));
        return Ok(result);
    }

    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
    }
    std::fs::copy(&from, &to)
        .map_err(|e| format!("cannot copy {} -> {}: {}", from.display(), to.display(), e))?;
    result.created.push(to.clone());
    result
        .messages
        .push(format!("copied {} -> {}", from.display(), to.display()));
    Ok(result)
}

/// Built-in: create a directory (with parents).
fn action_ensure_dir(
    params: &IndexMap<String, serde_yaml_ng::Value>,
    ctx: &StepContext,
) -> Result<StepResult, String> {
    let path = ctx.project_root.join(param(params, "path", "ensure-dir")?);

    let mut result = StepResult::new("", "action");
    if ctx.dry_run {
        result
            .messages
            .push(format!("[dry-run] would create directory {}", path.display()));
        return Ok(result);
    }

    let existed = path.is_dir();
    std::fs::create_dir_all(&path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    if !existed {
        result.created.push(PathBuf::from(&path));
    }
    result.messages.push(format!("directory {}", path.display()));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(root: &std::path::Path) -> StepContext {
        StepContext::new(root.to_path_buf(), false, false)
    }

    fn params(pairs: &[(&str, &str)]) -> IndexMap<String, serde_yaml_ng::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_yaml_ng::Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn test_cn011_copy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("src.txt"), "data").unwrap();
        let registry = ActionRegistry::with_builtins();
        let r = execute(
            &registry,
            "copy",
            &params(&[("from", "src.txt"), ("to", "out/dst.txt")]),
            &ctx(dir.path()),
        )
        .unwrap();
        assert!(r.success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/dst.txt")).unwrap(),
            "data"
        );
    }

    #[test]
    fn test_cn011_copy_missing_param() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ActionRegistry::with_builtins();
        let err = execute(&registry, "copy", &params(&[("from", "a")]), &ctx(dir.path()))
            .unwrap_err();
        assert!(err.contains("requires parameter 'to'"));
    }

    #[test]
    fn test_cn011_ensure_dir() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ActionRegistry::with_builtins();
        let r = execute(
            &registry,
            "ensure-dir",
            &params(&[("path", "a/b/c")]),
            &ctx(dir.path()),
        )
        .unwrap();
        assert!(r.success);
        assert!(dir.path().join("a/b/c").is_dir());
        assert_eq!(r.created.len(), 1);
    }

    #[test]
    fn test_cn011_unregistered() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ActionRegistry::with_builtins();
        let err = execute(&registry, "nuke", &IndexMap::new(), &ctx(dir.path())).unwrap_err();
        assert!(err.contains("'nuke' is not registered"));
    }

    #[test]
    fn test_cn011_params_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = ctx(dir.path());
        c.variables.insert(
            "name".to_string(),
            serde_yaml_ng::Value::String("deep".to_string()),
        );
        let registry = ActionRegistry::with_builtins();
        execute(&registry, "ensure-dir", &params(&[("path", "dirs/{{name}}")]), &c).unwrap();
        assert!(dir.path().join("dirs/deep").is_dir());
    }

    #[test]
    fn test_cn011_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let c = StepContext::new(dir.path().to_path_buf(), true, false);
        let registry = ActionRegistry::with_builtins();
        let r = execute(&registry, "ensure-dir", &params(&[("path", "x")]), &c).unwrap();
        assert!(r.messages[0].contains("[dry-run]"));
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn test_cn011_custom_registration() {
        fn noop(
            _: &IndexMap<String, serde_yaml_ng::Value>,
            _: &StepContext,
        ) -> Result<StepResult, String> {
            Ok(StepResult::new("", "action"))
        }
        let mut registry = ActionRegistry::with_builtins();
        registry.register("noop", noop);
        assert!(registry.contains("noop"));
        assert!(registry.names().contains(&"copy"));
    }
}
