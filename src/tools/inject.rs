//! CN-015: The inject tool — splice content into an existing file.
//!
//! Renders path, body, and patterns, then delegates to the injector.
//! The target must already exist; creating files is the add tool's job.

use crate::core::context::StepContext;
use crate::core::injector::{self, InjectLocation, InjectOutcome};
use crate::core::types::StepResult;

/// Raw location fields from the step definition. Exactly one is set
/// (enforced by validation).
pub struct Location<'a> {
    pub before: Option<&'a str>,
    pub after: Option<&'a str>,
    pub line: Option<usize>,
    pub prepend: bool,
    pub append: bool,
}

pub fn execute(
    path: &str,
    content: &str,
    location: Location<'_>,
    skip_if: Option<&str>,
    trailing_newline: bool,
    ctx: &StepContext,
) -> Result<StepResult, String> {
    let rendered_path = ctx.render(path)?;
    let rendered_content = ctx.render(content)?;
    let target = ctx.project_root.join(&rendered_path);

    let loc = if let Some(p) = location.before {
        InjectLocation::Before(ctx.render(p)?)
    } else if let Some(p) = location.after {
        InjectLocation::After(ctx.render(p)?)
    } else if let Some(n) = location.line {
        InjectLocation::Line(n)
    } else if location.prepend {
        InjectLocation::Prepend
    } else {
        InjectLocation::Append
    };

    let skip = match skip_if {
        Some(p) => Some(ctx.render(p)?),
        None => None,
    };

    if !target.is_file() {
        return Err(format!(
            "inject target {} does not exist (use the add tool to create files)",
            rendered_path
        ));
    }
    let existing = std::fs::read_to_string(&target)
        .map_err(|e| format!("cannot read {}: {}", target.display(), e))?;

    let mut result = StepResult::new("", "inject");
    match injector::inject(
        &existing,
        &loc,
        &rendered_content,
        skip.as_deref(),
        trailing_newline,
    )? {
        InjectOutcome::Skipped => {
            result.skipped = true;
            result
                .messages
                .push(format!("{} already contains injection, skipped", rendered_path));
        }
        InjectOutcome::Injected(new_contents) => {
            if ctx.dry_run {
                result
                    .messages
                    .push(format!("[dry-run] would modify {}", rendered_path));
                return Ok(result);
            }
            std::fs::write(&target, new_contents)
                .map_err(|e| format!("cannot write {}: {}", target.display(), e))?;
            result.modified.push(target);
            result.messages.push(format!("{} modified", rendered_path));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(root: &std::path::Path) -> StepContext {
        let mut c = StepContext::new(root.to_path_buf(), false, false);
        c.variables.insert(
            "name".to_string(),
            serde_yaml_ng::Value::String("user".to_string()),
        );
        c
    }

    fn loc_after(pat: &str) -> Location<'_> {
        Location {
            before: None,
            after: Some(pat),
            line: None,
            prepend: false,
            append: false,
        }
    }

    #[test]
    fn test_cn015_inject_after() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mod.rs"), "// modules\npub mod a;\n").unwrap();
        let r = execute(
            "mod.rs",
            "pub mod {{name}};",
            loc_after("// modules"),
            None,
            true,
            &ctx(dir.path()),
        )
        .unwrap();
        assert!(r.success);
        assert_eq!(r.modified.len(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("mod.rs")).unwrap(),
            "// modules\npub mod user;\npub mod a;\n"
        );
    }

    #[test]
    fn test_cn015_missing_target_is_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(
            "ghost.rs",
            "x",
            loc_after("y"),
            None,
            true,
            &ctx(dir.path()),
        )
        .unwrap_err();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn test_cn015_skip_condition_renders_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mod.rs"), "pub mod user;\n").unwrap();
        let r = execute(
            "mod.rs",
            "pub mod {{name}};",
            loc_after("pub mod"),
            Some("pub mod {{name}};"),
            true,
            &ctx(dir.path()),
        )
        .unwrap();
        assert!(r.skipped);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("mod.rs")).unwrap(),
            "pub mod user;\n"
        );
    }

    #[test]
    fn test_cn015_second_run_skipped_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mod.rs"), "// modules\n").unwrap();
        let c = ctx(dir.path());
        let first = execute(
            "mod.rs",
            "pub mod {{name}};",
            loc_after("// modules"),
            Some("pub mod {{name}};"),
            true,
            &c,
        )
        .unwrap();
        assert!(!first.skipped);
        let after_first = std::fs::read_to_string(dir.path().join("mod.rs")).unwrap();

        let second = execute(
            "mod.rs",
            "pub mod {{name}};",
            loc_after("// modules"),
            Some("pub mod {{name}};"),
            true,
            &c,
        )
        .unwrap();
        assert!(second.skipped);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("mod.rs")).unwrap(),
            after_first
        );
    }

    #[test]
    fn test_cn015_dry_run_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mod.rs"), "// modules\n").unwrap();
        let mut c = ctx(dir.path());
        c.dry_run = true;
        let r = execute("mod.rs", "x", loc_after("// modules"), None, true, &c).unwrap();
        assert!(r.messages[0].contains("[dry-run]"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("mod.rs")).unwrap(),
            "// modules\n"
        );
    }
}
