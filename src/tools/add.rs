//! CN-012: The add tool — file creation.
//!
//! Creates a file with rendered content, making parent directories as
//! needed. Re-running against identical existing content is a no-op, so
//! the tool is safe across both passes of the resolution protocol.
//! Differing existing content is an error unless forced.

use crate::core::context::StepContext;
use crate::core::types::StepResult;

pub fn execute(
    path: &str,
    content: &str,
    step_force: bool,
    ctx: &StepContext,
) -> Result<StepResult, String> {
    let rendered_path = ctx.render(path)?;
    let rendered_content = ctx.render(content)?;
    let target = ctx.project_root.join(&rendered_path);
    let force = step_force || ctx.force;

    let mut result = StepResult::new("", "add");

    if ctx.dry_run {
        result
            .messages
            .push(format!("[dry-run] would create {}", rendered_path));
        return Ok(result);
    }

    if target.exists() {
        let existing = std::fs::read_to_string(&target)
            .map_err(|e| format!("cannot read {}: {}", target.display(), e))?;
        if existing == rendered_content {
            result.skipped = true;
            result
                .messages
                .push(format!("{} unchanged", rendered_path));
            return Ok(result);
        }
        if !force {
            return Err(format!(
                "{} already exists with different content (use --force to overwrite)",
                rendered_path
            ));
        }
        std::fs::write(&target, &rendered_content)
            .map_err(|e| format!("cannot write {}: {}", target.display(), e))?;
        result.modified.push(target);
        result
            .messages
            .push(format!("{} overwritten", rendered_path));
        return Ok(result);
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
    }
    std::fs::write(&target, &rendered_content)
        .map_err(|e| format!("cannot write {}: {}", target.display(), e))?;
    result.created.push(target);
    result.messages.push(format!("{} created", rendered_path));
    Ok(result)
}
