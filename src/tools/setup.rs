//! CN-013: The setup tool — directory scaffolding.

use crate::core::context::StepContext;
use crate::core::types::StepResult;

pub fn execute(
    dirs: &[String],
    base: Option<&str>,
    ctx: &StepContext,
) -> Result<StepResult, String> {
    let base_dir = match base {
        Some(b) => ctx.project_root.join(ctx.render(b)?),
        None => ctx.project_root.clone(),
    };

    let mut result = StepResult::new("", "setup");
    for dir in dirs {
        let rendered = ctx.render(dir)?;
        let target = base_dir.join(&rendered);

        if ctx.dry_run {
            result
                .messages
                .push(format!("[dry-run] would create directory {}", target.display()));
            continue;
        }

        let existed = target.is_dir();
        std::fs::create_dir_all(&target)
            .map_err(|e| format!("cannot create {}: {}", target.display(), e))?;
        if !existed {
            result.created.push(target.clone());
        }
        result.messages.push(format!("directory {}", rendered));
    }
    Ok(result)
}
