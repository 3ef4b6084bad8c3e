//! CN-017: The ai tool — model-dependent content.
//!
//! During a collect pass the step records its fully assembled prompt
//! (context files and examples included) instead of calling out. In a
//! committing pass the resolved answer arrives as the highest-priority
//! variable scope, keyed by step id; the tool verifies guardrails and
//! writes the output file. Guardrail retry loops live in the transport,
//! not here.

use crate::core::collector::{Collector, ContentRequest};
use crate::core::context::{value_to_string, StepContext};
use crate::core::types::{Guardrail, StepResult};

/// Assemble the full prompt text: rendered prompt, then each context
/// file's contents, then inline examples.
pub fn assemble_prompt(
    prompt: &str,
    context_files: &[String],
    examples: &[String],
    ctx: &StepContext,
) -> Result<String, String> {
    let mut assembled = ctx.render(prompt)?;

    for file in context_files {
        let rendered = ctx.render(file)?;
        let path = ctx.project_root.join(&rendered);
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| format!("context file {} unreadable: {}", rendered, e))?;
        assembled.push_str(&format!("\n\n--- context: {} ---\n{}", rendered, contents));
    }

    for (i, example) in examples.iter().enumerate() {
        let rendered = ctx.render(example)?;
        assembled.push_str(&format!("\n\n--- example {} ---\n{}", i + 1, rendered));
    }

    Ok(assembled)
}

#[allow(clippy::too_many_arguments)]
pub fn execute(
    id: &str,
    prompt: &str,
    context_files: &[String],
    examples: &[String],
    guardrails: &[Guardrail],
    max_retries: u32,
    budget_tokens: Option<u64>,
    output: &str,
    ctx: &StepContext,
    collector: &mut Collector,
) -> Result<StepResult, String> {
    let rendered_output = ctx.render(output)?;
    let mut result = StepResult::new("", "ai");

    if collector.is_collecting() {
        let assembled = assemble_prompt(prompt, context_files, examples, ctx)?;
        collector.record(ContentRequest {
            id: id.to_string(),
            prompt: assembled,
            guardrails: guardrails.to_vec(),
            max_retries,
            budget_tokens,
            output: rendered_output.clone(),
        })?;
        result.skipped = true;
        result
            .messages
            .push(format!("collected content request for {}", rendered_output));
        return Ok(result);
    }

    let answer = ctx
        .variables
        .get(id)
        .map(value_to_string)
        .ok_or_else(|| {
            format!(
                "no resolved content for step '{}'; rerun with --answers <file>",
                id
            )
        })?;

    for guardrail in guardrails {
        guardrail
            .check(&answer)
            .map_err(|e| format!("step '{}' guardrail failed: {}", id, e))?;
    }

    if ctx.dry_run {
        result
            .messages
            .push(format!("[dry-run] would write {}", rendered_output));
        return Ok(result);
    }

    let target = ctx.project_root.join(&rendered_output);
    let existed = target.exists();
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
    }
    std::fs::write(&target, &answer)
        .map_err(|e| format!("cannot write {}: {}", target.display(), e))?;
    if existed {
        result.modified.push(target);
    } else {
        result.created.push(target);
    }
    result.output = Some(answer);
    result
        .messages
        .push(format!("{} written from resolved content", rendered_output));
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

    #[test]
    fn test_cn017_collect_records_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut collector = Collector::new();
        collector.enter_collect().unwrap();
        let r = execute(
            "gen",
            "Write handlers for {{name}}",
            &[],
            &[],
            &[],
            2,
            None,
            "src/{{name}}.rs",
            &ctx(dir.path()),
            &mut collector,
        )
        .unwrap();
        assert!(r.skipped);
        assert_eq!(collector.entries().len(), 1);
        assert_eq!(collector.entries()[0].prompt, "Write handlers for user");
        assert_eq!(collector.entries()[0].output, "src/user.rs");
        assert!(!dir.path().join("src/user.rs").exists());
    }

    #[test]
    fn test_cn017_assemble_with_context_and_examples() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schema.rs"), "pub struct User;").unwrap();
        let assembled = assemble_prompt(
            "Generate for {{name}}",
            &["schema.rs".to_string()],
            &["fn example() {}".to_string()],
            &ctx(dir.path()),
        )
        .unwrap();
        assert!(assembled.starts_with("Generate for user"));
        assert!(assembled.contains("--- context: schema.rs ---\npub struct User;"));
        assert!(assembled.contains("--- example 1 ---\nfn example() {}"));
    }

    #[test]
    fn test_cn017_missing_context_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = assemble_prompt("p", &["ghost.rs".to_string()], &[], &ctx(dir.path()))
            .unwrap_err();
        assert!(err.contains("ghost.rs"));
    }

    #[test]
    fn test_cn017_resolved_answer_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = ctx(dir.path());
        c.variables.insert(
            "gen".to_string(),
            serde_yaml_ng::Value::String("pub fn handler() {}".to_string()),
        );
        let mut collector = Collector::new();
        let r = execute(
            "gen",
            "p",
            &[],
            &[],
            &[Guardrail::NonEmpty],
            2,
            None,
            "out.rs",
            &c,
            &mut collector,
        )
        .unwrap();
        assert!(r.success);
        assert_eq!(r.created.len(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.rs")).unwrap(),
            "pub fn handler() {}"
        );
    }

    #[test]
    fn test_cn017_missing_answer_names_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut collector = Collector::new();
        let err = execute(
            "gen", "p", &[], &[], &[], 2, None, "out.rs", &ctx(dir.path()), &mut collector,
        )
        .unwrap_err();
        assert!(err.contains("--answers"));
        assert!(err.contains("'gen'"));
    }

    #[test]
    fn test_cn017_guardrail_rejects_answer() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = ctx(dir.path());
        c.variables.insert(
            "gen".to_string(),
            serde_yaml_ng::Value::String("no keyword here".to_string()),
        );
        let mut collector = Collector::new();
        let err = execute(
            "gen",
            "p",
            &[],
            &[],
            &[Guardrail::MustContain {
                text: "pub fn".to_string(),
            }],
            2,
            None,
            "out.rs",
            &c,
            &mut collector,
        )
        .unwrap_err();
        assert!(err.contains("guardrail failed"));
        assert!(!dir.path().join("out.rs").exists());
    }

    #[test]
    fn test_cn017_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = ctx(dir.path());
        c.dry_run = true;
        c.variables.insert(
            "gen".to_string(),
            serde_yaml_ng::Value::String("content".to_string()),
        );
        let mut collector = Collector::new();
        let r = execute(
            "gen", "p", &[], &[], &[], 2, None, "out.rs", &c, &mut collector,
        )
        .unwrap();
        assert!(r.messages[0].contains("[dry-run]"));
        assert!(!dir.path().join("out.rs").exists());
    }
}
