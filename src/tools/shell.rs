//! CN-016: The shell tool.
//!
//! Runs a command through `bash` (not sh/dash — recipes rely on
//! `pipefail`), working directory relative to the project root. Commands
//! marked `once` are non-idempotent and are skipped during a collect pass;
//! they run only in the pass that commits.

use crate::core::collector::Collector;
use crate::core::context::StepContext;
use crate::core::types::StepResult;
use std::io::Write;
use std::process::{Command, Stdio};

pub fn execute(
    command: &str,
    cwd: Option<&str>,
    once: bool,
    ctx: &StepContext,
    collector: &Collector,
) -> Result<StepResult, String> {
    let rendered = ctx.render(command)?;
    let workdir = match cwd {
        Some(c) => ctx.project_root.join(ctx.render(c)?),
        None => ctx.project_root.clone(),
    };

    let mut result = StepResult::new("", "shell");

    if once && collector.is_collecting() {
        result.skipped = true;
        result
            .messages
            .push(format!("deferred non-idempotent command: {}", rendered));
        return Ok(result);
    }

    if ctx.dry_run {
        result
            .messages
            .push(format!("[dry-run] would run: {}", rendered));
        return Ok(result);
    }

    let mut child = Command::new("bash")
        .current_dir(&workdir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn bash: {}", e))?;

    if let Some(ref mut stdin) = child.stdin {
        stdin
            .write_all(rendered.as_bytes())
            .map_err(|e| format!("stdin write error: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("wait error: {}", e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    if code != 0 {
        return Err(format!(
            "command '{}' exited with code {}: {}",
            rendered,
            code,
            stderr.trim()
        ));
    }

    result.output = Some(stdout.trim_end().to_string());
    result.messages.push(format!("ran: {}", rendered));
    Ok(result)
}
