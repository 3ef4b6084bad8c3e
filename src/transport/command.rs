//! CN-022: External-command transport.
//!
//! Pipes a JSON request document to a configured command's stdin and reads
//! a JSON object mapping request id to answer text from its stdout. Every
//! collected id must be answered; guardrails are verified here so a broken
//! answerer fails before any file is written.

use crate::core::collector::ContentRequest;
use crate::core::config::CocinaConfig;
use crate::core::types::TransportResult;
use indexmap::IndexMap;
use serde_json::json;
use std::io::Write;
use std::process::{Command, Stdio};

/// The JSON document handed to the command on stdin.
pub fn request_document(requests: &[ContentRequest]) -> serde_json::Value {
    json!({
        "schema": "1",
        "requests": requests
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "prompt": r.prompt,
                    "output": r.output,
                })
            })
            .collect::<Vec<_>>(),
    })
}

pub fn resolve(
    requests: &[ContentRequest],
    config: &CocinaConfig,
) -> Result<TransportResult, String> {
    let command = config.resolution.command.as_deref().ok_or_else(|| {
        "resolution mode 'command' selected but no command is set \
         (set resolution.command in cocina.toml)"
            .to_string()
    })?;

    let document = serde_json::to_string_pretty(&request_document(requests))
        .map_err(|e| format!("cannot serialize request document: {}", e))?;

    let mut child = Command::new("bash")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn answer command '{}': {}", command, e))?;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(document.as_bytes()) {
            // A command may exit without reading stdin; its exit status is
            // the diagnostic that matters, not the broken pipe.
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(format!("stdin write error: {}", e));
            }
        }
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("wait error: {}", e))?;

    if !output.status.success() {
        return Err(format!(
            "answer command '{}' exited with code {}: {}",
            command,
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let answers = parse_answers(&stdout, requests)?;
    Ok(TransportResult::Resolved(answers))
}

/// Parse the command's stdout: a JSON object `{id: answer, ...}`. Checks
/// completeness and guardrails.
pub fn parse_answers(
    stdout: &str,
    requests: &[ContentRequest],
) -> Result<IndexMap<String, String>, String> {
    let parsed: IndexMap<String, String> = serde_json::from_str(stdout)
        .map_err(|e| format!("answer command output is not an id->text JSON object: {}", e))?;

    let mut answers = IndexMap::new();
    for request in requests {
        let text = parsed.get(&request.id).ok_or_else(|| {
            format!("answer command output is missing request '{}'", request.id)
        })?;
        for guardrail in &request.guardrails {
            guardrail.check(text).map_err(|e| {
                format!("answer for '{}' fails guardrail: {}", request.id, e)
            })?;
        }
        answers.insert(request.id.clone(), text.clone());
    }
    Ok(answers)
}
