//! CN-021: Print-and-defer transport.
//!
//! Prints the assembled prompt document to stdout and hands control back
//! to the shell with the reserved exit code. The operator (or an external
//! tool reading the document) produces an answers file and reruns the
//! same command with `--answers`.

use crate::core::answers::suggested_answers_path;
use crate::core::collector::ContentRequest;
use crate::core::types::{TransportResult, EXIT_ANSWERS_PENDING};
use std::path::Path;

/// Render the human-readable prompt document, including a ready-to-fill
/// answers skeleton.
pub fn prompt_document(requests: &[ContentRequest], answers_path: &Path) -> String {
    let mut doc = String::new();
    doc.push_str(&format!(
        "{} content request(s) need model-generated answers.\n",
        requests.len()
    ));

    for request in requests {
        doc.push_str(&format!(
            "\n=== request: {} (output: {}) ===\n{}\n",
            request.id, request.output, request.prompt
        ));
        if !request.guardrails.is_empty() {
            doc.push_str(&format!(
                "(answer must pass {} guardrail rule(s))\n",
                request.guardrails.len()
            ));
        }
    }

    doc.push_str(&format!(
        "\nWrite answers to {} in this shape, then rerun with --answers {}:\n\n",
        answers_path.display(),
        answers_path.display()
    ));
    doc.push_str("schema: \"1\"\nanswers:\n");
    for request in requests {
        doc.push_str(&format!("  {}: |\n    <answer>\n", request.id));
    }
    doc
}

/// Print the prompt document and defer with the reserved exit code.
pub fn defer(requests: &[ContentRequest], root: &Path) -> Result<TransportResult, String> {
    let answers_path = suggested_answers_path(root);
    println!("{}", prompt_document(requests, &answers_path));
    Ok(TransportResult::Deferred(EXIT_ANSWERS_PENDING))
}
