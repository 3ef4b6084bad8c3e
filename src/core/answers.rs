//! CN-007: Answers files — versioned, resumable model content.
//!
//! An answers file carries resolved model content keyed by step id. It is
//! produced by the defer transport (alongside the prompt document) and
//! consumed via `--answers` to resume an interrupted invocation. Both YAML
//! and JSON encodings are accepted; the schema field is checked so a future
//! format revision fails loudly instead of silently misreading.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current answers-file schema version.
pub const ANSWERS_SCHEMA: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswersFile {
    pub schema: String,
    #[serde(default)]
    pub answers: IndexMap<String, String>,
}

impl AnswersFile {
    pub fn new(answers: IndexMap<String, String>) -> Self {
        Self {
            schema: ANSWERS_SCHEMA.to_string(),
            answers,
        }
    }
}

/// Load an answers file. Extension picks the format; anything that is not
/// `.json` is tried as YAML first with a JSON fallback.
pub fn load_answers(path: &Path) -> Result<AnswersFile, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read answers file {}: {}", path.display(), e))?;

    let is_json = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let parsed: AnswersFile = if is_json {
        serde_json::from_str(&content)
            .map_err(|e| format!("invalid answers file {}: {}", path.display(), e))?
    } else {
        match serde_yaml_ng::from_str(&content) {
            Ok(a) => a,
            Err(yaml_err) => serde_json::from_str(&content).map_err(|_| {
                format!("invalid answers file {}: {}", path.display(), yaml_err)
            })?,
        }
    };

    if parsed.schema != ANSWERS_SCHEMA {
        return Err(format!(
            "answers file {} has schema '{}', expected '{}'",
            path.display(),
            parsed.schema,
            ANSWERS_SCHEMA
        ));
    }
    Ok(parsed)
}

/// Write an answers-file skeleton (empty answer bodies) for the operator
/// to fill in. YAML, to match the recipe format.
pub fn save_answers(path: &Path, answers: &AnswersFile) -> Result<(), String> {
    let yaml = serde_yaml_ng::to_string(answers)
        .map_err(|e| format!("cannot serialize answers: {}", e))?;
    std::fs::write(path, yaml)
        .map_err(|e| format!("cannot write answers file {}: {}", path.display(), e))
}

/// Conventional location for a generated answers skeleton.
pub fn suggested_answers_path(root: &Path) -> std::path::PathBuf {
    root.join("cocina-answers.yaml")
}
