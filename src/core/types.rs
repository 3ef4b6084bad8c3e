//! CN-001: All types from the cocina schema.
//!
//! Defines the YAML schema for recipes (variables, tool-tagged steps),
//! resolution results, execution results, and the transport outcome.
//! Schema types derive Serialize/Deserialize for YAML roundtripping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Recipe definition
// ============================================================================

/// A parsed recipe — declares typed variables and an ordered list of steps.
/// Parsed once per invocation and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDefinition {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Variable declarations (order-preserving)
    #[serde(default)]
    pub variables: IndexMap<String, VariableDecl>,

    /// Ordered steps
    pub steps: Vec<Step>,
}

/// A recipe variable declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    /// Variable type: string, int, bool, path, enum
    #[serde(rename = "type", default = "default_var_type")]
    pub var_type: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub default: Option<serde_yaml_ng::Value>,

    /// Bind from leftover CLI tokens by position (0-based)
    #[serde(default)]
    pub positional: Option<usize>,

    /// Allowed values for enum type
    #[serde(default)]
    pub choices: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_var_type() -> String {
    "string".to_string()
}

/// One unit of work within a recipe. The `tool` tag selects the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: Option<String>,

    /// Step-local variable overrides (between recipe defaults and caller vars)
    #[serde(default)]
    pub vars: IndexMap<String, serde_yaml_ng::Value>,

    /// Advisory shared-state keys this step reads
    #[serde(default)]
    pub reads: Vec<String>,

    /// Advisory shared-state keys this step writes after success
    #[serde(default)]
    pub writes: Vec<String>,

    /// Advisory message tags this step subscribes to
    #[serde(default)]
    pub subscribes: Vec<String>,

    #[serde(flatten)]
    pub spec: StepSpec,
}

impl Step {
    /// Stable identifier for a step: declared name, or `step-N-<tool>`.
    pub fn id(&self, index: usize) -> String {
        match self.name {
            Some(ref n) => n.clone(),
            None => format!("step-{}-{}", index + 1, self.spec.tool_name()),
        }
    }
}

/// Closed tagged union of step payloads, one per tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum StepSpec {
    /// Invoke a registered named action
    Action {
        action: String,
        #[serde(default)]
        params: IndexMap<String, serde_yaml_ng::Value>,
    },

    /// Create a file
    Add {
        path: String,
        #[serde(default)]
        content: String,
        /// Overwrite differing existing content without --force
        #[serde(default)]
        force: bool,
    },

    /// Splice content into an existing file
    Inject {
        path: String,
        content: String,
        #[serde(default)]
        before: Option<String>,
        #[serde(default)]
        after: Option<String>,
        /// Absolute 1-based line number
        #[serde(default)]
        line: Option<usize>,
        #[serde(default)]
        prepend: bool,
        #[serde(default)]
        append: bool,
        /// Pattern: if it already matches the file, injection is a no-op
        #[serde(default)]
        skip_if: Option<String>,
        #[serde(default = "default_true")]
        trailing_newline: bool,
    },

    /// Run a shell command
    Shell {
        command: String,
        #[serde(default)]
        cwd: Option<String>,
        /// Non-idempotent command: skipped during a collect pass,
        /// runs only in the committing pass
        #[serde(default)]
        once: bool,
    },

    /// Scaffold a directory tree
    Setup {
        #[serde(default)]
        dirs: Vec<String>,
        #[serde(default)]
        base: Option<String>,
    },

    /// Print a message
    Echo { message: String },

    /// Model-dependent content: collected in Pass 1, applied in Pass 2
    Ai {
        prompt: String,
        /// Project-relative files whose contents are appended to the prompt
        #[serde(default)]
        context_files: Vec<String>,
        /// Inline example snippets appended to the prompt
        #[serde(default)]
        examples: Vec<String>,
        #[serde(default)]
        guardrails: Vec<Guardrail>,
        #[serde(default = "default_max_retries")]
        max_retries: u32,
        /// Token budget checked before any model call
        #[serde(default)]
        budget_tokens: Option<u64>,
        /// Target file for the resolved content
        output: String,
    },
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    2
}

impl StepSpec {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Action { .. } => "action",
            Self::Add { .. } => "add",
            Self::Inject { .. } => "inject",
            Self::Shell { .. } => "shell",
            Self::Setup { .. } => "setup",
            Self::Echo { .. } => "echo",
            Self::Ai { .. } => "ai",
        }
    }

    /// Whether this step depends on externally resolved model content.
    pub fn is_model_dependent(&self) -> bool {
        matches!(self, Self::Ai { .. })
    }
}

// ============================================================================
// Guardrails
// ============================================================================

/// A validation rule applied to model-generated output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Guardrail {
    MustContain { text: String },
    MustMatch { pattern: String },
    MaxLines { limit: usize },
    NonEmpty,
}

impl Guardrail {
    /// Check text against this rule. Err carries feedback suitable for
    /// appending to a retry prompt.
    pub fn check(&self, text: &str) -> Result<(), String> {
        match self {
            Self::MustContain { text: needle } => {
                if text.contains(needle.as_str()) {
                    Ok(())
                } else {
                    Err(format!("output must contain '{}'", needle))
                }
            }
            Self::MustMatch { pattern } => {
                let re = regex::Regex::new(pattern)
                    .map_err(|e| format!("invalid guardrail pattern '{}': {}", pattern, e))?;
                if re.is_match(text) {
                    Ok(())
                } else {
                    Err(format!("output must match pattern '{}'", pattern))
                }
            }
            Self::MaxLines { limit } => {
                let n = text.lines().count();
                if n <= *limit {
                    Ok(())
                } else {
                    Err(format!("output has {} lines, limit is {}", n, limit))
                }
            }
            Self::NonEmpty => {
                if text.trim().is_empty() {
                    Err("output must not be empty".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

// ============================================================================
// Path resolution
// ============================================================================

/// What a set of CLI tokens resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedKind {
    Recipe,
    Group,
}

impl fmt::Display for ResolvedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recipe => write!(f, "recipe"),
            Self::Group => write!(f, "group"),
        }
    }
}

/// Result of resolving CLI tokens against the installed kit/cookbook tree.
///
/// Invariant: `consumed.len() + remaining.len()` equals the input token
/// count, except when a single compound token (`kit:cookbook:recipe`) was
/// split: then `consumed` holds the original compound token and
/// `remaining` holds its unmatched pieces.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    pub kind: ResolvedKind,
    /// Recipe file for `Recipe`, directory for `Group`
    pub full_path: PathBuf,
    pub kit: Option<String>,
    pub cookbook: Option<String>,
    pub recipe: Option<String>,
    /// Tokens consumed by the match, in order
    pub consumed: Vec<String>,
    /// Leftover tokens — positional arguments
    pub remaining: Vec<String>,
}

// ============================================================================
// Execution results
// ============================================================================

/// Result of executing one step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub name: String,
    pub tool: String,
    pub success: bool,
    pub skipped: bool,
    pub created: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub messages: Vec<String>,
    /// Machine-consumable output (shell stdout, rendered echo, model answer)
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl StepResult {
    pub fn new(name: &str, tool: &str) -> Self {
        Self {
            name: name.to_string(),
            tool: tool.to_string(),
            success: true,
            skipped: false,
            created: Vec::new(),
            modified: Vec::new(),
            deleted: Vec::new(),
            messages: Vec::new(),
            output: None,
            error: None,
            duration: Duration::ZERO,
        }
    }

    pub fn failed(name: &str, tool: &str, error: String) -> Self {
        let mut r = Self::new(name, tool);
        r.success = false;
        r.error = Some(error);
        r
    }
}

/// Result of executing one recipe (one committed pass).
#[derive(Debug, Clone)]
pub struct RecipeResult {
    pub recipe: String,
    pub success: bool,
    pub steps: Vec<StepResult>,
    pub duration: Duration,
}

impl RecipeResult {
    pub fn created_files(&self) -> Vec<&PathBuf> {
        self.steps.iter().flat_map(|s| s.created.iter()).collect()
    }

    pub fn modified_files(&self) -> Vec<&PathBuf> {
        self.steps.iter().flat_map(|s| s.modified.iter()).collect()
    }

    pub fn first_error(&self) -> Option<&str> {
        self.steps.iter().find_map(|s| s.error.as_deref())
    }
}

/// One group entry — the roll-up of a sibling recipe's run.
#[derive(Debug, Clone)]
pub struct GroupEntry {
    pub recipe: String,
    pub success: bool,
    pub steps: usize,
}

/// Result of executing a group of sibling recipes.
#[derive(Debug, Clone)]
pub struct GroupResult {
    pub group: String,
    pub success: bool,
    pub entries: Vec<GroupEntry>,
    pub duration: Duration,
}

// ============================================================================
// Transport outcome
// ============================================================================

/// Reserved exit code: answers pending — rerun with `--answers`.
pub const EXIT_ANSWERS_PENDING: i32 = 2;

/// Outcome of turning collected content requests into answers.
#[derive(Debug, Clone)]
pub enum TransportResult {
    /// Answers resolved inline; Pass 2 can run immediately
    Resolved(IndexMap<String, String>),
    /// Resolution handed off to a later process invocation
    Deferred(i32),
}
