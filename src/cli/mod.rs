//! CN-040: CLI subcommands — run, list, validate, init.

use crate::core::collector::Collector;
use crate::core::config::{CocinaConfig, CONFIG_FILE};
use crate::core::executor::{run_recipe, EngineOptions, EngineOutcome};
use crate::core::group::{run_group, GroupOutcome};
use crate::core::parser::{load_recipe, validate_recipe, RECIPE_FILE};
use crate::core::resolver::resolve;
use crate::core::types::{RecipeResult, ResolvedKind};
use crate::transport::AskMode;
use clap::Subcommand;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve path segments to a recipe or group and run it
    Run {
        /// Path segments (kit cookbook recipe ...) plus positional arguments
        #[arg(required = true)]
        segments: Vec<String>,

        /// Set a variable (key=value, repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Answers file from a previous deferred run
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Who answers model content requests: me, ai, nobody
        #[arg(long)]
        ask: Option<String>,

        /// Ignore recipe-level variable defaults
        #[arg(long)]
        no_defaults: bool,

        /// Report intended effects without touching the filesystem
        #[arg(long)]
        dry: bool,

        /// Overwrite files that exist with different content
        #[arg(long)]
        force: bool,

        /// Skip confirmation prompts
        #[arg(short, long)]
        yes: bool,

        /// For groups: keep running past a failed recipe
        #[arg(long)]
        continue_on_error: bool,
    },

    /// List installed kits, cookbooks, and recipes
    List,

    /// Validate a recipe file or directory
    Validate {
        /// Recipe file or directory containing recipe.yaml
        path: PathBuf,
    },

    /// Initialize a cocina project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

/// Dispatch a CLI command. Returns the process exit code.
pub fn dispatch(cmd: Commands) -> Result<i32, String> {
    match cmd {
        Commands::Run {
            segments,
            set,
            answers,
            ask,
            no_defaults,
            dry,
            force,
            yes,
            continue_on_error,
        } => cmd_run(RunArgs {
            segments,
            set,
            answers,
            ask,
            no_defaults,
            dry,
            force,
            yes,
            continue_on_error,
        }),
        Commands::List => cmd_list().map(|_| 0),
        Commands::Validate { path } => cmd_validate(&path).map(|_| 0),
        Commands::Init { path } => cmd_init(&path).map(|_| 0),
    }
}

pub struct RunArgs {
    pub segments: Vec<String>,
    pub set: Vec<String>,
    pub answers: Option<PathBuf>,
    pub ask: Option<String>,
    pub no_defaults: bool,
    pub dry: bool,
    pub force: bool,
    pub yes: bool,
    pub continue_on_error: bool,
}

fn cmd_run(args: RunArgs) -> Result<i32, String> {
    let root = std::env::current_dir().map_err(|e| format!("cannot read cwd: {}", e))?;
    let config = CocinaConfig::load(&root)?;

    let resolved = resolve(&args.segments, &config, &root).ok_or_else(|| {
        format!(
            "no recipe or group matches: {} (checked kits, search dirs, and direct paths)",
            args.segments.join(" ")
        )
    })?;

    let ask = match args.ask.as_deref() {
        Some(s) => Some(s.parse::<AskMode>()?),
        None => None,
    };

    let mut opts = EngineOptions::new(root, config);
    opts.dry_run = args.dry;
    opts.force = args.force;
    opts.no_defaults = args.no_defaults;
    opts.set_vars = parse_set_vars(&args.set)?;
    opts.ask = ask;
    opts.answers_file = args.answers;
    opts.strict_positionals = resolved.kind == ResolvedKind::Recipe;

    if args.force && !args.yes && !args.dry && !confirm("--force may overwrite files, continue?")? {
        return Err("aborted".to_string());
    }

    let label: Vec<&str> = [&resolved.kit, &resolved.cookbook, &resolved.recipe]
        .iter()
        .filter_map(|o| o.as_deref())
        .collect();
    if label.is_empty() {
        println!("{}: {}", resolved.kind, resolved.full_path.display());
    } else {
        println!("{}: {}", resolved.kind, label.join("/"));
    }

    let mut collector = Collector::new();
    match resolved.kind {
        ResolvedKind::Recipe => {
            let recipe = load_recipe(&resolved.full_path)?;
            match run_recipe(&recipe, &resolved.remaining, &opts, &mut collector)? {
                EngineOutcome::Completed(result) => {
                    print_recipe_summary(&result);
                    if result.success {
                        Ok(0)
                    } else {
                        Err(result
                            .first_error()
                            .unwrap_or("recipe failed")
                            .to_string())
                    }
                }
                EngineOutcome::AnswersPending(code) => Ok(code),
            }
        }
        ResolvedKind::Group => {
            match run_group(
                &resolved.full_path,
                &resolved.remaining,
                &opts,
                &mut collector,
                args.continue_on_error,
            )? {
                GroupOutcome::Completed(result) => {
                    println!(
                        "group '{}': {}/{} recipe(s) succeeded",
                        result.group,
                        result.entries.iter().filter(|e| e.success).count(),
                        result.entries.len()
                    );
                    for entry in &result.entries {
                        println!(
                            "  {} {} ({} step(s))",
                            if entry.success { "ok " } else { "FAIL" },
                            entry.recipe,
                            entry.steps
                        );
                    }
                    if result.success {
                        Ok(0)
                    } else {
                        Err(format!("group '{}' failed", result.group))
                    }
                }
                GroupOutcome::AnswersPending(code) => Ok(code),
            }
        }
    }
}

fn print_recipe_summary(result: &RecipeResult) {
    println!(
        "recipe '{}' {} ({} step(s), {:.1?})",
        result.recipe,
        if result.success { "completed" } else { "failed" },
        result.steps.len(),
        result.duration
    );
    for path in result.created_files() {
        println!("  created:  {}", path.display());
    }
    for path in result.modified_files() {
        println!("  modified: {}", path.display());
    }
    for step in &result.steps {
        if step.skipped {
            println!("  skipped:  {}", step.name);
        }
    }
}

/// Parse repeated `--set key=value` pairs.
pub fn parse_set_vars(
    pairs: &[String],
) -> Result<IndexMap<String, serde_yaml_ng::Value>, String> {
    let mut vars = IndexMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("invalid --set '{}' (expected key=value)", pair))?;
        if key.is_empty() {
            return Err(format!("invalid --set '{}' (empty key)", pair));
        }
        vars.insert(
            key.to_string(),
            serde_yaml_ng::Value::String(value.to_string()),
        );
    }
    Ok(vars)
}

fn confirm(question: &str) -> Result<bool, String> {
    use std::io::Write;
    print!("{} [y/N] ", question);
    std::io::stdout()
        .flush()
        .map_err(|e| format!("stdout error: {}", e))?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| format!("stdin error: {}", e))?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn cmd_list() -> Result<(), String> {
    let root = std::env::current_dir().map_err(|e| format!("cannot read cwd: {}", e))?;
    let config = CocinaConfig::load(&root)?;

    let kits_dir = config.kits_dir(&root);
    if kits_dir.is_dir() {
        println!("kits ({}):", kits_dir.display());
        for kit in sorted_dirs(&kits_dir)? {
            let kit_name = file_name(&kit);
            println!("  {}", kit_name);
            for cookbook in sorted_dirs(&kit)? {
                println!("    {}", file_name(&cookbook));
                for recipe in sorted_dirs(&cookbook)? {
                    if recipe.join(RECIPE_FILE).is_file() {
                        println!("      {}", file_name(&recipe));
                    }
                }
            }
        }
    }

    for dir in config.search_dirs(&root) {
        if !dir.is_dir() {
            continue;
        }
        println!("recipes ({}):", dir.display());
        for entry in sorted_dirs(&dir)? {
            if entry.join(RECIPE_FILE).is_file() {
                println!("  {}", file_name(&entry));
            }
        }
    }
    Ok(())
}

fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("cannot read {}: {}", dir.display(), e))?;
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn cmd_validate(path: &Path) -> Result<(), String> {
    let recipe = load_recipe(path)?;
    let errors = validate_recipe(&recipe);

    if errors.is_empty() {
        println!(
            "OK: {} ({} variable(s), {} step(s))",
            recipe.name,
            recipe.variables.len(),
            recipe.steps.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    let template = r#"# cocina project configuration
kits_dir = "kits"
search_dirs = ["recipes"]

[resolution]
# mode = "model" | "command" | "defer" (unset = auto)

# [resolution.provider]
# base_url = "https://api.openai.com/v1"
# model = "gpt-4o-mini"
# api_key_env = "COCINA_API_KEY"
"#;
    std::fs::write(&config_path, template)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    let example_dir = path.join("recipes/hello");
    std::fs::create_dir_all(&example_dir)
        .map_err(|e| format!("cannot create {}: {}", example_dir.display(), e))?;
    let recipe = r#"name: hello
description: "Starter recipe"
variables:
  name:
    type: string
    required: true
    positional: 0
steps:
  - name: greet
    tool: echo
    message: "hello, {{name}}"
"#;
    std::fs::write(example_dir.join(RECIPE_FILE), recipe)
        .map_err(|e| format!("cannot write recipe: {}", e))?;

    println!("Initialized cocina project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}/{}", example_dir.display(), RECIPE_FILE);
    println!("Try: cocina run hello world");
    Ok(())
}
