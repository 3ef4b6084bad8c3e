//! CN-008: Path resolution — CLI tokens to a recipe or group.
//!
//! Four strategies, tried in order, first success wins:
//! 1. Direct filesystem path (bypass)
//! 2. Kit-qualified descent (kit → cookbook → recipe, with defaults)
//! 3. Search-directory walk, greedy longest-prefix-first
//! 4. Token splitting (`kit:cookbook:recipe` as one token)
//!
//! Longest match wins everywhere: a deeper recipe beats a shallower one,
//! and a group is accepted only when no deeper recipe matches. Leftover
//! tokens become positional arguments.

use super::config::CocinaConfig;
use super::parser::{is_flat_recipe_file, RECIPE_FILE};
use super::types::{ResolvedKind, ResolvedPath};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Kit manifest (`kit.yaml`), optional inside a kit directory.
#[derive(Debug, Clone, Deserialize)]
struct KitManifest {
    #[serde(default)]
    default_cookbook: Option<String>,
    /// Glob patterns naming valid cookbook directories
    #[serde(default = "default_patterns")]
    cookbooks: Vec<String>,
}

/// Cookbook manifest (`cookbook.yaml`), optional inside a cookbook directory.
#[derive(Debug, Clone, Deserialize)]
struct CookbookManifest {
    #[serde(default)]
    default_recipe: Option<String>,
    /// Glob patterns naming valid recipe entries
    #[serde(default = "default_patterns")]
    recipes: Vec<String>,
}

fn default_patterns() -> Vec<String> {
    vec!["*".to_string()]
}

fn load_kit_manifest(kit_dir: &Path) -> KitManifest {
    load_manifest(&kit_dir.join("kit.yaml")).unwrap_or(KitManifest {
        default_cookbook: None,
        cookbooks: default_patterns(),
    })
}

fn load_cookbook_manifest(cookbook_dir: &Path) -> CookbookManifest {
    load_manifest(&cookbook_dir.join("cookbook.yaml")).unwrap_or(CookbookManifest {
        default_recipe: None,
        recipes: default_patterns(),
    })
}

fn load_manifest<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_yaml_ng::from_str(&content).ok()
}

fn matches_any(patterns: &[String], token: &str) -> bool {
    patterns
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .any(|p| p.matches(token))
}

/// Recipe entry named `name` under `parent`: either a directory holding
/// `recipe.yaml` or a flat `<name>.yaml` file.
fn find_recipe(parent: &Path, name: &str) -> Option<PathBuf> {
    let dir_recipe = parent.join(name).join(RECIPE_FILE);
    if dir_recipe.is_file() {
        return Some(dir_recipe);
    }
    let flat = parent.join(format!("{}.yaml", name));
    if flat.is_file() {
        return Some(flat);
    }
    None
}

/// Does the directory hold at least one immediate child recipe, either a
/// subdirectory with `recipe.yaml` or a flat recipe file?
fn has_nested_recipes(dir: &Path) -> bool {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return false,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.join(RECIPE_FILE).is_file() || is_flat_recipe_file(&path) {
            return true;
        }
    }
    false
}

/// Resolve CLI tokens to a recipe or group.
pub fn resolve(tokens: &[String], config: &CocinaConfig, root: &Path) -> Option<ResolvedPath> {
    resolve_inner(tokens, config, root, true)
}

fn resolve_inner(
    tokens: &[String],
    config: &CocinaConfig,
    root: &Path,
    allow_split: bool,
) -> Option<ResolvedPath> {
    if tokens.is_empty() {
        return None;
    }

    if let Some(r) = resolve_direct_path(tokens, root) {
        return Some(r);
    }
    if let Some(r) = resolve_kit_qualified(tokens, config, root) {
        return Some(r);
    }
    if let Some(r) = resolve_search_dirs(tokens, config, root) {
        return Some(r);
    }
    if allow_split && tokens.len() == 1 {
        let token = &tokens[0];
        let sep = if token.contains(':') { ':' } else { '/' };
        if token.contains(sep) {
            let split: Vec<String> = token.split(sep).map(str::to_string).collect();
            if split.len() > 1 {
                let mut r = resolve_inner(&split, config, root, false)?;
                // The caller passed one compound token: report that token
                // as consumed, with unmatched pieces left as positionals.
                r.consumed = vec![token.clone()];
                return Some(r);
            }
        }
    }
    None
}

/// Strategy 1: the first token is a filesystem path. Consumes only that
/// token; everything after it is positional.
fn resolve_direct_path(tokens: &[String], root: &Path) -> Option<ResolvedPath> {
    let first = &tokens[0];
    let looks_like_path = first.starts_with("./")
        || first.starts_with("../")
        || first.starts_with('/')
        || first.ends_with(".yaml")
        || first.ends_with(".yml");
    if !looks_like_path {
        return None;
    }

    let candidate = if Path::new(first).is_absolute() {
        PathBuf::from(first)
    } else {
        root.join(first)
    };

    let (kind, full_path) = if candidate.is_file() {
        (ResolvedKind::Recipe, candidate)
    } else if candidate.is_dir() {
        let recipe = candidate.join(RECIPE_FILE);
        if recipe.is_file() {
            (ResolvedKind::Recipe, recipe)
        } else if has_nested_recipes(&candidate) {
            (ResolvedKind::Group, candidate)
        } else {
            return None;
        }
    } else {
        return None;
    };

    Some(ResolvedPath {
        kind,
        full_path,
        kit: None,
        cookbook: None,
        recipe: None,
        consumed: vec![first.clone()],
        remaining: tokens[1..].to_vec(),
    })
}

/// Strategy 2: kit → cookbook → recipe descent through the kits directory.
/// At each level where tokens run out (or stop matching), the level's
/// configured default takes over; with no default the directory resolves
/// as a group when it holds nested recipes.
fn resolve_kit_qualified(
    tokens: &[String],
    config: &CocinaConfig,
    root: &Path,
) -> Option<ResolvedPath> {
    let kit_name = &tokens[0];
    let kit_dir = config.kits_dir(root).join(kit_name);
    if !kit_dir.is_dir() {
        return None;
    }
    let kit = load_kit_manifest(&kit_dir);

    let mut consumed = vec![kit_name.clone()];
    let mut rest = &tokens[1..];

    // Cookbook level
    let cookbook_name = match rest.first() {
        Some(t) if matches_any(&kit.cookbooks, t) && kit_dir.join(t).is_dir() => {
            consumed.push(t.clone());
            rest = &rest[1..];
            t.clone()
        }
        _ => match kit.default_cookbook {
            Some(ref d) if kit_dir.join(d).is_dir() => d.clone(),
            _ => {
                // No cookbook match, no default: the kit itself is a group
                if has_nested_recipes(&kit_dir) {
                    return Some(ResolvedPath {
                        kind: ResolvedKind::Group,
                        full_path: kit_dir,
                        kit: Some(kit_name.clone()),
                        cookbook: None,
                        recipe: None,
                        consumed,
                        remaining: rest.to_vec(),
                    });
                }
                return None;
            }
        },
    };
    let cookbook_dir = kit_dir.join(&cookbook_name);
    let cookbook = load_cookbook_manifest(&cookbook_dir);

    // Recipe level
    let (recipe_name, recipe_file) = match rest.first() {
        Some(t) if matches_any(&cookbook.recipes, t) => match find_recipe(&cookbook_dir, t) {
            Some(file) => {
                consumed.push(t.clone());
                rest = &rest[1..];
                (t.clone(), file)
            }
            None => match default_recipe_of(&cookbook, &cookbook_dir) {
                Some(pair) => pair,
                None => return group_fallback(cookbook_dir, kit_name, &cookbook_name, consumed, rest),
            },
        },
        _ => match default_recipe_of(&cookbook, &cookbook_dir) {
            Some(pair) => pair,
            None => return group_fallback(cookbook_dir, kit_name, &cookbook_name, consumed, rest),
        },
    };

    Some(ResolvedPath {
        kind: ResolvedKind::Recipe,
        full_path: recipe_file,
        kit: Some(kit_name.clone()),
        cookbook: Some(cookbook_name),
        recipe: Some(recipe_name),
        consumed,
        remaining: rest.to_vec(),
    })
}

fn default_recipe_of(manifest: &CookbookManifest, dir: &Path) -> Option<(String, PathBuf)> {
    let name = manifest.default_recipe.as_ref()?;
    find_recipe(dir, name).map(|file| (name.clone(), file))
}

fn group_fallback(
    dir: PathBuf,
    kit: &str,
    cookbook: &str,
    consumed: Vec<String>,
    rest: &[String],
) -> Option<ResolvedPath> {
    if !has_nested_recipes(&dir) {
        return None;
    }
    Some(ResolvedPath {
        kind: ResolvedKind::Group,
        full_path: dir,
        kit: Some(kit.to_string()),
        cookbook: Some(cookbook.to_string()),
        recipe: None,
        consumed,
        remaining: rest.to_vec(),
    })
}

/// Strategy 3: walk each configured search directory trying the longest
/// token prefix as a nested subdirectory path, shrinking one token at a
/// time. At each depth a recipe beats a group.
fn resolve_search_dirs(
    tokens: &[String],
    config: &CocinaConfig,
    root: &Path,
) -> Option<ResolvedPath> {
    let dirs = config.search_dirs(root);
    for depth in (1..=tokens.len()).rev() {
        let prefix = &tokens[..depth];
        for dir in &dirs {
            let mut candidate = dir.clone();
            for segment in prefix {
                candidate.push(segment);
            }
            let recipe_file = candidate.join(RECIPE_FILE);
            if recipe_file.is_file() {
                return Some(ResolvedPath {
                    kind: ResolvedKind::Recipe,
                    full_path: recipe_file,
                    kit: None,
                    cookbook: None,
                    recipe: prefix.last().cloned(),
                    consumed: prefix.to_vec(),
                    remaining: tokens[depth..].to_vec(),
                });
            }
            // Flat recipe file named after the last segment
            if let Some(last) = prefix.last() {
                if let Some(parent) = candidate.parent() {
                    if let Some(file) = find_recipe(parent, last) {
                        return Some(ResolvedPath {
                            kind: ResolvedKind::Recipe,
                            full_path: file,
                            kit: None,
                            cookbook: None,
                            recipe: Some(last.clone()),
                            consumed: prefix.to_vec(),
                            remaining: tokens[depth..].to_vec(),
                        });
                    }
                }
            }
            if candidate.is_dir() && has_nested_recipes(&candidate) {
                return Some(ResolvedPath {
                    kind: ResolvedKind::Group,
                    full_path: candidate,
                    kit: None,
                    cookbook: None,
                    recipe: None,
                    consumed: prefix.to_vec(),
                    remaining: tokens[depth..].to_vec(),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn write_recipe(dir: &Path, name: &str) {
        let recipe_dir = dir.join(name);
        std::fs::create_dir_all(&recipe_dir).unwrap();
        std::fs::write(
            recipe_dir.join(RECIPE_FILE),
            format!("name: {}\nsteps:\n  - tool: echo\n    message: hi\n", name),
        )
        .unwrap();
    }

    /// kits/nextjs/crud/{resource,form}, kits/nextjs/auth/login
    fn kit_fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let crud = dir.path().join("kits/nextjs/crud");
        std::fs::create_dir_all(&crud).unwrap();
        write_recipe(&crud, "resource");
        write_recipe(&crud, "form");
        let auth = dir.path().join("kits/nextjs/auth");
        std::fs::create_dir_all(&auth).unwrap();
        write_recipe(&auth, "login");
        dir
    }

    #[test]
    fn test_cn008_kit_cookbook_recipe() {
        let dir = kit_fixture();
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["nextjs", "crud", "resource", "Organization"]), &cfg, dir.path())
            .unwrap();
        assert_eq!(r.kind, ResolvedKind::Recipe);
        assert_eq!(r.kit.as_deref(), Some("nextjs"));
        assert_eq!(r.cookbook.as_deref(), Some("crud"));
        assert_eq!(r.recipe.as_deref(), Some("resource"));
        assert_eq!(r.consumed, toks(&["nextjs", "crud", "resource"]));
        assert_eq!(r.remaining, toks(&["Organization"]));
        assert_eq!(r.consumed.len() + r.remaining.len(), 4);
    }

    #[test]
    fn test_cn008_kit_cookbook_group() {
        // Tokens stop at the cookbook, no default recipe: group
        let dir = kit_fixture();
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["nextjs", "crud"]), &cfg, dir.path()).unwrap();
        assert_eq!(r.kind, ResolvedKind::Group);
        assert_eq!(r.cookbook.as_deref(), Some("crud"));
        assert!(r.remaining.is_empty());
    }

    #[test]
    fn test_cn008_cookbook_default_recipe() {
        let dir = kit_fixture();
        std::fs::write(
            dir.path().join("kits/nextjs/crud/cookbook.yaml"),
            "default_recipe: resource\n",
        )
        .unwrap();
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["nextjs", "crud"]), &cfg, dir.path()).unwrap();
        assert_eq!(r.kind, ResolvedKind::Recipe);
        assert_eq!(r.recipe.as_deref(), Some("resource"));
    }

    #[test]
    fn test_cn008_kit_default_cookbook() {
        let dir = kit_fixture();
        std::fs::write(
            dir.path().join("kits/nextjs/kit.yaml"),
            "default_cookbook: crud\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("kits/nextjs/crud/cookbook.yaml"),
            "default_recipe: form\n",
        )
        .unwrap();
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["nextjs"]), &cfg, dir.path()).unwrap();
        assert_eq!(r.kind, ResolvedKind::Recipe);
        assert_eq!(r.cookbook.as_deref(), Some("crud"));
        assert_eq!(r.recipe.as_deref(), Some("form"));
    }

    #[test]
    fn test_cn008_cookbook_pattern_restriction() {
        let dir = kit_fixture();
        std::fs::write(
            dir.path().join("kits/nextjs/kit.yaml"),
            "cookbooks:\n  - \"crud\"\n",
        )
        .unwrap();
        let cfg = CocinaConfig::default();
        // "auth" exists on disk but is excluded by the kit's patterns,
        // and there are no recipes directly under the kit, so no match.
        assert!(resolve(&toks(&["nextjs", "auth", "login"]), &cfg, dir.path()).is_none());
        assert!(resolve(&toks(&["nextjs", "crud", "form"]), &cfg, dir.path()).is_some());
    }

    #[test]
    fn test_cn008_unknown_kit_falls_to_search_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let recipes = dir.path().join("recipes");
        std::fs::create_dir_all(&recipes).unwrap();
        write_recipe(&recipes, "component");
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["component", "Button"]), &cfg, dir.path()).unwrap();
        assert_eq!(r.kind, ResolvedKind::Recipe);
        assert_eq!(r.consumed, toks(&["component"]));
        assert_eq!(r.remaining, toks(&["Button"]));
    }

    #[test]
    fn test_cn008_longest_match_wins() {
        // recipes/a and recipes/a/b are both recipes: [a, b] must take a/b
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("recipes/a");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::write(a.join(RECIPE_FILE), "name: a\nsteps:\n  - tool: echo\n    message: a\n")
            .unwrap();
        write_recipe(&a, "b");
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["a", "b"]), &cfg, dir.path()).unwrap();
        assert_eq!(r.consumed, toks(&["a", "b"]));
        assert!(r.remaining.is_empty());
        assert!(r.full_path.ends_with("a/b/recipe.yaml"));
    }

    #[test]
    fn test_cn008_search_dir_group() {
        let dir = tempfile::tempdir().unwrap();
        let scaffold = dir.path().join("recipes/scaffold");
        std::fs::create_dir_all(&scaffold).unwrap();
        write_recipe(&scaffold, "one");
        write_recipe(&scaffold, "two");
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["scaffold"]), &cfg, dir.path()).unwrap();
        assert_eq!(r.kind, ResolvedKind::Group);
    }

    #[test]
    fn test_cn008_direct_path_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("custom.yaml"),
            "name: custom\nsteps:\n  - tool: echo\n    message: hi\n",
        )
        .unwrap();
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["custom.yaml", "Widget"]), &cfg, dir.path()).unwrap();
        assert_eq!(r.kind, ResolvedKind::Recipe);
        assert_eq!(r.consumed, toks(&["custom.yaml"]));
        assert_eq!(r.remaining, toks(&["Widget"]));
    }

    #[test]
    fn test_cn008_direct_path_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(dir.path(), "local");
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["./local"]), &cfg, dir.path()).unwrap();
        assert_eq!(r.kind, ResolvedKind::Recipe);
        assert!(r.full_path.ends_with("local/recipe.yaml"));
    }

    #[test]
    fn test_cn008_token_splitting() {
        let dir = kit_fixture();
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["nextjs:crud:resource"]), &cfg, dir.path()).unwrap();
        assert_eq!(r.kind, ResolvedKind::Recipe);
        assert_eq!(r.recipe.as_deref(), Some("resource"));
        // The compound token is reported as the consumed token
        assert_eq!(r.consumed, toks(&["nextjs:crud:resource"]));
        assert!(r.remaining.is_empty());
    }

    #[test]
    fn test_cn008_token_splitting_leftover_positional() {
        let dir = kit_fixture();
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["nextjs:crud:resource:Organization"]), &cfg, dir.path())
            .unwrap();
        assert_eq!(r.kind, ResolvedKind::Recipe);
        assert_eq!(r.consumed, toks(&["nextjs:crud:resource:Organization"]));
        assert_eq!(r.remaining, toks(&["Organization"]));
    }

    #[test]
    fn test_cn008_flat_recipes_form_group() {
        // A directory holding only flat recipe files resolves as a group
        let dir = tempfile::tempdir().unwrap();
        let scaffold = dir.path().join("recipes/scaffold");
        std::fs::create_dir_all(&scaffold).unwrap();
        for name in ["one", "two"] {
            std::fs::write(
                scaffold.join(format!("{}.yaml", name)),
                format!("name: {}\nsteps:\n  - tool: echo\n    message: hi\n", name),
            )
            .unwrap();
        }
        let cfg = CocinaConfig::default();
        let r = resolve(&toks(&["scaffold"]), &cfg, dir.path()).unwrap();
        assert_eq!(r.kind, ResolvedKind::Group);
        assert!(r.full_path.ends_with("recipes/scaffold"));
    }

    #[test]
    fn test_cn008_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CocinaConfig::default();
        assert!(resolve(&toks(&["ghost", "recipe"]), &cfg, dir.path()).is_none());
        assert!(resolve(&[], &cfg, dir.path()).is_none());
    }
}
