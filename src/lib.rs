//! Cocina — declarative code generation from YAML recipes.
//!
//! Kits hold cookbooks, cookbooks hold recipes, recipes hold tool-tagged
//! steps. Model-dependent steps resolve through a two-pass protocol:
//! collect the prompts, answer them (remote model, external command, or a
//! deferred human), then re-execute with the answers in scope.

pub mod cli;
pub mod core;
pub mod tools;
pub mod transport;
