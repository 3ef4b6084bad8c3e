//! Core engine — types, parsing, resolution, context, two-pass execution.

pub mod answers;
pub mod collector;
pub mod config;
pub mod context;
pub mod executor;
pub mod group;
pub mod injector;
pub mod parser;
pub mod resolver;
pub mod types;
