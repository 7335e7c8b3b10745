#![deny(unsafe_code)]

//! Rolebook resolution engine.
//!
//! Locates agent and tool definitions in a catalog directory tree and
//! parses them into flat [`ConfigRecord`]s. Nothing here executes agents or
//! tools; callers (such as the `rolebook` CLI) decide what to do with the
//! records.

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Resolution diagnostics capture for `--explain`.
pub mod logging;
/// Lookup name validation.
pub mod name;
/// Flat key/value records and their line parser.
pub mod record;
/// Agent/tool resolution and listing.
pub mod resolver;
/// Bounded, deterministic definition tree traversal.
pub mod walk;

pub use logging::{TraceCollector, TraceReader};
pub use name::{NameError, validate_name};
pub use record::{ConfigRecord, ParseError, parse_bytes, parse_str};
pub use resolver::{ConfigResolver, DefinitionKind, FileCheck, ResolveError, TreeReport};
pub use walk::{DefinitionFile, DefinitionWalker, TraversalError, WalkOptions};
