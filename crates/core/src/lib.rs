#![allow(clippy::result_large_err)]
//! kbx-core: bidirectional transformation synthesis library.
//!
//! Turns a unidirectional rewrite-rule specification into a forward and a
//! backward specification that keep a complement map of the information
//! each rule loses, so that edits on either side can be synchronized.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`synthesize()`] -- run the full pipeline
//! - [`SynthesisConfig`] -- designated cells, deletion patterns, defaults
//! - [`SynthError`] -- structural validation error type
//! - AST types: [`Term`], [`Rule`], [`Configuration`], [`Module`],
//!   [`Definition`]
//!
//! Individual pass entry functions are also re-exported for selective
//! pipeline execution.

pub mod ast;
pub mod builtins;
pub mod config;
pub mod error;
pub mod fresh;
pub mod pass1_extract;
pub mod pass2_complement;
pub mod pass3_transform;
pub mod pass4_priority;
pub mod pass5_assemble;
pub mod pass6_render;
pub mod synthesize;
pub mod visit;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{Attributes, CellContent, Configuration, Definition, Module, Rule, Sentence, Term};
pub use config::{DeletionPatterns, Direction, SynthesisConfig};
pub use error::{RuleRef, SynthError};
pub use pass2_complement::{Complement, RuleClass};
pub use synthesize::{RuleReport, Synthesis, SynthesisReport};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use pass1_extract::extract;
pub use pass2_complement::{analyze_rules, search_complement};
pub use pass3_transform::transform_rule;
pub use pass4_priority::{reverse_priorities, schedule};
pub use pass5_assemble::{add_holder_to_state, construct_definition, reverse_io};
pub use pass6_render::{apply_defaults, render_definition, render_term, unresolved_placeholders};
pub use synthesize::synthesize;
