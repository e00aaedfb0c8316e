//! Synthesis configuration.
//!
//! The CLI loads this from TOML; library callers build it directly.
//!
//! # Example
//!
//! ```toml
//! input_cell = "k"
//! input_deletes = ["<kbx-complements-holder>.*</kbx-complements-holder>"]
//! output_cell = "persons"
//! output_sort = "Persons"
//! output_deletes = []
//!
//! [input_end_state]
//! node = "sequence"
//! items = []
//!
//! [defaults]
//! "?KbxGenTodo0" = "\"unknown\""
//! ```

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ast::Term;
use crate::error::SynthError;

/// Marker found in the `source` of modules shipped with the toolchain.
pub const DEFAULT_BUILTIN_MARKER: &str = "/include/kframework/builtin/";

/// Direction of a generated specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Input artifact to output artifact.
    Forward,
    /// Output artifact back to input artifact.
    Backward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Cell holding the input artifact in the forward direction.
    pub input_cell: String,
    /// Term placed in the input cell of the backward configuration.
    #[serde(default = "default_end_state")]
    pub input_end_state: Term,
    /// Patterns masking bookkeeping text in regenerated input artifacts.
    #[serde(default)]
    pub input_deletes: Vec<String>,
    /// Cell holding the output artifact in the forward direction.
    pub output_cell: String,
    /// Sort of the output artifact; the backward configuration casts
    /// its program variable to it.
    pub output_sort: String,
    /// Patterns masking bookkeeping text in produced output artifacts.
    #[serde(default)]
    pub output_deletes: Vec<String>,
    /// Placeholder name to replacement text for the rendered backward
    /// specification.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    /// Renumber backward priorities instead of keeping the originals.
    #[serde(default)]
    pub renumber_backward_priorities: bool,
    /// Modules whose source contains any of these markers are builtins
    /// and excluded from synthesis.
    #[serde(default = "default_builtin_markers")]
    pub builtin_source_markers: Vec<String>,
}

fn default_end_state() -> Term {
    Term::sequence(Vec::new())
}

fn default_builtin_markers() -> Vec<String> {
    vec![DEFAULT_BUILTIN_MARKER.to_owned()]
}

impl SynthesisConfig {
    pub fn new(
        input_cell: impl Into<String>,
        output_cell: impl Into<String>,
        output_sort: impl Into<String>,
    ) -> Self {
        SynthesisConfig {
            input_cell: input_cell.into(),
            input_end_state: default_end_state(),
            input_deletes: Vec::new(),
            output_cell: output_cell.into(),
            output_sort: output_sort.into(),
            output_deletes: Vec::new(),
            defaults: BTreeMap::new(),
            renumber_backward_priorities: false,
            builtin_source_markers: default_builtin_markers(),
        }
    }

    /// Check that every deletion pattern compiles.
    pub fn validate(&self) -> Result<(), SynthError> {
        DeletionPatterns::compile(&self.input_deletes)?;
        DeletionPatterns::compile(&self.output_deletes)?;
        Ok(())
    }

    /// Patterns that mask the artifact produced by running the given
    /// direction: forward runs produce output artifacts, backward runs
    /// regenerate input artifacts.
    pub fn deletes_for(&self, direction: Direction) -> Result<DeletionPatterns, SynthError> {
        match direction {
            Direction::Forward => DeletionPatterns::compile(&self.output_deletes),
            Direction::Backward => DeletionPatterns::compile(&self.input_deletes),
        }
    }

    pub fn is_builtin_source(&self, source: &str) -> bool {
        self.builtin_source_markers
            .iter()
            .any(|m| !m.is_empty() && source.contains(m.as_str()))
    }
}

/// A compiled set of deletion patterns.
#[derive(Debug, Clone, Default)]
pub struct DeletionPatterns {
    patterns: Vec<Regex>,
}

impl DeletionPatterns {
    pub fn compile(patterns: &[String]) -> Result<Self, SynthError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| SynthError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DeletionPatterns { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Remove every match of every pattern, then drop blank lines.
    pub fn apply(&self, text: &str) -> String {
        let mut text = text.to_owned();
        for pattern in &self.patterns {
            text = pattern.replace_all(&text, "").into_owned();
        }
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
