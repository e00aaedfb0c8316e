//! Shared term and definition types for the bidirectional synthesizer.
//!
//! These types are produced by an external specification parser (and
//! deserialized from its JSON output) and consumed throughout all
//! synthesis passes. They live here so that pass modules can import
//! them without depending on one another.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label of the pseudo-cell that groups sibling cells.
pub const CELLS: &str = "#cells";
/// Cell frame marking an open (`...`) side of a cell.
pub const DOTS: &str = "#dots";
/// Cell frame marking a closed side of a cell.
pub const NO_DOTS: &str = "#noDots";

// ──────────────────────────────────────────────
// Source locations
// ──────────────────────────────────────────────

/// Source span recorded by the parser. Used only for output ordering
/// and diagnostics.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Location {
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Sort key for an optional location; absent locations sort first.
    pub fn key(location: Option<Location>) -> Location {
        location.unwrap_or_default()
    }
}

// ──────────────────────────────────────────────
// Terms
// ──────────────────────────────────────────────

/// A term of the rewrite language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Term {
    Token {
        value: String,
        sort: String,
    },
    Variable {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<String>,
    },
    Apply {
        label: String,
        #[serde(default)]
        args: Vec<Term>,
    },
    /// Before/after pair. Never nests inside another rewrite.
    Rewrite { lhs: Box<Term>, rhs: Box<Term> },
    Sequence {
        #[serde(default)]
        items: Vec<Term>,
    },
}

impl Term {
    pub fn token(value: impl Into<String>, sort: impl Into<String>) -> Self {
        Term::Token {
            value: value.into(),
            sort: sort.into(),
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable {
            name: name.into(),
            sort: None,
        }
    }

    pub fn sorted_var(name: impl Into<String>, sort: impl Into<String>) -> Self {
        Term::Variable {
            name: name.into(),
            sort: Some(sort.into()),
        }
    }

    pub fn apply(label: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Apply {
            label: label.into(),
            args,
        }
    }

    /// A nullary application such as `.Map` or `.List`.
    pub fn constant(label: impl Into<String>) -> Self {
        Term::apply(label, Vec::new())
    }

    pub fn rewrite(lhs: Term, rhs: Term) -> Self {
        Term::Rewrite {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn sequence(items: Vec<Term>) -> Self {
        Term::Sequence { items }
    }

    /// A closed cell `<name> content </name>`.
    pub fn cell(name: &str, content: Term) -> Self {
        Term::framed_cell(name, content, false)
    }

    /// A cell open on both sides: `<name> ... content ... </name>`.
    pub fn open_cell(name: &str, content: Term) -> Self {
        Term::framed_cell(name, content, true)
    }

    fn framed_cell(name: &str, content: Term, open: bool) -> Self {
        let frame = if open { DOTS } else { NO_DOTS };
        Term::apply(
            format!("<{}>", name),
            vec![Term::constant(frame), content, Term::constant(frame)],
        )
    }

    /// Group sibling cells under the `#cells` pseudo-cell.
    pub fn cells(cells: Vec<Term>) -> Self {
        Term::apply(CELLS, cells)
    }

    pub fn is_cell(&self) -> bool {
        self.cell_name().is_some()
    }

    /// The cell name of a `<name>` application with three arguments.
    pub fn cell_name(&self) -> Option<&str> {
        match self {
            Term::Apply { label, args } if args.len() == 3 => label
                .strip_prefix('<')
                .and_then(|l| l.strip_suffix('>'))
                .filter(|l| !l.is_empty() && !l.starts_with('/')),
            _ => None,
        }
    }

    /// The content argument of a cell application.
    pub fn cell_content(&self) -> Option<&Term> {
        match self {
            Term::Apply { args, .. } if self.is_cell() => args.get(1),
            _ => None,
        }
    }

    pub fn is_cell_group(&self) -> bool {
        matches!(self, Term::Apply { label, .. } if label == CELLS)
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Term::Apply { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Variables and tokens are the only values the analyzer collects.
    pub fn is_value(&self) -> bool {
        matches!(self, Term::Token { .. } | Term::Variable { .. })
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::pass6_render::render_term(self))
    }
}

// ──────────────────────────────────────────────
// Attributes
// ──────────────────────────────────────────────

/// Rule attributes understood by the synthesizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub owise: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Attributes {
    /// No printed attribute is set. The location is source metadata and
    /// never printed.
    pub fn is_empty(&self) -> bool {
        self.priority.is_none() && !self.owise && self.group.is_none()
    }
}

// ──────────────────────────────────────────────
// Rules
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub body: Term,
    #[serde(default = "crate::builtins::true_term")]
    pub requires: Term,
    #[serde(default = "crate::builtins::true_term")]
    pub ensures: Term,
    #[serde(default)]
    pub att: Attributes,
}

impl Rule {
    pub fn new(body: Term) -> Self {
        Rule {
            body,
            requires: crate::builtins::true_term(),
            ensures: crate::builtins::true_term(),
            att: Attributes::default(),
        }
    }

    pub fn with_requires(mut self, requires: Term) -> Self {
        self.requires = requires;
        self
    }

    pub fn with_ensures(mut self, ensures: Term) -> Self {
        self.ensures = ensures;
        self
    }

    pub fn with_att(mut self, att: Attributes) -> Self {
        self.att = att;
        self
    }

    pub fn location(&self) -> Option<Location> {
        self.att.location
    }
}

// ──────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    /// `multiplicity="?"`
    Optional,
    /// `multiplicity="*"`
    Repeated,
}

impl Multiplicity {
    pub fn as_str(self) -> &'static str {
        match self {
            Multiplicity::Optional => "?",
            Multiplicity::Repeated => "*",
        }
    }
}

/// Content of a configuration cell: a leaf term or nested cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellContent {
    Term(Term),
    Cells(Vec<Configuration>),
}

/// The declared initial state of a specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    pub cell_name: String,
    pub content: CellContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplicity: Option<Multiplicity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Configuration {
    pub fn leaf(cell_name: impl Into<String>, content: Term) -> Self {
        Configuration {
            cell_name: cell_name.into(),
            content: CellContent::Term(content),
            multiplicity: None,
            element_type: None,
            location: None,
        }
    }

    pub fn node(cell_name: impl Into<String>, cells: Vec<Configuration>) -> Self {
        Configuration {
            cell_name: cell_name.into(),
            content: CellContent::Cells(cells),
            multiplicity: None,
            element_type: None,
            location: None,
        }
    }

    /// Copy of this cell with new content; all other fields are kept.
    pub fn with_content(&self, content: CellContent) -> Self {
        Configuration {
            cell_name: self.cell_name.clone(),
            content,
            multiplicity: self.multiplicity,
            element_type: self.element_type.clone(),
            location: self.location,
        }
    }

    /// Depth-first search for a cell by name.
    pub fn find(&self, name: &str) -> Option<&Configuration> {
        if self.cell_name == name {
            return Some(self);
        }
        match &self.content {
            CellContent::Cells(cells) => cells.iter().find_map(|c| c.find(name)),
            CellContent::Term(_) => None,
        }
    }
}

// ──────────────────────────────────────────────
// Sentences, modules, definitions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "sentence", rename_all = "snake_case")]
pub enum Sentence {
    /// Syntax declarations are opaque to the synthesizer and carried
    /// through as already-rendered text.
    Syntax {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
    Configuration(Configuration),
    Rule(Rule),
}

impl Sentence {
    pub fn location(&self) -> Option<Location> {
        match self {
            Sentence::Syntax { location, .. } => *location,
            Sentence::Configuration(c) => c.location,
            Sentence::Rule(r) => r.location(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
    /// Source unit the module was parsed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// A complete parsed specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Definition {
    pub main_module: String,
    pub modules: Vec<Module>,
    /// `requires "file"` clauses, carried through verbatim.
    #[serde(default)]
    pub requires: Vec<String>,
}

impl Definition {
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// All rules in module order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.modules
            .iter()
            .flat_map(|m| m.sentences.iter())
            .filter_map(|s| match s {
                Sentence::Rule(r) => Some(r),
                _ => None,
            })
    }

    pub fn configurations(&self) -> impl Iterator<Item = &Configuration> {
        self.modules
            .iter()
            .flat_map(|m| m.sentences.iter())
            .filter_map(|s| match s {
                Sentence::Configuration(c) => Some(c),
                _ => None,
            })
    }
}
