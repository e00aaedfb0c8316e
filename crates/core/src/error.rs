use serde::Serialize;
use std::fmt;

/// Identity of an input rule, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleRef {
    /// Position of the rule in the extracted rule list (also its
    /// complement key prefix).
    pub index: usize,
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "rule #{} ({} line {})", self.index, self.module, line),
            None => write!(f, "rule #{} ({})", self.index, self.module),
        }
    }
}

/// A synthesis error. Every variant aborts the synthesis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthError {
    /// The specification declares more than one configuration.
    #[error("more than one configuration: first in module '{first}', again in module '{second}'")]
    MultipleConfigurations { first: String, second: String },

    #[error("no configuration declared in any module")]
    MissingConfiguration,

    /// The specification spans more than one source unit.
    #[error(
        "expected exactly one user-defined source, found {count}: {list}",
        count = .sources.len(),
        list = .sources.join(", ")
    )]
    MultipleSources { sources: Vec<String> },

    /// A configuration cell expected to hold a term holds nested cells
    /// (or the other way round).
    #[error("cell '{cell}' {expected}")]
    LeafExpected { cell: String, expected: String },

    #[error("cell '{cell}' not found in the configuration")]
    CellNotFound { cell: String },

    /// A rule body that must receive the holder cell is neither a cell
    /// nor a cell group.
    #[error("{rule}: body must be a cell or a cell group to receive the complement holder")]
    RuleBodyNotCells { rule: RuleRef },

    /// Generalization met a value that is neither a variable nor a token.
    #[error("{rule}: cannot generalize non-variable, non-token value '{found}'")]
    NonValueGeneralization { rule: RuleRef, found: String },

    #[error("main module '{module}' is not part of the definition")]
    MainModuleMissing { module: String },

    #[error("invalid deletion pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl SynthError {
    pub fn leaf_expected(cell: &str) -> Self {
        SynthError::LeafExpected {
            cell: cell.to_owned(),
            expected: "must hold a term, not nested cells".to_owned(),
        }
    }

    pub fn cells_expected(cell: &str) -> Self {
        SynthError::LeafExpected {
            cell: cell.to_owned(),
            expected: "must hold nested cells, not a term".to_owned(),
        }
    }

    /// Serialize to a JSON object carrying `kind`, the variant fields and
    /// the rendered `message`.
    pub fn to_json_value(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self)
            .unwrap_or_else(|_| serde_json::json!({ "kind": "unknown" }));
        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                "message".to_owned(),
                serde_json::Value::String(self.to_string()),
            );
        }
        value
    }
}
