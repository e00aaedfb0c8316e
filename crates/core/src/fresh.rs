//! Fresh-name generation for one synthesis run.

use crate::ast::Term;

/// Prefix of variables introduced when generalizing tokens.
pub const GEN_VAR_PREFIX: &str = "KbxGenVar";
/// Prefix of unresolved placeholders in backward create rules.
pub const PLACEHOLDER_PREFIX: &str = "?KbxGenTodo";

/// Monotonic name counters owned by a single synthesis invocation.
///
/// Both counters only grow, so names never collide across the rules
/// processed by one run. A new run starts from zero again, which keeps
/// repeated runs over the same input byte-identical.
#[derive(Debug, Default)]
pub struct FreshNames {
    next_var: usize,
    next_placeholder: usize,
}

impl FreshNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh generalization variable of the given sort.
    pub fn variable(&mut self, sort: &str) -> Term {
        let name = format!("{}{}", GEN_VAR_PREFIX, self.next_var);
        self.next_var += 1;
        Term::sorted_var(name, sort)
    }

    /// A fresh unsorted placeholder hole.
    pub fn placeholder(&mut self) -> Term {
        let name = format!("{}{}", PLACEHOLDER_PREFIX, self.next_placeholder);
        self.next_placeholder += 1;
        Term::var(name)
    }

    pub fn placeholders_issued(&self) -> usize {
        self.next_placeholder
    }
}
