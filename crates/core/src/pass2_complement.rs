//! Pass 2: Per-rule asymmetry analysis.
//!
//! For every cell of a rule body the values (variables and tokens) on
//! the left and right side of its rewrites are collected. Values seen on
//! only one side across the whole rule are information lost by executing
//! the rule in one direction; they become the rule's complement.

use crate::ast::{Rule, Term};
use crate::builtins::int_token;
use crate::pass1_extract::InModule;
use crate::visit::{self, Side};
use serde::Serialize;
use tracing::debug;

/// Group tag marking a rule as already bidirectional.
pub const EXEMPT_GROUP: &str = "bx";

/// Values of one cell, per side, in first-occurrence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellValues {
    pub cell: String,
    pub left: Vec<Term>,
    pub right: Vec<Term>,
}

/// Information a rule loses in each direction, plus its lookup key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Complement {
    /// Rule identity token followed by values present on both sides
    /// that are not paired within a single cell.
    pub common: Vec<Term>,
    /// Values present before the rewrite but not after.
    pub miss_r: Vec<Term>,
    /// Values present after the rewrite but not before.
    pub miss_l: Vec<Term>,
    /// Values present on both sides of the same cell.
    pub paired: Vec<Term>,
}

impl Complement {
    pub fn is_symmetric(&self) -> bool {
        self.miss_r.is_empty() && self.miss_l.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleClass {
    /// Tagged with the exempt group; copied verbatim both ways.
    Exempt,
    /// Loses nothing in either direction.
    Symmetric,
    /// Needs complement bookkeeping.
    Asymmetric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleAnalysis {
    pub index: usize,
    pub class: RuleClass,
    pub complement: Complement,
}

pub fn is_exempt(rule: &Rule) -> bool {
    rule.att.group.as_deref() == Some(EXEMPT_GROUP)
}

/// Analyze every rule; the rule's position is its identity.
pub fn analyze_rules(rules: &[InModule<Rule>]) -> Vec<RuleAnalysis> {
    rules
        .iter()
        .enumerate()
        .map(|(index, rule)| analyze_rule(&rule.item, index))
        .collect()
}

pub fn analyze_rule(rule: &Rule, index: usize) -> RuleAnalysis {
    if is_exempt(rule) {
        debug!(rule = index, "exempt from transformation");
        return RuleAnalysis {
            index,
            class: RuleClass::Exempt,
            complement: Complement::default(),
        };
    }
    let complement = search_complement(rule, index);
    let class = if complement.is_symmetric() {
        RuleClass::Symmetric
    } else {
        RuleClass::Asymmetric
    };
    debug!(
        rule = index,
        ?class,
        common = complement.common.len(),
        miss_r = complement.miss_r.len(),
        miss_l = complement.miss_l.len(),
        "analyzed rule"
    );
    RuleAnalysis {
        index,
        class,
        complement,
    }
}

/// Compute the complement of `rule`, keyed by `rule_id`.
pub fn search_complement(rule: &Rule, rule_id: usize) -> Complement {
    let cells = cell_values(&rule.body);

    let all_left = dedup(cells.iter().flat_map(|c| c.left.iter()));
    let all_right = dedup(cells.iter().flat_map(|c| c.right.iter()));

    let mut paired: Vec<Term> = Vec::new();
    for cell in &cells {
        for value in cell.left.iter().filter(|v| cell.right.contains(v)) {
            if !paired.contains(value) {
                paired.push(value.clone());
            }
        }
    }

    let miss_r: Vec<Term> = all_left
        .iter()
        .filter(|v| !all_right.contains(v))
        .cloned()
        .collect();
    let miss_l: Vec<Term> = all_right
        .iter()
        .filter(|v| !all_left.contains(v))
        .cloned()
        .collect();

    let mut common = vec![int_token(rule_id)];
    common.extend(
        all_left
            .iter()
            .filter(|v| all_right.contains(v) && !paired.contains(v))
            .cloned(),
    );

    Complement {
        common,
        miss_r,
        miss_l,
        paired,
    }
}

/// Per-cell values of a rule body, keyed by cell name.
///
/// Cells whose content is only a grouping of other cells are skipped;
/// their children are visited on their own. A later cell with the same
/// name replaces the earlier entry in place.
pub fn cell_values(body: &Term) -> Vec<CellValues> {
    let mut out: Vec<CellValues> = Vec::new();
    visit::walk(body, &mut |t| {
        let (Some(name), Some(content)) = (t.cell_name(), t.cell_content()) else {
            return;
        };
        if content.is_cell_group() || content.is_cell() {
            return;
        }
        let values = CellValues {
            cell: name.to_owned(),
            left: visit::values(&visit::project(content, Side::Left)),
            right: visit::values(&visit::project(content, Side::Right)),
        };
        match out.iter_mut().find(|c| c.cell == name) {
            Some(existing) => *existing = values,
            None => out.push(values),
        }
    });
    out
}

fn dedup<'a, I>(values: I) -> Vec<Term>
where
    I: Iterator<Item = &'a Term>,
{
    let mut out: Vec<Term> = Vec::new();
    for v in values {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Attributes;

    fn x() -> Term {
        Term::token("x", "Id")
    }

    fn empty() -> Term {
        Term::sequence(vec![])
    }

    #[test]
    fn token_kept_variable_dropped() {
        let rule = Rule::new(Term::cells(vec![
            Term::cell("A", Term::rewrite(x(), x())),
            Term::cell("B", Term::rewrite(Term::var("V"), empty())),
        ]));
        let c = search_complement(&rule, 0);
        assert_eq!(c.common, vec![int_token(0)]);
        assert_eq!(c.miss_r, vec![Term::var("V")]);
        assert!(c.miss_l.is_empty());
        assert_eq!(c.paired, vec![x()]);
        assert_eq!(analyze_rule(&rule, 0).class, RuleClass::Asymmetric);
    }

    #[test]
    fn same_variable_both_sides_is_symmetric() {
        let rule = Rule::new(Term::cells(vec![
            Term::cell("A", Term::rewrite(Term::var("V"), Term::apply("f", vec![Term::var("V")]))),
            Term::cell("B", Term::rewrite(Term::var("V"), Term::var("V"))),
        ]));
        let a = analyze_rule(&rule, 4);
        assert_eq!(a.class, RuleClass::Symmetric);
        assert_eq!(a.complement.common, vec![int_token(4)]);
    }

    #[test]
    fn values_moving_between_cells_form_the_common_key() {
        let rule = Rule::new(Term::cells(vec![
            Term::cell("in", Term::rewrite(Term::var("N"), empty())),
            Term::cell("out", Term::rewrite(empty(), Term::var("N"))),
            Term::cell("tmp", Term::rewrite(Term::var("T"), Term::var("U"))),
        ]));
        let c = search_complement(&rule, 2);
        assert_eq!(c.common, vec![int_token(2), Term::var("N")]);
        assert_eq!(c.miss_r, vec![Term::var("T")]);
        assert_eq!(c.miss_l, vec![Term::var("U")]);
        assert!(c.paired.is_empty());
    }

    #[test]
    fn cells_without_rewrites_count_on_both_sides() {
        let rule = Rule::new(Term::cells(vec![
            Term::cell("k", Term::rewrite(Term::var("E"), Term::var("Y"))),
            Term::cell("env", Term::var("E")),
        ]));
        let c = search_complement(&rule, 0);
        assert!(c.miss_r.is_empty());
        assert_eq!(c.miss_l, vec![Term::var("Y")]);
        assert_eq!(c.common, vec![int_token(0)]);
        assert_eq!(c.paired, vec![Term::var("E")]);
    }

    #[test]
    fn grouping_cells_are_skipped() {
        let body = Term::cell(
            "T",
            Term::cells(vec![
                Term::cell("k", Term::rewrite(Term::var("A"), Term::var("B"))),
                Term::cell("s", Term::var("S")),
            ]),
        );
        let cells = cell_values(&body);
        let names: Vec<&str> = cells.iter().map(|c| c.cell.as_str()).collect();
        assert_eq!(names, vec!["k", "s"]);
    }

    #[test]
    fn nested_rewrites_are_projected() {
        let body = Term::cell(
            "k",
            Term::apply(
                "pair",
                vec![Term::rewrite(Term::var("A"), Term::var("B")), Term::var("C")],
            ),
        );
        let cells = cell_values(&body);
        assert_eq!(cells[0].left, vec![Term::var("A"), Term::var("C")]);
        assert_eq!(cells[0].right, vec![Term::var("B"), Term::var("C")]);
    }

    #[test]
    fn exempt_rules_are_not_analyzed() {
        let rule = Rule::new(Term::cell("k", Term::rewrite(Term::var("A"), empty()))).with_att(
            Attributes {
                group: Some(EXEMPT_GROUP.to_owned()),
                ..Attributes::default()
            },
        );
        let a = analyze_rule(&rule, 1);
        assert_eq!(a.class, RuleClass::Exempt);
        assert!(a.complement.common.is_empty());
    }
}
