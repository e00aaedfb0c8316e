//! Pass 3: Rule transformation.
//!
//! Turns each analyzed rule into its forward and backward variants:
//! verbatim copies for exempt rules, the rule and its inverse for
//! symmetric rules, and CreateR/PutR/PutL/CreateL for asymmetric rules.

use crate::ast::{Rule, Term};
use crate::builtins::{
    and_bool, equals_k, list_empty, list_of, map_item, map_lookup_or_default, map_update, or_bool,
};
use crate::error::{RuleRef, SynthError};
use crate::fresh::FreshNames;
use crate::pass2_complement::{Complement, RuleAnalysis, RuleClass};
use crate::visit;
use serde::Serialize;
use tracing::debug;

/// Name of the cell holding the complement map.
pub const HOLDER_CELL: &str = "kbx-complements-holder";
/// Name of the variable bound to the whole complement map.
pub const COMPLEMENTS_VAR: &str = "KbxComplements";

pub fn complements_var() -> Term {
    Term::sorted_var(COMPLEMENTS_VAR, "Map")
}

/// Role of a generated rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// Exempt rule, copied unchanged.
    Verbatim,
    /// Symmetric rule, forward direction.
    Original,
    /// Symmetric rule, backward direction.
    Inverse,
    CreateR,
    PutR,
    PutL,
    CreateL,
}

impl VariantKind {
    pub fn is_create(self) -> bool {
        matches!(self, VariantKind::CreateR | VariantKind::CreateL)
    }

    pub fn is_put(self) -> bool {
        matches!(self, VariantKind::PutR | VariantKind::PutL)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub kind: VariantKind,
    pub rule: Rule,
}

/// Generated rules for one input rule, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Variants {
    pub forward: Vec<Variant>,
    pub backward: Vec<Variant>,
    /// Placeholders introduced into the backward create rule.
    pub placeholders: Vec<Term>,
}

/// How the holder cell entry is touched by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderUpdate {
    /// Insert (or confirm) the entry; guarded by the consistency check.
    Create,
    /// Replace the recorded right-missing values, keep the left ones.
    PutR,
    /// Replace the recorded left-missing values, keep the right ones.
    PutL,
}

/// A rule after its complement tokens have been generalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Generalized {
    pub rule: Rule,
    pub common: Vec<Term>,
    pub miss_r: Vec<Term>,
    pub miss_l: Vec<Term>,
}

pub fn transform_rule(
    rule: &Rule,
    analysis: &RuleAnalysis,
    fresh: &mut FreshNames,
    rule_ref: &RuleRef,
) -> Result<Variants, SynthError> {
    let variants = match analysis.class {
        RuleClass::Exempt => Variants {
            forward: vec![variant(VariantKind::Verbatim, rule.clone())],
            backward: vec![variant(VariantKind::Verbatim, rule.clone())],
            placeholders: Vec::new(),
        },
        RuleClass::Symmetric => Variants {
            forward: vec![variant(VariantKind::Original, rule.clone())],
            backward: vec![variant(VariantKind::Inverse, inverse_rule(rule))],
            placeholders: Vec::new(),
        },
        RuleClass::Asymmetric => transform_asymmetric(rule, &analysis.complement, fresh, rule_ref)?,
    };
    debug!(
        rule = rule_ref.index,
        forward = variants.forward.len(),
        backward = variants.backward.len(),
        "transformed rule"
    );
    Ok(variants)
}

fn variant(kind: VariantKind, rule: Rule) -> Variant {
    Variant { kind, rule }
}

fn transform_asymmetric(
    rule: &Rule,
    complement: &Complement,
    fresh: &mut FreshNames,
    rule_ref: &RuleRef,
) -> Result<Variants, SynthError> {
    let Complement {
        common,
        miss_r,
        miss_l,
        ..
    } = complement;

    // CreateR: the source rule recording its complement.
    let content = holder_content(HolderUpdate::Create, common, miss_r, miss_l, rule_ref)?;
    let create_r = add_holder_to_rule(rule, content, false, rule_ref)?;
    let create_r = add_consistency_guard(&create_r, common, miss_r, miss_l);

    // PutR: generalized rule updating a recorded complement.
    let generalized = generalize(rule, complement, fresh, rule_ref)?;
    let content = holder_content(
        HolderUpdate::PutR,
        &generalized.common,
        &generalized.miss_r,
        &generalized.miss_l,
        rule_ref,
    )?;
    let put_r = add_holder_to_rule(&generalized.rule, content, true, rule_ref)?;

    // PutL: inverse of the generalized rule.
    let inverse = inverse_rule(&generalized.rule);
    let content = holder_content(
        HolderUpdate::PutL,
        &generalized.common,
        &generalized.miss_r,
        &generalized.miss_l,
        rule_ref,
    )?;
    let put_l = add_holder_to_rule(&inverse, content, true, rule_ref)?;

    // CreateL: inverse with the right-missing values left as holes.
    let (holed, placeholders) = introduce_placeholders(&inverse, &generalized.miss_r, fresh);
    let content = holder_content(
        HolderUpdate::Create,
        &generalized.common,
        &placeholders,
        &generalized.miss_l,
        rule_ref,
    )?;
    let create_l = add_holder_to_rule(&holed, content, false, rule_ref)?;
    let create_l =
        add_consistency_guard(&create_l, &generalized.common, &placeholders, &generalized.miss_l);

    Ok(Variants {
        forward: vec![
            variant(VariantKind::CreateR, create_r),
            variant(VariantKind::PutR, put_r),
        ],
        backward: vec![
            variant(VariantKind::CreateL, create_l),
            variant(VariantKind::PutL, put_l),
        ],
        placeholders,
    })
}

/// Swap every rewrite in the body and exchange `requires` with `ensures`.
pub fn inverse_rule(rule: &Rule) -> Rule {
    Rule {
        body: visit::invert_rewrites(&rule.body),
        requires: rule.ensures.clone(),
        ensures: rule.requires.clone(),
        att: rule.att.clone(),
    }
}

/// Replace every complement token (except the rule identity) by a fresh
/// variable of the same sort, throughout body and guards.
pub fn generalize(
    rule: &Rule,
    complement: &Complement,
    fresh: &mut FreshNames,
    rule_ref: &RuleRef,
) -> Result<Generalized, SynthError> {
    let mut rule = rule.clone();
    let mut generalize_all = |values: &[Term], rule: &mut Rule| -> Result<Vec<Term>, SynthError> {
        let mut out = Vec::with_capacity(values.len());
        for value in values {
            match value {
                Term::Variable { .. } => out.push(value.clone()),
                Term::Token { sort, .. } => {
                    let var = fresh.variable(sort);
                    *rule = replace_in_rule(rule, |t| visit::replace_all(t, value, &var));
                    out.push(var);
                }
                other => {
                    return Err(SynthError::NonValueGeneralization {
                        rule: rule_ref.clone(),
                        found: other.to_string(),
                    })
                }
            }
        }
        Ok(out)
    };

    let (rule_id, rest) = match complement.common.split_first() {
        Some((id, rest)) => (vec![id.clone()], rest),
        None => (Vec::new(), &[][..]),
    };
    let mut common = rule_id;
    common.extend(generalize_all(rest, &mut rule)?);
    let miss_r = generalize_all(&complement.miss_r, &mut rule)?;
    let miss_l = generalize_all(&complement.miss_l, &mut rule)?;

    Ok(Generalized {
        rule,
        common,
        miss_r,
        miss_l,
    })
}

/// Replace each variable of `vars` by a fresh placeholder, throughout
/// body and guards. Returns the rewritten rule and the placeholders in
/// the order of `vars`.
pub fn introduce_placeholders(
    rule: &Rule,
    vars: &[Term],
    fresh: &mut FreshNames,
) -> (Rule, Vec<Term>) {
    let mut rule = rule.clone();
    let mut placeholders = Vec::with_capacity(vars.len());
    for var in vars {
        let hole = fresh.placeholder();
        if let Term::Variable { name, .. } = var {
            rule = replace_in_rule(&rule, |t| visit::replace_variable(t, name, &hole));
        }
        placeholders.push(hole);
    }
    (rule, placeholders)
}

fn replace_in_rule<F>(rule: &Rule, f: F) -> Rule
where
    F: Fn(&Term) -> Term,
{
    Rule {
        body: f(&rule.body),
        requires: f(&rule.requires),
        ensures: f(&rule.ensures),
        att: rule.att.clone(),
    }
}

/// The rewrite placed inside the holder cell.
pub fn holder_content(
    update: HolderUpdate,
    common: &[Term],
    miss_r: &[Term],
    miss_l: &[Term],
    rule_ref: &RuleRef,
) -> Result<Term, SynthError> {
    let key = list_of(common.to_vec());
    let value = complement_value(miss_r, miss_l);
    match update {
        HolderUpdate::Create => Ok(Term::rewrite(
            complements_var(),
            map_update(complements_var(), key, value),
        )),
        HolderUpdate::PutR => {
            let old = complement_value(&anonymous(miss_r, rule_ref)?, miss_l);
            Ok(Term::rewrite(map_item(key.clone(), old), map_item(key, value)))
        }
        HolderUpdate::PutL => {
            let old = complement_value(miss_r, &anonymous(miss_l, rule_ref)?);
            Ok(Term::rewrite(map_item(key.clone(), old), map_item(key, value)))
        }
    }
}

/// `ListItem(miss_r list) ListItem(miss_l list)`
fn complement_value(miss_r: &[Term], miss_l: &[Term]) -> Term {
    list_of(vec![list_of(miss_r.to_vec()), list_of(miss_l.to_vec())])
}

/// Anonymous (`_`-prefixed) copies of variables, matching any value.
fn anonymous(vars: &[Term], rule_ref: &RuleRef) -> Result<Vec<Term>, SynthError> {
    vars.iter()
        .map(|v| match v {
            Term::Variable { name, sort } => Ok(Term::Variable {
                name: format!("_{}", name),
                sort: sort.clone(),
            }),
            other => Err(SynthError::NonValueGeneralization {
                rule: rule_ref.clone(),
                found: other.to_string(),
            }),
        })
        .collect()
}

/// Append the holder cell to the rule body, wrapping a single cell into
/// a cell group first. `open` frames the holder with `...` on both sides.
pub fn add_holder_to_rule(
    rule: &Rule,
    content: Term,
    open: bool,
    rule_ref: &RuleRef,
) -> Result<Rule, SynthError> {
    let holder = if open {
        Term::open_cell(HOLDER_CELL, content)
    } else {
        Term::cell(HOLDER_CELL, content)
    };
    let body = if rule.body.is_cell() {
        Term::cells(vec![rule.body.clone(), holder])
    } else {
        match &rule.body {
            Term::Apply { label, args } if rule.body.is_cell_group() => {
                let mut args = args.clone();
                args.push(holder);
                Term::apply(label.clone(), args)
            }
            _ => {
                return Err(SynthError::RuleBodyNotCells {
                    rule: rule_ref.clone(),
                })
            }
        }
    };
    Ok(Rule {
        body,
        ..rule.clone()
    })
}

/// Conjoin to `requires` that the recorded complement for `common` is
/// absent or equal to the one being written.
pub fn add_consistency_guard(
    rule: &Rule,
    common: &[Term],
    miss_r: &[Term],
    miss_l: &[Term],
) -> Rule {
    let lookup = map_lookup_or_default(complements_var(), list_of(common.to_vec()), list_empty());
    let constraint = or_bool(vec![
        equals_k(lookup.clone(), list_empty()),
        equals_k(lookup, complement_value(miss_r, miss_l)),
    ]);
    Rule {
        requires: and_bool(vec![rule.requires.clone(), constraint]),
        ..rule.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{int_token, true_term, MAP_ITEM, MAP_UPDATE, OR_BOOL};
    use crate::pass2_complement::analyze_rule;

    fn rule_ref() -> RuleRef {
        RuleRef {
            index: 0,
            module: "M".to_owned(),
            line: None,
        }
    }

    fn x() -> Term {
        Term::token("x", "Id")
    }

    /// `<A> x => x </A> <B> V => .K </B>`
    fn lossy_rule() -> Rule {
        Rule::new(Term::cells(vec![
            Term::cell("A", Term::rewrite(x(), x())),
            Term::cell("B", Term::rewrite(Term::var("V"), Term::sequence(vec![]))),
        ]))
    }

    /// `<A> x => x </A> <B> V => .K </B> <C> .K => W </C>`: loses a value
    /// in each direction.
    fn two_way_lossy_rule() -> Rule {
        Rule::new(Term::cells(vec![
            Term::cell("A", Term::rewrite(x(), x())),
            Term::cell("B", Term::rewrite(Term::var("V"), Term::sequence(vec![]))),
            Term::cell("C", Term::rewrite(Term::sequence(vec![]), Term::var("W"))),
        ]))
    }

    /// Body cells without the trailing holder.
    fn cells_without_holder(rule: &Rule) -> &[Term] {
        match &rule.body {
            Term::Apply { args, .. } => &args[..args.len() - 1],
            _ => panic!("expected cell group"),
        }
    }

    fn holder_of(rule: &Rule) -> &Term {
        match &rule.body {
            Term::Apply { args, .. } => args.last().unwrap(),
            _ => panic!("expected cell group"),
        }
    }

    #[test]
    fn inverse_is_an_involution() {
        let rule = Rule::new(Term::cell("k", Term::rewrite(Term::var("A"), Term::var("B"))))
            .with_requires(Term::var("R"))
            .with_ensures(Term::var("E"));
        let inv = inverse_rule(&rule);
        assert_eq!(inv.requires, Term::var("E"));
        assert_eq!(inv.ensures, Term::var("R"));
        assert_eq!(
            inv.body,
            Term::cell("k", Term::rewrite(Term::var("B"), Term::var("A")))
        );
        assert_eq!(inverse_rule(&inv), rule);
    }

    #[test]
    fn symmetric_rule_yields_original_and_inverse() {
        let rule = Rule::new(Term::cell("k", Term::rewrite(Term::var("V"), Term::var("V"))));
        let analysis = analyze_rule(&rule, 0);
        let v = transform_rule(&rule, &analysis, &mut FreshNames::new(), &rule_ref()).unwrap();
        assert_eq!(v.forward.len(), 1);
        assert_eq!(v.backward.len(), 1);
        assert_eq!(v.forward[0].rule, rule);
        assert_eq!(v.backward[0].kind, VariantKind::Inverse);
        assert_eq!(v.backward[0].rule, inverse_rule(&rule));
    }

    #[test]
    fn asymmetric_rule_yields_four_variants() {
        let rule = lossy_rule();
        let analysis = analyze_rule(&rule, 0);
        let v = transform_rule(&rule, &analysis, &mut FreshNames::new(), &rule_ref()).unwrap();
        let kinds: Vec<_> = v
            .forward
            .iter()
            .chain(v.backward.iter())
            .map(|v| v.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                VariantKind::CreateR,
                VariantKind::PutR,
                VariantKind::CreateL,
                VariantKind::PutL
            ]
        );
        assert_eq!(v.placeholders, vec![Term::var("?KbxGenTodo0")]);
    }

    #[test]
    fn create_r_guard_compares_against_absent() {
        let rule = lossy_rule();
        let analysis = analyze_rule(&rule, 0);
        let v = transform_rule(&rule, &analysis, &mut FreshNames::new(), &rule_ref()).unwrap();
        let create_r = &v.forward[0].rule;

        let key = list_of(vec![int_token(0)]);
        let lookup = map_lookup_or_default(complements_var(), key, list_empty());
        let expected_value = list_of(vec![list_of(vec![Term::var("V")]), list_empty()]);
        assert_eq!(
            create_r.requires,
            Term::apply(
                OR_BOOL,
                vec![
                    equals_k(lookup.clone(), list_empty()),
                    equals_k(lookup, expected_value)
                ]
            )
        );

        let holder = holder_of(create_r);
        assert_eq!(holder.cell_name(), Some(HOLDER_CELL));
        match holder.cell_content() {
            Some(Term::Rewrite { lhs, rhs }) => {
                assert_eq!(**lhs, complements_var());
                assert_eq!(rhs.label(), Some(MAP_UPDATE));
            }
            other => panic!("expected holder rewrite, got {:?}", other),
        }
    }

    #[test]
    fn put_r_keeps_left_missing_and_matches_any_right_missing() {
        let rule = lossy_rule();
        let analysis = analyze_rule(&rule, 0);
        let v = transform_rule(&rule, &analysis, &mut FreshNames::new(), &rule_ref()).unwrap();
        let put_r = &v.forward[1].rule;
        assert_eq!(put_r.requires, true_term());
        let holder = holder_of(put_r);
        assert_eq!(holder, &Term::open_cell(HOLDER_CELL, holder.cell_content().unwrap().clone()));
        match holder.cell_content() {
            Some(Term::Rewrite { lhs, rhs }) => {
                assert_eq!(lhs.label(), Some(MAP_ITEM));
                let key = list_of(vec![int_token(0)]);
                assert_eq!(
                    **lhs,
                    map_item(
                        key.clone(),
                        list_of(vec![list_of(vec![Term::var("_V")]), list_empty()])
                    )
                );
                assert_eq!(
                    **rhs,
                    map_item(key, list_of(vec![list_of(vec![Term::var("V")]), list_empty()]))
                );
            }
            other => panic!("expected holder rewrite, got {:?}", other),
        }
    }

    #[test]
    fn put_l_keeps_right_missing_and_matches_any_left_missing() {
        let rule = two_way_lossy_rule();
        let analysis = analyze_rule(&rule, 0);
        assert_eq!(analysis.complement.miss_r, vec![Term::var("V")]);
        assert_eq!(analysis.complement.miss_l, vec![Term::var("W")]);
        let v = transform_rule(&rule, &analysis, &mut FreshNames::new(), &rule_ref()).unwrap();
        assert_eq!(v.backward[1].kind, VariantKind::PutL);
        let put_l = &v.backward[1].rule;

        let inverse = inverse_rule(&rule);
        match &inverse.body {
            Term::Apply { args, .. } => assert_eq!(cells_without_holder(put_l), &args[..]),
            _ => panic!("expected cell group"),
        }
        assert_eq!(put_l.requires, inverse.requires);

        let holder = holder_of(put_l);
        let content = holder.cell_content().unwrap().clone();
        assert_eq!(holder, &Term::open_cell(HOLDER_CELL, content));
        let key = list_of(vec![int_token(0)]);
        match holder.cell_content() {
            Some(Term::Rewrite { lhs, rhs }) => {
                assert_eq!(
                    **lhs,
                    map_item(
                        key.clone(),
                        list_of(vec![
                            list_of(vec![Term::var("V")]),
                            list_of(vec![Term::var("_W")])
                        ])
                    )
                );
                assert_eq!(
                    **rhs,
                    map_item(
                        key,
                        list_of(vec![
                            list_of(vec![Term::var("V")]),
                            list_of(vec![Term::var("W")])
                        ])
                    )
                );
            }
            other => panic!("expected holder rewrite, got {:?}", other),
        }
    }

    #[test]
    fn create_l_guard_uses_placeholders() {
        let rule = two_way_lossy_rule();
        let analysis = analyze_rule(&rule, 0);
        let v = transform_rule(&rule, &analysis, &mut FreshNames::new(), &rule_ref()).unwrap();
        let create_l = &v.backward[0].rule;
        let hole = Term::var("?KbxGenTodo0");
        assert_eq!(v.placeholders, vec![hole.clone()]);

        let key = list_of(vec![int_token(0)]);
        let lookup = map_lookup_or_default(complements_var(), key.clone(), list_empty());
        let recorded = list_of(vec![
            list_of(vec![hole.clone()]),
            list_of(vec![Term::var("W")]),
        ]);
        assert_eq!(
            create_l.requires,
            Term::apply(
                OR_BOOL,
                vec![
                    equals_k(lookup.clone(), list_empty()),
                    equals_k(lookup, recorded.clone())
                ]
            )
        );

        let holder = holder_of(create_l);
        assert_eq!(holder, &Term::cell(HOLDER_CELL, holder.cell_content().unwrap().clone()));
        assert_eq!(
            holder.cell_content(),
            Some(&Term::rewrite(
                complements_var(),
                map_update(complements_var(), key, recorded)
            ))
        );
    }

    #[test]
    fn create_l_replaces_right_missing_with_placeholder() {
        let rule = lossy_rule();
        let analysis = analyze_rule(&rule, 0);
        let v = transform_rule(&rule, &analysis, &mut FreshNames::new(), &rule_ref()).unwrap();
        let create_l = &v.backward[0].rule;
        let hole = Term::var("?KbxGenTodo0");
        let body_vars = visit::variable_occurrences(&create_l.body);
        assert!(body_vars.contains(&hole));
        assert!(!body_vars.contains(&Term::var("V")));
        // Backward direction: `.K => ?KbxGenTodo0` in cell B.
        match &create_l.body {
            Term::Apply { args, .. } => assert_eq!(
                args[1],
                Term::cell("B", Term::rewrite(Term::sequence(vec![]), hole))
            ),
            _ => panic!("expected cell group"),
        }
    }

    #[test]
    fn generalize_replaces_complement_tokens_everywhere() {
        // `<in> 1 => .K </in>` with `1` also in the guard.
        let one = Term::token("1", "Int");
        let rule = Rule::new(Term::cells(vec![Term::cell(
            "in",
            Term::rewrite(one.clone(), Term::sequence(vec![])),
        )]))
        .with_requires(equals_k(Term::var("Z"), one.clone()));
        let c = analyze_rule(&rule, 7).complement;
        assert_eq!(c.miss_r, vec![one.clone()]);
        let mut fresh = FreshNames::new();
        let g = generalize(&rule, &c, &mut fresh, &rule_ref()).unwrap();
        let var = Term::sorted_var("KbxGenVar0", "Int");
        assert_eq!(g.miss_r, vec![var.clone()]);
        assert_eq!(g.common, vec![int_token(7)]);
        assert!(visit::token_occurrences(&g.rule.body).is_empty());
        assert_eq!(g.rule.requires, equals_k(Term::var("Z"), var));
    }

    #[test]
    fn generalize_rejects_non_values() {
        let c = Complement {
            common: vec![int_token(0)],
            miss_r: vec![Term::apply("f", vec![])],
            miss_l: vec![],
            paired: vec![],
        };
        let err = generalize(&lossy_rule(), &c, &mut FreshNames::new(), &rule_ref()).unwrap_err();
        assert!(matches!(err, SynthError::NonValueGeneralization { .. }));
    }

    #[test]
    fn holder_requires_cells() {
        let rule = Rule::new(Term::var("X"));
        let err = add_holder_to_rule(&rule, Term::var("C"), false, &rule_ref()).unwrap_err();
        assert!(matches!(err, SynthError::RuleBodyNotCells { .. }));
    }

    #[test]
    fn single_cell_body_is_wrapped() {
        let rule = Rule::new(Term::cell("k", Term::var("X")));
        let r = add_holder_to_rule(&rule, Term::var("C"), true, &rule_ref()).unwrap();
        assert!(r.body.is_cell_group());
        assert_eq!(
            r.body,
            Term::cells(vec![
                Term::cell("k", Term::var("X")),
                Term::open_cell(HOLDER_CELL, Term::var("C"))
            ])
        );
    }

    #[test]
    fn guard_keeps_existing_requires() {
        let rule = Rule::new(Term::cell("k", Term::var("X"))).with_requires(Term::var("R"));
        let guarded = add_consistency_guard(&rule, &[int_token(0)], &[], &[]);
        assert_eq!(guarded.requires.label(), Some(crate::builtins::AND_BOOL));
    }
}
