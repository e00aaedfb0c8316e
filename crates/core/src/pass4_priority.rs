//! Pass 4: Priority scheduling of generated rules.
//!
//! Lower priority values fire first; `owise` rules fire only when no
//! other rule matches. Put variants keep an explicit priority so they
//! are preferred over Create variants, which become `owise`.

use crate::ast::Rule;
use crate::pass3_transform::{VariantKind, Variants};

/// Priority of a rule without an explicit priority attribute.
pub const DEFAULT_PRIORITY: u32 = 50;
/// Explicit priority given to Put variants of `owise` rules.
pub const OWISE_PUT_PRIORITY: u32 = 200;

const RENUMBER_START: u32 = 30;
const RENUMBER_STEP: u32 = 2;
/// Band reserved by the execution backend for builtin disambiguation.
const RESERVED_BAND: std::ops::Range<u32> = 50..200;

/// Create variants become `owise` without a priority. Other variants
/// derived from an `owise` rule get [`OWISE_PUT_PRIORITY`] instead.
pub fn new_priority(rule: &Rule, is_create: bool) -> Rule {
    let mut rule = rule.clone();
    if is_create {
        rule.att.priority = None;
        rule.att.owise = true;
    } else if rule.att.owise {
        rule.att.owise = false;
        rule.att.priority = Some(OWISE_PUT_PRIORITY);
    }
    rule
}

/// Set an explicit priority, dropping `owise`.
pub fn change_priority(rule: &Rule, priority: u32) -> Rule {
    let mut rule = rule.clone();
    rule.att.owise = false;
    rule.att.priority = Some(priority);
    rule
}

/// Priorities for the backward direction, one per input rule.
///
/// Rules are ranked from the highest original priority value to the
/// lowest, so the ordering is reversed. Each distinct original value
/// gets the next step, equal values share one, and the reserved band is
/// skipped.
pub fn reverse_priorities<'a, I>(rules: I) -> Vec<u32>
where
    I: IntoIterator<Item = &'a Rule>,
{
    let mut ranked: Vec<(usize, u32)> = rules
        .into_iter()
        .enumerate()
        .map(|(idx, r)| (idx, r.att.priority.unwrap_or(DEFAULT_PRIORITY)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut assigned = Vec::with_capacity(ranked.len());
    let mut current = RENUMBER_START;
    let mut previous = ranked.first().map(|(_, p)| *p);
    for (idx, priority) in ranked {
        if Some(priority) != previous {
            previous = Some(priority);
            current += RENUMBER_STEP;
            if RESERVED_BAND.contains(&current) {
                current += RESERVED_BAND.end - RESERVED_BAND.start;
            }
        }
        assigned.push((idx, current));
    }
    assigned.sort_by_key(|(idx, _)| *idx);
    assigned.into_iter().map(|(_, p)| p).collect()
}

/// Stamp priorities on the variants of one rule.
///
/// `backward_priority` is the renumbered priority for this rule when
/// backward renumbering is enabled; it applies to the inverse of a
/// symmetric rule and to PutL.
pub fn schedule(variants: &mut Variants, backward_priority: Option<u32>) {
    for variant in variants.forward.iter_mut().chain(variants.backward.iter_mut()) {
        variant.rule = match variant.kind {
            VariantKind::CreateR | VariantKind::CreateL => new_priority(&variant.rule, true),
            VariantKind::PutR => new_priority(&variant.rule, false),
            VariantKind::PutL => match backward_priority {
                Some(p) => change_priority(&variant.rule, p),
                None => new_priority(&variant.rule, false),
            },
            VariantKind::Inverse => match backward_priority {
                Some(p) => change_priority(&variant.rule, p),
                None => continue,
            },
            VariantKind::Verbatim | VariantKind::Original => continue,
        };
    }
}
