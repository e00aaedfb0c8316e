//! Structural traversals over [`Term`].
//!
//! Every rewriting helper here is a total structural map that returns a
//! new term; inputs are never mutated.

use crate::ast::Term;

/// Which side of a rewrite to keep when projecting a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Rebuild `term` bottom-up, applying `f` to every node after its
/// children have been rebuilt.
pub fn map_bottom_up<F>(term: &Term, f: &mut F) -> Term
where
    F: FnMut(Term) -> Term,
{
    let rebuilt = match term {
        Term::Token { .. } | Term::Variable { .. } => term.clone(),
        Term::Apply { label, args } => Term::Apply {
            label: label.clone(),
            args: args.iter().map(|a| map_bottom_up(a, f)).collect(),
        },
        Term::Rewrite { lhs, rhs } => Term::Rewrite {
            lhs: Box::new(map_bottom_up(lhs, f)),
            rhs: Box::new(map_bottom_up(rhs, f)),
        },
        Term::Sequence { items } => Term::Sequence {
            items: items.iter().map(|i| map_bottom_up(i, f)).collect(),
        },
    };
    f(rebuilt)
}

/// Visit every node in pre-order, left to right.
pub fn walk<'a, F>(term: &'a Term, f: &mut F)
where
    F: FnMut(&'a Term),
{
    f(term);
    match term {
        Term::Token { .. } | Term::Variable { .. } => {}
        Term::Apply { args, .. } => args.iter().for_each(|a| walk(a, f)),
        Term::Rewrite { lhs, rhs } => {
            walk(lhs, f);
            walk(rhs, f);
        }
        Term::Sequence { items } => items.iter().for_each(|i| walk(i, f)),
    }
}

/// Replace every node structurally equal to `from` with `to`.
pub fn replace_all(term: &Term, from: &Term, to: &Term) -> Term {
    map_bottom_up(term, &mut |t| if t == *from { to.clone() } else { t })
}

/// Replace every variable named `name` (whatever its sort) with `to`.
pub fn replace_variable(term: &Term, name: &str, to: &Term) -> Term {
    map_bottom_up(term, &mut |t| {
        if matches!(&t, Term::Variable { name: n, .. } if n == name) {
            to.clone()
        } else {
            t
        }
    })
}

/// Swap the sides of every rewrite.
pub fn invert_rewrites(term: &Term) -> Term {
    map_bottom_up(term, &mut |t| match t {
        Term::Rewrite { lhs, rhs } => Term::Rewrite { lhs: rhs, rhs: lhs },
        other => other,
    })
}

/// Replace every rewrite by one of its sides.
pub fn project(term: &Term, side: Side) -> Term {
    map_bottom_up(term, &mut |t| match t {
        Term::Rewrite { lhs, rhs } => match side {
            Side::Left => *lhs,
            Side::Right => *rhs,
        },
        other => other,
    })
}

pub fn contains_rewrite(term: &Term) -> bool {
    let mut found = false;
    walk(term, &mut |t| found |= matches!(t, Term::Rewrite { .. }));
    found
}

/// First occurrence of each distinct variable name, in pre-order.
pub fn variable_occurrences(term: &Term) -> Vec<Term> {
    let mut seen: Vec<&str> = Vec::new();
    let mut out = Vec::new();
    walk(term, &mut |t| {
        if let Term::Variable { name, .. } = t {
            if !seen.contains(&name.as_str()) {
                seen.push(name);
                out.push(t.clone());
            }
        }
    });
    out
}

/// First occurrence of each distinct token value, in pre-order.
pub fn token_occurrences(term: &Term) -> Vec<Term> {
    let mut seen: Vec<&str> = Vec::new();
    let mut out = Vec::new();
    walk(term, &mut |t| {
        if let Term::Token { value, .. } = t {
            if !seen.contains(&value.as_str()) {
                seen.push(value);
                out.push(t.clone());
            }
        }
    });
    out
}

/// Variables first, then tokens, each in first-occurrence order.
pub fn values(term: &Term) -> Vec<Term> {
    let mut out = variable_occurrences(term);
    out.extend(token_occurrences(term));
    out
}
