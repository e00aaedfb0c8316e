//! Builtin labels and term constructors used by the generated rules.

use crate::ast::Term;

pub const LIST_UNIT: &str = ".List";
pub const LIST_ITEM: &str = "ListItem";
pub const LIST_CONCAT: &str = "_List_";
pub const MAP_UNIT: &str = ".Map";
pub const MAP_ITEM: &str = "_|->_";
pub const MAP_UPDATE: &str = "Map:update";
pub const MAP_LOOKUP_OR_DEFAULT: &str = "_[_]orDefault__MAP_KItem_Map_KItem_KItem";
pub const EQUALS_K: &str = "_==K_";
pub const AND_BOOL: &str = "_andBool_";
pub const OR_BOOL: &str = "_orBool_";
pub const SEMANTIC_CAST: &str = "#SemanticCastTo";

/// Module every generated definition must import for `Map`/`List`/`Int`.
pub const DOMAINS_MODULE: &str = "DOMAINS";

pub fn true_term() -> Term {
    Term::token("true", "Bool")
}

pub fn false_term() -> Term {
    Term::token("false", "Bool")
}

pub fn int_token(value: usize) -> Term {
    Term::token(value.to_string(), "Int")
}

pub fn list_empty() -> Term {
    Term::constant(LIST_UNIT)
}

pub fn map_empty() -> Term {
    Term::constant(MAP_UNIT)
}

/// `ListItem(a) ListItem(b) ...`, or `.List` when empty.
pub fn list_of<I>(items: I) -> Term
where
    I: IntoIterator<Item = Term>,
{
    let items = items
        .into_iter()
        .map(|t| Term::apply(LIST_ITEM, vec![t]))
        .collect();
    build_assoc(list_empty(), LIST_CONCAT, items)
}

pub fn map_item(key: Term, value: Term) -> Term {
    Term::apply(MAP_ITEM, vec![key, value])
}

pub fn map_update(map: Term, key: Term, value: Term) -> Term {
    Term::apply(MAP_UPDATE, vec![map, key, value])
}

pub fn map_lookup_or_default(map: Term, key: Term, default: Term) -> Term {
    Term::apply(MAP_LOOKUP_OR_DEFAULT, vec![map, key, default])
}

pub fn equals_k(lhs: Term, rhs: Term) -> Term {
    Term::apply(EQUALS_K, vec![lhs, rhs])
}

/// Conjunction with `true` operands dropped.
pub fn and_bool<I>(items: I) -> Term
where
    I: IntoIterator<Item = Term>,
{
    build_assoc(true_term(), AND_BOOL, items.into_iter().collect())
}

/// Disjunction with `false` operands dropped.
pub fn or_bool<I>(items: I) -> Term
where
    I: IntoIterator<Item = Term>,
{
    build_assoc(false_term(), OR_BOOL, items.into_iter().collect())
}

/// `#SemanticCastTo<sort>(term)`, rendered as `term:sort`.
pub fn semantic_cast(sort: &str, term: Term) -> Term {
    Term::apply(format!("{}{}", SEMANTIC_CAST, sort), vec![term])
}

/// Right-nested fold of `items` under `label`, skipping `unit`.
fn build_assoc(unit: Term, label: &str, items: Vec<Term>) -> Term {
    let mut items: Vec<Term> = items.into_iter().filter(|t| *t != unit).collect();
    let Some(mut acc) = items.pop() else {
        return unit;
    };
    while let Some(item) = items.pop() {
        acc = Term::apply(label, vec![item, acc]);
    }
    acc
}
