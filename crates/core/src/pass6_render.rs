//! Pass 6: Concrete text rendering and post-processing of rendered output.
//!
//! Terms and definitions are printed in K-style concrete syntax. Rendered
//! backward definitions may still contain placeholders; these are filled
//! from caller-supplied defaults by exact-name text substitution.

use crate::ast::*;
use crate::builtins::{
    true_term, LIST_CONCAT, MAP_LOOKUP_OR_DEFAULT, MAP_UPDATE, SEMANTIC_CAST,
};
use crate::fresh::PLACEHOLDER_PREFIX;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::sync::OnceLock;

const INDENT: &str = "  ";

// ──────────────────────────────────────────────
// Terms
// ──────────────────────────────────────────────

pub fn render_term(term: &Term) -> String {
    let mut out = String::new();
    write_term(&mut out, term, false);
    out
}

/// `nested` is set for arguments of operators printed without
/// parentheses, which must then bracket their own mixfix output.
fn write_term(out: &mut String, term: &Term, nested: bool) {
    match term {
        Term::Token { value, .. } => out.push_str(value),
        Term::Variable { name, sort } => {
            out.push_str(name);
            if let Some(sort) = sort {
                out.push(':');
                out.push_str(sort);
            }
        }
        Term::Rewrite { lhs, rhs } => {
            out.push('(');
            write_term(out, lhs, false);
            out.push_str(" => ");
            write_term(out, rhs, false);
            out.push(')');
        }
        Term::Sequence { items } => {
            if items.is_empty() {
                out.push_str(".K");
                return;
            }
            if nested && items.len() > 1 {
                out.push('(');
            }
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(" ~> ");
                }
                write_term(out, item, true);
            }
            if nested && items.len() > 1 {
                out.push(')');
            }
        }
        Term::Apply { label, args } => write_apply(out, term, label, args, nested),
    }
}

fn write_apply(out: &mut String, term: &Term, label: &str, args: &[Term], nested: bool) {
    if let (Some(name), Some(content)) = (term.cell_name(), term.cell_content()) {
        out.push('<');
        out.push_str(name);
        out.push_str("> ");
        if is_open_frame(&args[0]) {
            out.push_str("... ");
        }
        write_term(out, content, false);
        if is_open_frame(&args[2]) {
            out.push_str(" ...");
        }
        out.push_str(" </");
        out.push_str(name);
        out.push('>');
        return;
    }
    if label == CELLS {
        for (i, cell) in args.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            write_term(out, cell, false);
        }
        return;
    }
    if let (Some(sort), [arg]) = (label.strip_prefix(SEMANTIC_CAST), args) {
        write_term(out, arg, true);
        out.push(':');
        out.push_str(sort);
        return;
    }
    match (label, args) {
        (MAP_UPDATE, [map, key, value]) => {
            write_term(out, map, true);
            out.push('[');
            write_term(out, key, false);
            out.push_str(" <- ");
            write_term(out, value, false);
            out.push(']');
        }
        (MAP_LOOKUP_OR_DEFAULT, [map, key, default]) => {
            if nested {
                out.push('(');
            }
            write_term(out, map, true);
            out.push('[');
            write_term(out, key, false);
            out.push_str("] orDefault ");
            write_term(out, default, true);
            if nested {
                out.push(')');
            }
        }
        (LIST_CONCAT, [head, tail]) => {
            if nested {
                out.push('(');
            }
            write_list_operand(out, head);
            out.push(' ');
            write_list_operand(out, tail);
            if nested {
                out.push(')');
            }
        }
        _ if is_mixfix(label, args.len()) => write_mixfix(out, label, args, nested),
        (_, []) if label.starts_with('.') || label.starts_with('#') => out.push_str(label),
        _ => {
            out.push_str(label);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_term(out, arg, false);
            }
            out.push(')');
        }
    }
}

/// List concatenation is juxtaposition and associative, so nested
/// concatenations print flat.
fn write_list_operand(out: &mut String, operand: &Term) {
    let flat = operand.label() == Some(LIST_CONCAT);
    write_term(out, operand, !flat);
}

fn is_open_frame(frame: &Term) -> bool {
    frame.label() == Some(DOTS)
}

/// Labels such as `_|->_` carry one `_` hole per argument.
fn is_mixfix(label: &str, arity: usize) -> bool {
    arity > 0 && label.matches('_').count() == arity
}

fn write_mixfix(out: &mut String, label: &str, args: &[Term], nested: bool) {
    if nested {
        out.push('(');
    }
    let mut parts: Vec<String> = Vec::new();
    let mut args = args.iter();
    for (i, piece) in label.split('_').enumerate() {
        if i > 0 {
            if let Some(arg) = args.next() {
                let mut s = String::new();
                write_term(&mut s, arg, true);
                parts.push(s);
            }
        }
        if !piece.is_empty() {
            parts.push(piece.to_owned());
        }
    }
    out.push_str(&parts.join(" "));
    if nested {
        out.push(')');
    }
}

// ──────────────────────────────────────────────
// Definitions
// ──────────────────────────────────────────────

pub fn render_definition(definition: &Definition) -> String {
    let mut out = String::new();
    for file in &definition.requires {
        let _ = writeln!(out, "requires \"{}\"", file);
    }
    if !definition.requires.is_empty() {
        out.push('\n');
    }
    for (i, module) in definition.modules.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_module(&mut out, module);
    }
    out
}

fn render_module(out: &mut String, module: &Module) {
    let _ = writeln!(out, "module {}", module.name);
    for import in &module.imports {
        let _ = writeln!(out, "{}imports {}", INDENT, import);
    }
    for sentence in &module.sentences {
        out.push('\n');
        match sentence {
            Sentence::Syntax { text, .. } => {
                for line in text.lines() {
                    let _ = writeln!(out, "{}{}", INDENT, line);
                }
            }
            Sentence::Configuration(c) => render_configuration(out, c),
            Sentence::Rule(r) => render_rule(out, r),
        }
    }
    out.push_str("endmodule\n");
}

pub fn render_configuration(out: &mut String, configuration: &Configuration) {
    let _ = write!(out, "{}configuration", INDENT);
    render_cell(out, configuration, 2);
    out.push('\n');
}

fn render_cell(out: &mut String, cell: &Configuration, depth: usize) {
    let pad = INDENT.repeat(depth);
    let _ = write!(out, "\n{}<{}", pad, cell.cell_name);
    if let Some(m) = cell.multiplicity {
        let _ = write!(out, " multiplicity=\"{}\"", m.as_str());
    }
    if let Some(t) = &cell.element_type {
        let _ = write!(out, " type=\"{}\"", t);
    }
    out.push('>');
    match &cell.content {
        CellContent::Term(t) => {
            let _ = write!(out, " {} </{}>", render_term(t), cell.cell_name);
        }
        CellContent::Cells(children) => {
            for child in children {
                render_cell(out, child, depth + 1);
            }
            let _ = write!(out, "\n{}</{}>", pad, cell.cell_name);
        }
    }
}

pub fn render_rule(out: &mut String, rule: &Rule) {
    let _ = writeln!(out, "{}rule {}", INDENT, render_term(&rule.body));
    let pad = INDENT.repeat(2);
    if rule.requires != true_term() {
        let _ = writeln!(out, "{}requires {}", pad, render_term(&rule.requires));
    }
    if rule.ensures != true_term() {
        let _ = writeln!(out, "{}ensures {}", pad, render_term(&rule.ensures));
    }
    if !rule.att.is_empty() {
        let _ = writeln!(out, "{}[{}]", pad, render_attributes(&rule.att));
    }
}

/// Attribute list without brackets; locations are not printed.
pub fn render_attributes(att: &Attributes) -> String {
    let mut parts = Vec::new();
    if let Some(p) = att.priority {
        parts.push(format!("priority({})", p));
    }
    if att.owise {
        parts.push("owise".to_owned());
    }
    if let Some(g) = &att.group {
        parts.push(format!("group({})", g));
    }
    parts.join(", ")
}

// ──────────────────────────────────────────────
// Placeholders
// ──────────────────────────────────────────────

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"{}\d+", regex::escape(PLACEHOLDER_PREFIX)))
            .expect("placeholder pattern is a valid regex")
    })
}

/// Replace every placeholder that has a default. The whole name must
/// match, so `?KbxGenTodo1` never rewrites part of `?KbxGenTodo10`.
pub fn apply_defaults(text: &str, defaults: &BTreeMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures| {
            let name = &caps[0];
            defaults.get(name).cloned().unwrap_or_else(|| name.to_owned())
        })
        .into_owned()
}

/// Distinct placeholder names still present in `text`, sorted by number.
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let found: BTreeSet<(u64, &str)> = placeholder_regex()
        .find_iter(text)
        .map(|m| {
            let n = m.as_str()[PLACEHOLDER_PREFIX.len()..]
                .parse()
                .unwrap_or(u64::MAX);
            (n, m.as_str())
        })
        .collect();
    found.into_iter().map(|(_, s)| s.to_owned()).collect()
}
