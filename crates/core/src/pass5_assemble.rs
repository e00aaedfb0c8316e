//! Pass 5: Assembly of the forward and backward definitions.
//!
//! Re-attaches syntax, the (augmented or reversed) configuration and the
//! generated rules to the modules they came from, in source order.

use crate::ast::*;
use crate::builtins::{map_empty, semantic_cast, DOMAINS_MODULE};
use crate::config::SynthesisConfig;
use crate::error::SynthError;
use crate::pass1_extract::{Extracted, InModule};
use crate::pass3_transform::HOLDER_CELL;
use std::collections::HashMap;

/// Variable the execution toolchain binds to the program text.
pub const PROGRAM_VAR: &str = "$PGM";

/// Append the empty complement holder to the root cell.
pub fn add_holder_to_state(state: &Configuration) -> Result<Configuration, SynthError> {
    match &state.content {
        CellContent::Cells(cells) => {
            let mut cells = cells.clone();
            cells.push(Configuration::leaf(HOLDER_CELL, map_empty()));
            Ok(state.with_content(CellContent::Cells(cells)))
        }
        CellContent::Term(_) => Err(SynthError::cells_expected(&state.cell_name)),
    }
}

/// Swap the roles of the input and output cells for the backward
/// direction.
///
/// The output cell takes the program variable (cast to the output sort);
/// the input cell takes the configured end state. Everything else is
/// copied unchanged.
pub fn reverse_io(
    state: &Configuration,
    config: &SynthesisConfig,
) -> Result<Configuration, SynthError> {
    let mut seen = SeenCells::default();
    let reversed = reverse_cell(state, config, &mut seen)?;
    if !seen.output {
        return Err(SynthError::CellNotFound {
            cell: config.output_cell.clone(),
        });
    }
    if !seen.input {
        return Err(SynthError::CellNotFound {
            cell: config.input_cell.clone(),
        });
    }
    Ok(reversed)
}

#[derive(Default)]
struct SeenCells {
    input: bool,
    output: bool,
}

fn reverse_cell(
    cell: &Configuration,
    config: &SynthesisConfig,
    seen: &mut SeenCells,
) -> Result<Configuration, SynthError> {
    if cell.cell_name == config.output_cell {
        seen.output = true;
        return match cell.content {
            CellContent::Term(_) => Ok(cell.with_content(CellContent::Term(semantic_cast(
                &config.output_sort,
                Term::var(PROGRAM_VAR),
            )))),
            CellContent::Cells(_) => Err(SynthError::leaf_expected(&cell.cell_name)),
        };
    }
    if cell.cell_name == config.input_cell {
        seen.input = true;
        return match cell.content {
            CellContent::Term(_) => Ok(cell.with_content(CellContent::Term(
                config.input_end_state.clone(),
            ))),
            CellContent::Cells(_) => Err(SynthError::leaf_expected(&cell.cell_name)),
        };
    }
    match &cell.content {
        CellContent::Cells(children) => {
            let children = children
                .iter()
                .map(|c| reverse_cell(c, config, seen))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(cell.with_content(CellContent::Cells(children)))
        }
        CellContent::Term(_) => Ok(cell.clone()),
    }
}

/// Build a definition from the extracted module layout and the given
/// sentences.
///
/// Sentences are sorted by source location within each module (stable,
/// so generated variants stay behind the rule they came from), and
/// modules are sorted by their own location.
pub fn construct_definition(
    extracted: &Extracted,
    state: &InModule<Configuration>,
    rules: &[InModule<Rule>],
) -> Definition {
    let mut by_module: HashMap<&str, Vec<Sentence>> = extracted
        .modules
        .iter()
        .map(|m| (m.name.as_str(), Vec::new()))
        .collect();

    let syntax = extracted
        .syntax
        .iter()
        .map(|s| (s.module.as_str(), s.item.clone()));
    let rules = rules
        .iter()
        .map(|r| (r.module.as_str(), Sentence::Rule(r.item.clone())));
    let state = std::iter::once((
        state.module.as_str(),
        Sentence::Configuration(state.item.clone()),
    ));
    for (module, sentence) in syntax.chain(rules).chain(state) {
        by_module.entry(module).or_default().push(sentence);
    }

    let mut modules: Vec<Module> = extracted
        .modules
        .iter()
        .map(|header| {
            let mut sentences = by_module.remove(header.name.as_str()).unwrap_or_default();
            sentences.sort_by_key(|s| Location::key(s.location()));
            Module {
                name: header.name.clone(),
                imports: header.imports.clone(),
                sentences,
                source: header.source.clone(),
                location: header.location,
            }
        })
        .collect();
    modules.sort_by_key(|m| Location::key(m.location));

    Definition {
        main_module: extracted.main_module.clone(),
        modules,
        requires: extracted.requires.clone(),
    }
}

/// Make the main module import the builtin domains when no module does.
pub fn add_required_modules(mut definition: Definition) -> Definition {
    let imported = definition
        .modules
        .iter()
        .any(|m| m.imports.iter().any(|i| i == DOMAINS_MODULE));
    if !imported {
        let main = definition.main_module.clone();
        if let Some(module) = definition.modules.iter_mut().find(|m| m.name == main) {
            module.imports.push(DOMAINS_MODULE.to_owned());
        }
    }
    definition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass1_extract::ModuleHeader;

    fn state() -> Configuration {
        Configuration::node(
            "T",
            vec![
                Configuration::leaf(
                    "k",
                    semantic_cast("Pgm", Term::var(PROGRAM_VAR)),
                ),
                Configuration::node(
                    "outer",
                    vec![Configuration::leaf("out", Term::constant(".List"))],
                ),
                Configuration::leaf("env", Term::constant(".Map")),
            ],
        )
    }

    fn config() -> SynthesisConfig {
        let mut c = SynthesisConfig::new("k", "out", "Out");
        c.input_end_state = Term::token(".", "K");
        c
    }

    #[test]
    fn holder_is_appended_to_root() {
        let s = add_holder_to_state(&state()).unwrap();
        match &s.content {
            CellContent::Cells(cells) => {
                let last = cells.last().unwrap();
                assert_eq!(last.cell_name, HOLDER_CELL);
                assert_eq!(last.content, CellContent::Term(map_empty()));
                assert_eq!(cells.len(), 4);
            }
            _ => panic!("expected cells"),
        }
    }

    #[test]
    fn holder_needs_nested_root() {
        let leaf = Configuration::leaf("k", Term::var("X"));
        assert!(matches!(
            add_holder_to_state(&leaf),
            Err(SynthError::LeafExpected { .. })
        ));
    }

    #[test]
    fn reverse_io_swaps_roles() {
        let r = reverse_io(&state(), &config()).unwrap();
        assert_eq!(
            r.find("out").unwrap().content,
            CellContent::Term(semantic_cast("Out", Term::var(PROGRAM_VAR)))
        );
        assert_eq!(
            r.find("k").unwrap().content,
            CellContent::Term(Term::token(".", "K"))
        );
        assert_eq!(r.find("env"), state().find("env"));
    }

    #[test]
    fn reverse_io_rejects_unknown_cells() {
        let mut c = config();
        c.output_cell = "nowhere".to_owned();
        assert_eq!(
            reverse_io(&state(), &c).unwrap_err(),
            SynthError::CellNotFound {
                cell: "nowhere".to_owned()
            }
        );
    }

    #[test]
    fn reverse_io_rejects_non_leaf_output() {
        let mut c = config();
        c.output_cell = "outer".to_owned();
        assert!(matches!(
            reverse_io(&state(), &c),
            Err(SynthError::LeafExpected { .. })
        ));
    }

    fn at(line: u32) -> Option<Location> {
        Some(Location::new(line, 1, line, 2))
    }

    #[test]
    fn construct_orders_by_location() {
        let extracted = Extracted {
            main_module: "MAIN".to_owned(),
            requires: vec![],
            modules: vec![
                ModuleHeader {
                    name: "MAIN".to_owned(),
                    imports: vec!["SYN".to_owned()],
                    source: None,
                    location: at(10),
                },
                ModuleHeader {
                    name: "SYN".to_owned(),
                    imports: vec![],
                    source: None,
                    location: at(1),
                },
                ModuleHeader {
                    name: "EMPTY".to_owned(),
                    imports: vec![],
                    source: None,
                    location: at(30),
                },
            ],
            syntax: vec![InModule::new(
                Sentence::Syntax {
                    text: "syntax A".to_owned(),
                    location: at(2),
                },
                "SYN",
            )],
            configuration: InModule::new(state(), "MAIN"),
            rules: vec![],
        };
        let mut late = Rule::new(Term::cell("k", Term::var("B")));
        late.att.location = at(20);
        let mut early = Rule::new(Term::cell("k", Term::var("A")));
        early.att.location = at(12);
        let mut cfg_state = state();
        cfg_state.location = at(11);
        let def = construct_definition(
            &extracted,
            &InModule::new(cfg_state, "MAIN"),
            &[InModule::new(late, "MAIN"), InModule::new(early, "MAIN")],
        );
        let names: Vec<&str> = def.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["SYN", "MAIN", "EMPTY"]);
        let main = def.module("MAIN").unwrap();
        let lines: Vec<u32> = main
            .sentences
            .iter()
            .map(|s| s.location().unwrap().line)
            .collect();
        assert_eq!(lines, vec![11, 12, 20]);
        assert!(def.module("EMPTY").unwrap().sentences.is_empty());
    }

    #[test]
    fn domains_import_added_once() {
        let def = Definition {
            main_module: "MAIN".to_owned(),
            modules: vec![Module {
                name: "MAIN".to_owned(),
                imports: vec![],
                sentences: vec![],
                source: None,
                location: None,
            }],
            requires: vec![],
        };
        let def = add_required_modules(def);
        assert_eq!(def.modules[0].imports, vec![DOMAINS_MODULE.to_owned()]);
        let again = add_required_modules(def.clone());
        assert_eq!(again, def);
    }
}
