//! Pass 1: Builtin filtering, single-source check, and partition of the
//! definition into syntax, one configuration, and an ordered rule list.

use crate::ast::*;
use crate::config::SynthesisConfig;
use crate::error::{RuleRef, SynthError};
use std::collections::BTreeSet;

/// An item paired with the name of the module that declared it.
#[derive(Debug, Clone, PartialEq)]
pub struct InModule<T> {
    pub item: T,
    pub module: String,
}

impl<T> InModule<T> {
    pub fn new(item: T, module: impl Into<String>) -> Self {
        InModule {
            item,
            module: module.into(),
        }
    }

    /// Same module, new item.
    pub fn map<U>(&self, item: U) -> InModule<U> {
        InModule {
            item,
            module: self.module.clone(),
        }
    }
}

/// A module with its sentences removed; sentences are re-attached by the
/// assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleHeader {
    pub name: String,
    pub imports: Vec<String>,
    pub source: Option<String>,
    pub location: Option<Location>,
}

/// The user-defined part of a definition, split by sentence kind.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub main_module: String,
    pub requires: Vec<String>,
    pub modules: Vec<ModuleHeader>,
    pub syntax: Vec<InModule<Sentence>>,
    pub configuration: InModule<Configuration>,
    pub rules: Vec<InModule<Rule>>,
}

impl Extracted {
    pub fn rule_ref(&self, index: usize) -> RuleRef {
        let rule = &self.rules[index];
        RuleRef {
            index,
            module: rule.module.clone(),
            line: rule.item.location().map(|l| l.line),
        }
    }
}

/// Split `definition` into its parts.
///
/// Builtin modules (by source marker) are dropped first; what remains
/// must come from exactly one source unit and declare exactly one
/// configuration.
pub fn extract(definition: &Definition, config: &SynthesisConfig) -> Result<Extracted, SynthError> {
    let modules: Vec<&Module> = definition
        .modules
        .iter()
        .filter(|m| {
            !m.source
                .as_deref()
                .is_some_and(|s| config.is_builtin_source(s))
        })
        .collect();

    check_single_source(&modules)?;

    if !modules.iter().any(|m| m.name == definition.main_module) {
        return Err(SynthError::MainModuleMissing {
            module: definition.main_module.clone(),
        });
    }

    let mut syntax = Vec::new();
    let mut rules = Vec::new();
    let mut configuration: Option<InModule<Configuration>> = None;

    for module in &modules {
        for sentence in &module.sentences {
            match sentence {
                Sentence::Rule(rule) => rules.push(InModule::new(rule.clone(), &module.name)),
                Sentence::Configuration(c) => {
                    if let Some(first) = &configuration {
                        return Err(SynthError::MultipleConfigurations {
                            first: first.module.clone(),
                            second: module.name.clone(),
                        });
                    }
                    configuration = Some(InModule::new(c.clone(), &module.name));
                }
                Sentence::Syntax { .. } => {
                    syntax.push(InModule::new(sentence.clone(), &module.name));
                }
            }
        }
    }

    let configuration = configuration.ok_or(SynthError::MissingConfiguration)?;

    Ok(Extracted {
        main_module: definition.main_module.clone(),
        requires: definition.requires.clone(),
        modules: modules
            .iter()
            .map(|m| ModuleHeader {
                name: m.name.clone(),
                imports: m.imports.clone(),
                source: m.source.clone(),
                location: m.location,
            })
            .collect(),
        syntax,
        configuration,
        rules,
    })
}

fn check_single_source(modules: &[&Module]) -> Result<(), SynthError> {
    let sources: BTreeSet<&str> = modules
        .iter()
        .map(|m| m.source.as_deref().unwrap_or("<unknown>"))
        .collect();
    if sources.len() > 1 {
        return Err(SynthError::MultipleSources {
            sources: sources.into_iter().map(str::to_owned).collect(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, source: &str, sentences: Vec<Sentence>) -> Module {
        Module {
            name: name.to_owned(),
            imports: vec![],
            sentences,
            source: Some(source.to_owned()),
            location: None,
        }
    }

    fn config_sentence() -> Sentence {
        Sentence::Configuration(Configuration::node(
            "T",
            vec![Configuration::leaf("k", Term::var("$PGM"))],
        ))
    }

    fn rule_sentence(name: &str) -> Sentence {
        Sentence::Rule(Rule::new(Term::cell("k", Term::var(name))))
    }

    fn cfg() -> SynthesisConfig {
        SynthesisConfig::new("k", "out", "Pgm")
    }

    #[test]
    fn partitions_sentences_in_order() {
        let def = Definition {
            main_module: "MAIN".to_owned(),
            modules: vec![
                module(
                    "SYNTAX",
                    "/a/f.k",
                    vec![Sentence::Syntax {
                        text: "syntax Pgm ::= Id".to_owned(),
                        location: None,
                    }],
                ),
                module(
                    "MAIN",
                    "/a/f.k",
                    vec![rule_sentence("A"), config_sentence(), rule_sentence("B")],
                ),
            ],
            requires: vec![],
        };
        let ex = extract(&def, &cfg()).unwrap();
        assert_eq!(ex.syntax.len(), 1);
        assert_eq!(ex.syntax[0].module, "SYNTAX");
        assert_eq!(ex.configuration.module, "MAIN");
        assert_eq!(ex.rules.len(), 2);
        assert_eq!(ex.rules[1].item.body, Term::cell("k", Term::var("B")));
        assert_eq!(ex.modules.len(), 2);
        assert_eq!(ex.rule_ref(1).module, "MAIN");
    }

    #[test]
    fn builtin_modules_are_dropped() {
        let def = Definition {
            main_module: "MAIN".to_owned(),
            modules: vec![
                module(
                    "DOMAINS",
                    "/opt/include/kframework/builtin/domains.md",
                    vec![config_sentence()],
                ),
                module("MAIN", "/a/f.k", vec![config_sentence()]),
            ],
            requires: vec![],
        };
        let ex = extract(&def, &cfg()).unwrap();
        assert_eq!(ex.modules.len(), 1);
        assert_eq!(ex.modules[0].name, "MAIN");
    }

    #[test]
    fn two_configurations_rejected() {
        let def = Definition {
            main_module: "A".to_owned(),
            modules: vec![
                module("A", "/f.k", vec![config_sentence()]),
                module("B", "/f.k", vec![config_sentence()]),
            ],
            requires: vec![],
        };
        assert_eq!(
            extract(&def, &cfg()).unwrap_err(),
            SynthError::MultipleConfigurations {
                first: "A".to_owned(),
                second: "B".to_owned()
            }
        );
    }

    #[test]
    fn two_sources_rejected() {
        let def = Definition {
            main_module: "A".to_owned(),
            modules: vec![
                module("A", "/f.k", vec![config_sentence()]),
                module("B", "/g.k", vec![]),
            ],
            requires: vec![],
        };
        match extract(&def, &cfg()) {
            Err(SynthError::MultipleSources { sources }) => {
                assert_eq!(sources, vec!["/f.k".to_owned(), "/g.k".to_owned()])
            }
            other => panic!("expected MultipleSources, got {:?}", other),
        }
    }

    #[test]
    fn missing_configuration_rejected() {
        let def = Definition {
            main_module: "A".to_owned(),
            modules: vec![module("A", "/f.k", vec![rule_sentence("X")])],
            requires: vec![],
        };
        assert_eq!(
            extract(&def, &cfg()).unwrap_err(),
            SynthError::MissingConfiguration
        );
    }

    #[test]
    fn missing_main_module_rejected() {
        let def = Definition {
            main_module: "NOPE".to_owned(),
            modules: vec![module("A", "/f.k", vec![config_sentence()])],
            requires: vec![],
        };
        assert!(matches!(
            extract(&def, &cfg()),
            Err(SynthError::MainModuleMissing { .. })
        ));
    }
}
