//! Pipeline orchestrator: runs passes 1-5 over one definition.

use crate::ast::{Definition, Rule};
use crate::config::SynthesisConfig;
use crate::error::SynthError;
use crate::fresh::FreshNames;
use crate::pass1_extract::{self, InModule};
use crate::pass2_complement::{self, Complement, RuleClass};
use crate::pass3_transform::{self, VariantKind};
use crate::pass4_priority;
use crate::pass5_assemble;
use crate::pass6_render;
use serde::Serialize;
use tracing::{info, warn};

/// Forward and backward definitions generated from one specification.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub forward: Definition,
    pub backward: Definition,
    pub report: SynthesisReport,
}

impl Synthesis {
    pub fn render_forward(&self) -> String {
        pass6_render::render_definition(&self.forward)
    }

    /// Rendered backward definition with `defaults` substituted for
    /// matching placeholders.
    pub fn render_backward(&self, defaults: &std::collections::BTreeMap<String, String>) -> String {
        pass6_render::apply_defaults(&pass6_render::render_definition(&self.backward), defaults)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SynthesisReport {
    pub rules: Vec<RuleReport>,
}

impl SynthesisReport {
    pub fn count(&self, class: RuleClass) -> usize {
        self.rules.iter().filter(|r| r.class == class).count()
    }

    /// Every placeholder introduced, in issue order.
    pub fn placeholders(&self) -> Vec<String> {
        self.rules
            .iter()
            .flat_map(|r| r.placeholders.iter().cloned())
            .collect()
    }
}

/// What happened to one input rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleReport {
    pub index: usize,
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub class: RuleClass,
    pub complement: Complement,
    pub forward: Vec<VariantKind>,
    pub backward: Vec<VariantKind>,
    pub placeholders: Vec<String>,
}

/// Generate the forward and backward definitions for `definition`.
///
/// Deterministic: the same inputs give identical outputs, including the
/// numbering of generated variables and placeholders.
pub fn synthesize(
    definition: &Definition,
    config: &SynthesisConfig,
) -> Result<Synthesis, SynthError> {
    config.validate()?;

    // Pass 1: partition
    let extracted = pass1_extract::extract(definition, config)?;

    // Pass 2: asymmetry analysis
    let analyses = pass2_complement::analyze_rules(&extracted.rules);

    let backward_priorities: Option<Vec<u32>> = config
        .renumber_backward_priorities
        .then(|| pass4_priority::reverse_priorities(extracted.rules.iter().map(|r| &r.item)));

    // Passes 3 and 4: per-rule variants with priorities
    let mut fresh = FreshNames::new();
    let mut forward_rules: Vec<InModule<Rule>> = Vec::new();
    let mut backward_rules: Vec<InModule<Rule>> = Vec::new();
    let mut report = SynthesisReport::default();

    for (rule, analysis) in extracted.rules.iter().zip(&analyses) {
        let rule_ref = extracted.rule_ref(analysis.index);
        let mut variants =
            pass3_transform::transform_rule(&rule.item, analysis, &mut fresh, &rule_ref)?;
        let priority = backward_priorities
            .as_ref()
            .and_then(|p| p.get(analysis.index).copied());
        pass4_priority::schedule(&mut variants, priority);

        report.rules.push(RuleReport {
            index: rule_ref.index,
            module: rule_ref.module.clone(),
            line: rule_ref.line,
            class: analysis.class,
            complement: analysis.complement.clone(),
            forward: variants.forward.iter().map(|v| v.kind).collect(),
            backward: variants.backward.iter().map(|v| v.kind).collect(),
            placeholders: variants.placeholders.iter().map(|p| p.to_string()).collect(),
        });
        forward_rules.extend(variants.forward.into_iter().map(|v| rule.map(v.rule)));
        backward_rules.extend(variants.backward.into_iter().map(|v| rule.map(v.rule)));
    }

    // Pass 5: assembly
    let state = pass5_assemble::add_holder_to_state(&extracted.configuration.item)?;
    let reversed = pass5_assemble::reverse_io(&state, config)?;

    let forward = pass5_assemble::construct_definition(
        &extracted,
        &extracted.configuration.map(state),
        &forward_rules,
    );
    let backward = pass5_assemble::construct_definition(
        &extracted,
        &extracted.configuration.map(reversed),
        &backward_rules,
    );

    info!(
        rules = report.rules.len(),
        exempt = report.count(RuleClass::Exempt),
        symmetric = report.count(RuleClass::Symmetric),
        asymmetric = report.count(RuleClass::Asymmetric),
        forward_rules = forward_rules.len(),
        backward_rules = backward_rules.len(),
        "synthesis complete"
    );
    let placeholders = fresh.placeholders_issued();
    if placeholders > 0 {
        warn!(
            placeholders,
            "backward definition contains placeholders that need defaults"
        );
    }

    Ok(Synthesis {
        forward: pass5_assemble::add_required_modules(forward),
        backward: pass5_assemble::add_required_modules(backward),
        report,
    })
}
