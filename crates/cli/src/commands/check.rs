use std::path::Path;
use std::process;

use kbx_core::{RuleReport, Term};

use crate::input::{config_path, load_config, load_definition, parent_dir};
use crate::{report_error, report_synth_error, OutputFormat};

pub(crate) fn cmd_check(spec: &Path, config: Option<&Path>, output: OutputFormat, quiet: bool) {
    let definition = load_definition(spec).unwrap_or_else(|msg| {
        report_error(&msg, output, quiet);
        process::exit(1);
    });
    let config = load_config(&config_path(config, parent_dir(spec))).unwrap_or_else(|msg| {
        report_error(&msg, output, quiet);
        process::exit(1);
    });

    let synthesis = match kbx_core::synthesize(&definition, &config) {
        Ok(s) => s,
        Err(e) => {
            report_synth_error(&e, output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&synthesis.report)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("Synthesis Report");
            println!("================");
            println!();
            for rule in &synthesis.report.rules {
                print_rule(rule);
            }
            let placeholders = synthesis.report.placeholders();
            println!();
            if placeholders.is_empty() {
                println!("No placeholders.");
            } else {
                println!("Placeholders needing defaults: {}", placeholders.join(", "));
            }
        }
    }
}

fn print_rule(rule: &RuleReport) {
    let at = match rule.line {
        Some(line) => format!("{}:{}", rule.module, line),
        None => rule.module.clone(),
    };
    let class = serde_json::to_value(rule.class)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default();
    println!("  #{} {} [{}]", rule.index, at, class);
    if !rule.complement.is_symmetric() {
        println!("      lost forward:  {}", terms(&rule.complement.miss_r));
        println!("      lost backward: {}", terms(&rule.complement.miss_l));
    }
}

fn terms(values: &[Term]) -> String {
    if values.is_empty() {
        return "-".to_owned();
    }
    values
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
