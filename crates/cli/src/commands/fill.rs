use std::path::Path;
use std::process;

use crate::input::{config_path, load_config};
use crate::{report_error, OutputFormat};

/// Substitute configured defaults into `file` in place. Fails while any
/// placeholder is left, so an incomplete backward specification is never
/// mistaken for a usable one.
pub(crate) fn cmd_fill(file: &Path, config: Option<&Path>, output: OutputFormat, quiet: bool) {
    let config = load_config(&config_path(config, Path::new("."))).unwrap_or_else(|msg| {
        report_error(&msg, output, quiet);
        process::exit(1);
    });
    let text = std::fs::read_to_string(file).unwrap_or_else(|e| {
        report_error(
            &format!("error reading file '{}': {}", file.display(), e),
            output,
            quiet,
        );
        process::exit(1);
    });

    let before = kbx_core::unresolved_placeholders(&text);
    let filled = kbx_core::apply_defaults(&text, &config.defaults);
    let remaining = kbx_core::unresolved_placeholders(&filled);
    let count = before.len().saturating_sub(remaining.len());

    if filled != text {
        if let Err(e) = std::fs::write(file, &filled) {
            report_error(
                &format!("error writing '{}': {}", file.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    }
    tracing::info!(
        filled = count,
        remaining = remaining.len(),
        "substituted placeholder defaults"
    );

    if !quiet {
        match output {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "filled": count,
                    "unresolved": remaining,
                });
                println!("{}", json);
            }
            OutputFormat::Text if remaining.is_empty() => {
                println!("filled {} placeholder(s) in {}", count, file.display());
            }
            OutputFormat::Text => {
                eprintln!("unresolved placeholders in {}:", file.display());
                for p in &remaining {
                    eprintln!("  - {}", p);
                }
            }
        }
    }
    if !remaining.is_empty() {
        process::exit(1);
    }
}
