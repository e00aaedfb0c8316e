use std::path::Path;
use std::process;

use kbx_core::Direction;

use crate::input::{config_path, load_config};
use crate::{report_error, report_synth_error, OutputFormat};

pub(crate) fn cmd_mask(
    file: &Path,
    direction: Direction,
    config: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let config = load_config(&config_path(config, Path::new("."))).unwrap_or_else(|msg| {
        report_error(&msg, output, quiet);
        process::exit(1);
    });
    let patterns = match config.deletes_for(direction) {
        Ok(p) => p,
        Err(e) => {
            report_synth_error(&e, output, quiet);
            process::exit(1);
        }
    };
    let text = std::fs::read_to_string(file).unwrap_or_else(|e| {
        report_error(
            &format!("error reading file '{}': {}", file.display(), e),
            output,
            quiet,
        );
        process::exit(1);
    });

    tracing::debug!(patterns = patterns.len(), ?direction, "masking artifact");
    let masked = patterns.apply(&text);
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => println!("{}", serde_json::json!({ "text": masked })),
        OutputFormat::Text => println!("{}", masked),
    }
}
