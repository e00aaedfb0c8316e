use std::path::{Path, PathBuf};
use std::process;

use kbx_core::{Definition, Synthesis};

use crate::input::{config_path, load_config, load_definition, parent_dir, stem};
use crate::manifest::{build_manifest, Artifact};
use crate::{report_error, report_synth_error, OutputFormat};

/// Suffix of the default output directory.
const WORKSPACE_SUFFIX: &str = "-kbx-workspace";

pub(crate) fn cmd_gen(
    spec: &Path,
    config: Option<&Path>,
    out: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
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

    let name = stem(spec);
    let dir = match out {
        Some(d) => d.to_path_buf(),
        None => parent_dir(spec).join(format!("{}{}", name, WORKSPACE_SUFFIX)),
    };

    let forward_text = synthesis.render_forward();
    let backward_text = synthesis.render_backward(&config.defaults);
    let unresolved = kbx_core::unresolved_placeholders(&backward_text);

    let written = write_direction(&dir, "forward", &name, &synthesis.forward, &forward_text)
        .and_then(|f| {
            write_direction(&dir, "backward", &name, &synthesis.backward, &backward_text)
                .map(|b| (f, b))
        });
    let (forward_path, backward_path) = written.unwrap_or_else(|msg| {
        report_error(&msg, output, quiet);
        process::exit(1);
    });

    let manifest = build_manifest(
        &name,
        &config,
        Artifact::new(forward_path, &forward_text),
        Artifact::new(backward_path, &backward_text),
        unresolved.clone(),
    );
    let manifest_json = serde_json::to_string_pretty(&manifest)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    let manifest_path = dir.join("manifest.json");
    if let Err(e) = std::fs::write(&manifest_path, format!("{}\n", manifest_json)) {
        let msg = format!("error writing '{}': {}", manifest_path.display(), e);
        report_error(&msg, output, quiet);
        process::exit(1);
    }

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => println!("{}", manifest_json),
        OutputFormat::Text => {
            print_summary(&synthesis, &dir, &manifest.forward, &manifest.backward);
            if !unresolved.is_empty() {
                eprintln!(
                    "note: backward specification has {} unresolved placeholder(s): {}",
                    unresolved.len(),
                    unresolved.join(", ")
                );
                eprintln!(
                    "      add them under [defaults] in the configuration and run `kbx fill`"
                );
            }
        }
    }
}

/// Write `<dir>/<direction>/<name>.k` and `.json`; returns the `.k` path
/// relative to `dir`.
fn write_direction(
    dir: &Path,
    direction: &str,
    name: &str,
    definition: &Definition,
    text: &str,
) -> Result<String, String> {
    let sub = dir.join(direction);
    std::fs::create_dir_all(&sub)
        .map_err(|e| format!("error creating directory '{}': {}", sub.display(), e))?;

    let k_path: PathBuf = sub.join(format!("{}.k", name));
    std::fs::write(&k_path, text)
        .map_err(|e| format!("error writing '{}': {}", k_path.display(), e))?;

    let json_path = sub.join(format!("{}.json", name));
    let json = serde_json::to_string_pretty(definition)
        .map_err(|e| format!("serialization error: {}", e))?;
    std::fs::write(&json_path, format!("{}\n", json))
        .map_err(|e| format!("error writing '{}': {}", json_path.display(), e))?;

    Ok(format!("{}/{}.k", direction, name))
}

fn print_summary(synthesis: &Synthesis, dir: &Path, forward: &Artifact, backward: &Artifact) {
    use kbx_core::RuleClass;

    let report = &synthesis.report;
    println!(
        "{} rules: {} asymmetric, {} symmetric, {} exempt",
        report.rules.len(),
        report.count(RuleClass::Asymmetric),
        report.count(RuleClass::Symmetric),
        report.count(RuleClass::Exempt)
    );
    println!("  forward:  {}", dir.join(&forward.path).display());
    println!("  backward: {}", dir.join(&backward.path).display());
    println!("  manifest: {}", dir.join("manifest.json").display());
}
