use serde::Serialize;
use sha2::{Digest, Sha256};

use kbx_core::SynthesisConfig;

/// Manifest format version.
const MANIFEST_VERSION: &str = "1.0";

/// Record of one `gen` run, read by synchronization drivers to decide
/// whether generated specifications are stale and how to mask results.
#[derive(Debug, Clone, Serialize)]
pub struct SyncManifest {
    pub kbx: &'static str,
    pub definition: String,
    pub input_cell: String,
    pub output_cell: String,
    pub output_sort: String,
    pub input_deletes: Vec<String>,
    pub output_deletes: Vec<String>,
    pub unresolved_placeholders: Vec<String>,
    pub forward: Artifact,
    pub backward: Artifact,
}

#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    /// Path relative to the manifest.
    pub path: String,
    pub sha256: String,
}

impl Artifact {
    pub fn new(path: String, text: &str) -> Self {
        Artifact {
            path,
            sha256: compute_digest(text),
        }
    }
}

/// Hex SHA-256 of rendered text.
pub fn compute_digest(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

pub fn build_manifest(
    definition: &str,
    config: &SynthesisConfig,
    forward: Artifact,
    backward: Artifact,
    unresolved_placeholders: Vec<String>,
) -> SyncManifest {
    SyncManifest {
        kbx: MANIFEST_VERSION,
        definition: definition.to_owned(),
        input_cell: config.input_cell.clone(),
        output_cell: config.output_cell.clone(),
        output_sort: config.output_sort.clone(),
        input_deletes: config.input_deletes.clone(),
        output_deletes: config.output_deletes.clone(),
        unresolved_placeholders,
        forward,
        backward,
    }
}
