//! Artifact generation: filter, chunk, normalize, then emit per target.

pub mod document;
pub mod notebook;
pub mod script;

use std::path::Path;

use tracing::{debug, info};

use crate::Target;
use crate::chunk::{self, Chunk};
use crate::config::{Config, Hooks};
use crate::directive;
use crate::error::Error;
use crate::notebook::Notebook;
use crate::sandbox::Sandbox;

/// Run the text stages shared by every target and return normalized chunks.
pub fn prepare(source: &str, target: Target, config: &Config, hooks: &Hooks) -> Vec<Chunk> {
    let mut content = (hooks.preprocess)(source.to_string());
    if config.credit {
        content.push_str(&credit_footer(target));
    }
    let content = directive::filter(&content, target, config);
    let chunks = chunk::parse(&content, target.allows_continuation());
    let chunks = chunk::normalize(chunks, !target.allows_continuation());
    debug!(%target, chunks = chunks.len(), "chunked source");
    chunks
}

/// The footer appended before filtering. It is prose, so scripts drop it
/// unless comments are kept.
fn credit_footer(target: Target) -> String {
    let footer = match target {
        Target::Script => "# This file was generated using literate.".to_string(),
        Target::Markdown => "# ---\n#\n# *This page was generated using literate.*".to_string(),
        Target::Notebook => "# *This notebook was generated using literate.*".to_string(),
    };
    format!("\n#-\n{}\n", footer)
}

/// Generate a script.
pub fn script(source: &str, config: &Config, hooks: &Hooks) -> String {
    info!(name = config.name(), "generating script");
    let chunks = prepare(source, Target::Script, config, hooks);
    let body = script::emit(&chunks, config.keep_comments);
    (hooks.postprocess)(body)
}

/// Generate a markdown document. When execution is enabled, `sandbox` runs
/// every code block and images are written into `outdir`.
pub fn markdown<S: Sandbox>(
    source: &str,
    config: &Config,
    hooks: &Hooks,
    sandbox: S,
    outdir: &Path,
) -> Result<String, Error> {
    info!(name = config.name(), "generating markdown");
    let chunks = prepare(source, Target::Markdown, config, hooks);
    let body = if config.execute_for(Target::Markdown) {
        let mut sandbox = sandbox;
        document::emit(&chunks, config, Some(&mut sandbox), outdir)?
    } else {
        document::emit::<S>(&chunks, config, None, outdir)?
    };
    Ok((hooks.postprocess)(body))
}

/// Generate a notebook, executing its code cells with `sandbox` when
/// execution is enabled.
pub fn notebook<S: Sandbox>(
    source: &str,
    config: &Config,
    hooks: &Hooks,
    sandbox: S,
) -> Result<Notebook, Error> {
    info!(name = config.name(), "generating notebook");
    let chunks = prepare(source, Target::Notebook, config, hooks);
    let mut nb = notebook::build(&chunks, config)?;
    debug!(cells = nb.cells.len(), code = nb.code_cells().count(), "built notebook");
    if config.execute_for(Target::Notebook) {
        notebook::execute_cells(&mut nb, sandbox)?;
    }
    Ok((hooks.postprocess_notebook)(nb))
}
