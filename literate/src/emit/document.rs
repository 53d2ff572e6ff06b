use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::chunk::Chunk;
use crate::config::Config;
use crate::error::Error;
use crate::sandbox::{self, ExecutionResult, Mime, Payload, Sandbox, Showable};

const CONTINUED: &str = "; continued = true";

/// Render chunks as markdown. With a sandbox, every finished code block is
/// executed and its result placed after the fence; images go to `outdir`.
pub fn emit<S: Sandbox>(
    chunks: &[Chunk],
    config: &Config,
    mut sandbox: Option<&mut S>,
    outdir: &Path,
) -> Result<String, Error> {
    let (open, close) = config.codefence();
    let mut out = String::new();

    if config.documenter
        && let Some(url) = &config.edit_url
    {
        out.push_str(&format!("```@meta\nEditURL = \"{}\"\n```\n\n", url));
    }

    // Code of continued blocks, run together with the block that ends them.
    // A run still open at the last code block is ended there.
    let mut pending = String::new();
    let last_code = chunks.iter().rposition(Chunk::is_code);

    for (index, chunk) in chunks.iter().enumerate() {
        match chunk {
            Chunk::Prose(lines) => {
                for line in lines {
                    out.push_str(&line.indent);
                    out.push_str(&line.text);
                    out.push('\n');
                }
            }
            Chunk::Code { lines, .. } => {
                out.push_str(&open);
                if chunk.is_continued() {
                    out.push_str(CONTINUED);
                }
                out.push('\n');
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str(&close);
                out.push('\n');

                if let Some(sandbox) = sandbox.as_deref_mut() {
                    pending.push_str(&lines.join("\n"));
                    pending.push('\n');
                    if !chunk.is_continued() || Some(index) == last_code {
                        let code = std::mem::take(&mut pending);
                        let code = code.trim_end();
                        debug!(lines = code.lines().count(), "executing block");
                        let result = sandbox::execute(sandbox, code)?;
                        render_result(&mut out, code, result, outdir)?;
                    }
                }
            }
        }
        out.push('\n');
    }

    let trimmed = out.trim_end_matches('\n');
    Ok(if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    })
}

/// Append the inline rendering of one block's result.
fn render_result<V: Showable>(
    out: &mut String,
    code: &str,
    result: ExecutionResult<V>,
    outdir: &Path,
) -> Result<(), Error> {
    match result.value {
        Some(value) => {
            let image = Mime::IMAGES
                .iter()
                .find_map(|&mime| value.show(mime).map(|payload| (mime, payload)));
            if let Some((mime, payload)) = image {
                let file = image_file_name(code, mime);
                fs::write(outdir.join(&file), payload.as_bytes())?;
                debug!(%file, "wrote image");
                out.push_str(&format!("\n![]({})\n", file));
            } else if let Some(Payload::Text(markdown)) = value.show(Mime::Markdown) {
                out.push('\n');
                out.push_str(markdown.trim_end());
                out.push('\n');
            } else if let Some(Payload::Text(plain)) = value.show(Mime::Plain) {
                push_plain_block(out, &plain);
            }
        }
        None if !result.output.trim().is_empty() => push_plain_block(out, &result.output),
        None => {}
    }
    Ok(())
}

fn push_plain_block(out: &mut String, text: &str) {
    out.push_str("\n```\n");
    out.push_str(text.trim_end_matches('\n'));
    out.push_str("\n```\n");
}

/// Side-car name derived from the code, so regenerating a page overwrites
/// its own images instead of piling up new ones.
pub fn image_file_name(code: &str, mime: Mime) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    let digest = hasher.finalize();
    let stem: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", stem, mime.extension().unwrap_or_default())
}
