use serde_json::{Map, Value};
use tracing::debug;

use crate::chunk::Chunk;
use crate::config::Config;
use crate::error::Error;
use crate::notebook::metadata::{self, CellKind, CellMetadata};
use crate::notebook::{Cell, Notebook, Output, bundle_data, source_lines, split_lines};
use crate::sandbox::{self, Sandbox, Showable};

/// Metadata key the free-text label of a metadata line is stored under.
pub const LABEL_KEY: &str = "name";

/// One cell per chunk, with leading metadata lines folded into the cell.
pub fn build(chunks: &[Chunk], config: &Config) -> Result<Notebook, Error> {
    let mut nb = Notebook::new(config);
    for chunk in chunks {
        let (kind, mut lines) = match chunk {
            Chunk::Prose(lines) => (
                CellKind::Markdown,
                lines
                    .iter()
                    .map(|l| format!("{}{}", l.indent, l.text))
                    .collect::<Vec<_>>(),
            ),
            Chunk::Code { lines, .. } => (CellKind::Code, lines.clone()),
        };

        let meta = match lines.first().and_then(|first| metadata::parse(first)) {
            Some(parsed) => {
                let meta = parsed?;
                meta.check_kind(kind)?;
                lines.remove(0);
                Some(meta)
            }
            None => None,
        };

        let mut cell = match kind {
            CellKind::Markdown => Cell::markdown(source_lines(lines)),
            CellKind::Code => Cell::code(source_lines(lines)),
        };
        if let Some(meta) = meta {
            merge_metadata(cell.metadata_mut(), meta);
        }
        nb.cells.push(cell);
    }
    Ok(nb)
}

fn merge_metadata(target: &mut Map<String, Value>, meta: CellMetadata) {
    if let Some(label) = meta.label {
        target.insert(LABEL_KEY.to_string(), Value::String(label));
    }
    target.extend(meta.data);
}

/// Run every code cell in order, numbering them from 1.
pub fn execute_cells<S: Sandbox>(nb: &mut Notebook, mut sandbox: S) -> Result<(), Error> {
    let mut count = 0;
    for cell in nb.cells.iter_mut() {
        let Cell::Code {
            execution_count,
            outputs,
            source,
            ..
        } = cell
        else {
            continue;
        };

        count += 1;
        let code = source.concat();
        debug!(count, "executing cell");
        let result = sandbox::execute(&mut sandbox, &code)?;

        *execution_count = Some(count);
        outputs.clear();
        if !result.output.is_empty() {
            outputs.push(Output::Stream {
                name: "stdout".to_string(),
                text: split_lines(&result.output),
            });
        }
        for bundle in &result.displays {
            outputs.push(Output::DisplayData {
                data: bundle_data(bundle),
                metadata: Map::new(),
            });
        }
        if let Some(value) = &result.value {
            outputs.push(Output::ExecuteResult {
                execution_count: count,
                data: bundle_data(&value.mime_bundle()),
                metadata: Map::new(),
            });
        }
    }
    Ok(())
}
