use crate::chunk::{Chunk, Continuation, ProseLine};

/// Clean chunk boundaries.
///
/// Drops blank chunks, trims blank edge lines, marks indentation-based
/// continuation, and with `flatten` folds continued runs into single code
/// chunks (prose rewrapped as comments).
pub fn normalize(chunks: Vec<Chunk>, flatten: bool) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = chunks.into_iter().filter(|c| !c.is_blank()).collect();
    for chunk in &mut chunks {
        trim_blank_edges(chunk);
    }
    mark_indented_continuations(&mut chunks);

    if flatten {
        flatten_continued(chunks)
    } else {
        chunks
    }
}

fn trim_blank_edges(chunk: &mut Chunk) {
    let len = chunk.len();
    let start = (0..len).find(|&i| !chunk.is_blank_line(i)).unwrap_or(len);
    let end = (start..len)
        .rev()
        .find(|&i| !chunk.is_blank_line(i))
        .map_or(start, |i| i + 1);

    match chunk {
        Chunk::Prose(lines) => {
            lines.truncate(end);
            lines.drain(..start);
        }
        Chunk::Code { lines, .. } => {
            lines.truncate(end);
            lines.drain(..start);
        }
    }
}

fn starts_indented(line: &str) -> bool {
    line.starts_with(char::is_whitespace)
}

/// A code chunk ending on an indented line is unfinished; one starting on an
/// indented line finishes the previous code chunk.
fn mark_indented_continuations(chunks: &mut [Chunk]) {
    let mut last_code: Option<usize> = None;
    for i in 0..chunks.len() {
        let Chunk::Code { lines, continuation } = &mut chunks[i] else {
            continue;
        };
        if lines.last().is_some_and(|l| starts_indented(l)) {
            *continuation = Continuation::Continued;
        }
        let opens_indented = lines.first().is_some_and(|l| starts_indented(l));
        if opens_indented
            && let Some(prev) = last_code
            && let Chunk::Code { continuation, .. } = &mut chunks[prev]
        {
            *continuation = Continuation::Continued;
        }
        last_code = Some(i);
    }
}

fn flatten_continued(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());
    let mut continued = false;

    for chunk in chunks {
        let absorbed_continuation = match &chunk {
            Chunk::Code { continuation, .. } => Some(*continuation),
            Chunk::Prose(_) => None,
        };

        if continued
            && let Some(Chunk::Code {
                lines,
                continuation,
            }) = merged.last_mut()
        {
            match chunk {
                Chunk::Prose(prose) => lines.extend(prose.iter().map(ProseLine::to_comment)),
                Chunk::Code { lines: more, .. } => lines.extend(more),
            }
            if let Some(state) = absorbed_continuation {
                *continuation = state;
            }
        } else {
            merged.push(chunk);
        }

        if let Some(state) = absorbed_continuation {
            continued = state == Continuation::Continued;
        }
    }

    merged
}
