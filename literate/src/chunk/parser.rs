use crate::chunk::{Chunk, Continuation, ProseLine};
use crate::directive::Directive;

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Line {
    /// `#-`: start a new chunk of the current kind.
    Split,
    /// `#+`: start a new code chunk continuing the previous one.
    SplitContinued,
    Prose(ProseLine),
    Code(String),
}

fn classify(line: &str) -> Line {
    let rest = line.trim_start();
    let indent = &line[..line.len() - rest.len()];

    // Anything after a split marker is ignored.
    match rest.get(..2).and_then(Directive::parse) {
        Some(Directive::Split) => return Line::Split,
        Some(Directive::SplitContinued) => return Line::SplitContinued,
        _ => {}
    }
    if rest == "#" {
        return Line::Prose(ProseLine::new(indent, ""));
    }
    if let Some(text) = rest.strip_prefix("# ") {
        return Line::Prose(ProseLine::new(indent, text));
    }
    // `##` escapes a comment that belongs to the code: drop one marker.
    if rest == "##" || rest.starts_with("## ") {
        return Line::Code(format!("{}{}", indent, &rest[1..]));
    }
    Line::Code(line.to_string())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Partition filtered text into prose and code chunks.
///
/// With `allow_continuation` unset, `#+` still splits but does not mark the
/// previous code chunk as continued.
pub fn parse(text: &str, allow_continuation: bool) -> Vec<Chunk> {
    let first = text.lines().next().unwrap_or("");
    let mut chunks = vec![match classify(first) {
        Line::Prose(_) => Chunk::prose(),
        _ => Chunk::code(),
    }];

    for line in text.lines() {
        match classify(line) {
            Line::Split => {
                // Kind follows the current chunk; a wrong guess is left
                // empty and dropped during normalization.
                let next = chunks.last().map(Chunk::empty_like).unwrap_or_else(Chunk::code);
                chunks.push(next);
            }
            Line::SplitContinued => {
                chunks.push(Chunk::code());
                if allow_continuation {
                    mark_last_code_continued(&mut chunks);
                }
            }
            Line::Prose(prose) => {
                if !matches!(chunks.last(), Some(Chunk::Prose(_))) {
                    chunks.push(Chunk::prose());
                }
                if let Some(Chunk::Prose(lines)) = chunks.last_mut() {
                    lines.push(prose);
                }
            }
            Line::Code(code) => {
                if !matches!(chunks.last(), Some(Chunk::Code { .. })) {
                    chunks.push(Chunk::code());
                }
                if let Some(Chunk::Code { lines, .. }) = chunks.last_mut() {
                    lines.push(code);
                }
            }
        }
    }

    chunks
}

/// Mark the most recent code chunk before the one just opened.
fn mark_last_code_continued(chunks: &mut [Chunk]) {
    let opened = chunks.len() - 1;
    if let Some(Chunk::Code { continuation, .. }) =
        chunks[..opened].iter_mut().rev().find(|c| c.is_code())
    {
        *continuation = Continuation::Continued;
    }
}
