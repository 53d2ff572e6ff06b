use crate::chunk::{Chunk, ProseLine};

/// Render chunks as a plain script. Prose survives only as comments and
/// only when `keep_comments` is set.
pub fn emit(chunks: &[Chunk], keep_comments: bool) -> String {
    let mut out = String::new();
    for chunk in chunks {
        match chunk {
            Chunk::Code { lines, .. } => {
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
            }
            Chunk::Prose(lines) if keep_comments => {
                for line in lines.iter().map(ProseLine::to_comment) {
                    out.push_str(&line);
                    out.push('\n');
                }
                out.push('\n');
            }
            Chunk::Prose(_) => {}
        }
    }

    let trimmed = out.trim_end_matches('\n');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}
