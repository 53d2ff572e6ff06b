pub mod normalize;
pub mod parser;

pub use normalize::normalize;
pub use parser::parse;

/// Whether a code block runs on into the next code chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    #[default]
    Terminated,
    /// The block is unfinished; targets that support it join it with the
    /// next code chunk.
    Continued,
}

/// One prose line with its marker removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProseLine {
    /// Whitespace before the marker, kept for rewrapping as a comment.
    pub indent: String,
    pub text: String,
}

impl ProseLine {
    pub fn new(indent: impl Into<String>, text: impl Into<String>) -> Self {
        ProseLine {
            indent: indent.into(),
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    /// The line in comment form: `indent# text`, without trailing whitespace.
    pub fn to_comment(&self) -> String {
        format!("{}# {}", self.indent, self.text).trim_end().to_string()
    }
}

/// A maximal run of same-kind source lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Prose(Vec<ProseLine>),
    Code {
        lines: Vec<String>,
        continuation: Continuation,
    },
}

impl Chunk {
    pub fn prose() -> Self {
        Chunk::Prose(Vec::new())
    }

    pub fn code() -> Self {
        Chunk::Code {
            lines: Vec::new(),
            continuation: Continuation::Terminated,
        }
    }

    pub fn is_prose(&self) -> bool {
        matches!(self, Chunk::Prose(_))
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Chunk::Code { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            Chunk::Prose(lines) => lines.len(),
            Chunk::Code { lines, .. } => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_continued(&self) -> bool {
        matches!(
            self,
            Chunk::Code {
                continuation: Continuation::Continued,
                ..
            }
        )
    }

    /// An empty chunk of the same kind.
    pub(crate) fn empty_like(&self) -> Self {
        match self {
            Chunk::Prose(_) => Chunk::prose(),
            Chunk::Code { .. } => Chunk::code(),
        }
    }

    /// True when every line carries no content (also for empty chunks).
    pub fn is_blank(&self) -> bool {
        match self {
            Chunk::Prose(lines) => lines.iter().all(ProseLine::is_blank),
            Chunk::Code { lines, .. } => lines.iter().all(String::is_empty),
        }
    }

    /// Whether line `index` is blank.
    pub fn is_blank_line(&self, index: usize) -> bool {
        match self {
            Chunk::Prose(lines) => lines[index].is_blank(),
            Chunk::Code { lines, .. } => lines[index].is_empty(),
        }
    }
}
