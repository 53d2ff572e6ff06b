pub mod chunk;
pub mod config;
pub mod directive;
pub mod emit;
pub mod error;
pub mod notebook;
pub mod sandbox;

pub use config::{Config, Hooks};
pub use error::{Error, ExecutionError};
pub use notebook::Notebook;
pub use sandbox::{ExecutionResult, Sandbox, execute};

use std::fmt;

/// The artifact a source file is converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A plain script containing only the code.
    Script,
    /// A markdown document interleaving prose and fenced code.
    Markdown,
    /// A notebook with one cell per chunk.
    Notebook,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Script, Target::Markdown, Target::Notebook];

    /// The directive tag selecting this target (`#md`, `#nb`, `#jl`).
    pub fn tag(self) -> &'static str {
        match self {
            Target::Script => "jl",
            Target::Markdown => "md",
            Target::Notebook => "nb",
        }
    }

    /// Whether `#+` continuation survives chunking for this target.
    /// Notebooks cannot join cells, so continued runs are flattened instead.
    pub fn allows_continuation(self) -> bool {
        !matches!(self, Target::Notebook)
    }

    /// File extension of the generated artifact, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Target::Script => "lit",
            Target::Markdown => "md",
            Target::Notebook => "ipynb",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Script => write!(f, "script"),
            Target::Markdown => write!(f, "markdown"),
            Target::Notebook => write!(f, "notebook"),
        }
    }
}
