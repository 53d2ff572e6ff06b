/// Errors surfaced by a generation run. None of them are retried; the
/// artifact is either produced in full or not at all.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or unreadable source.
    #[error("input error: {0}")]
    Input(String),

    /// Conflicting cell metadata, identical input/output paths, bad config.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A code block faulted while executing.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A structured payload could not be (de)serialized.
    #[error("serialization error: {context}: {source}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Serialization {
            context: context.into(),
            source,
        }
    }
}

/// A code block raised during execution. Carries the offending code so the
/// caller can point at it.
#[derive(Debug, thiserror::Error)]
#[error("{source}\nwhen executing the following code block\n\n```\n{code}\n```")]
pub struct ExecutionError {
    pub code: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}
