use serde::Deserialize;

use crate::Target;
use crate::error::Error;
use crate::notebook::Notebook;

/// Fallback for placeholders that have no configured value.
pub const UNKNOWN: &str = "<unknown>";

/// Generation settings. Resolved once by the caller (config file, command
/// line) and passed down; nothing below reads the environment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base name of the output, substituted for `@__NAME__`.
    pub name: Option<String>,
    /// Execute code blocks. Unset means: notebooks yes, documents no.
    pub execute: Option<bool>,
    /// Emit for the documentation tool (`@example` fences, `@ref` links).
    pub documenter: bool,
    /// Append the "generated using" footer.
    pub credit: bool,
    /// Keep prose as comments in the script target.
    pub keep_comments: bool,
    /// Opening and closing code fence for the markdown target.
    pub codefence: Option<(String, String)>,
    /// Language name used in fences and the notebook kernel descriptor.
    pub language: String,
    pub repo_root_url: Option<String>,
    pub nbviewer_root_url: Option<String>,
    pub binder_root_url: Option<String>,
    /// Source location shown by the documentation tool's edit link.
    pub edit_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: None,
            execute: None,
            documenter: false,
            credit: true,
            keep_comments: false,
            codefence: None,
            language: "lit".to_string(),
            repo_root_url: None,
            nbviewer_root_url: None,
            binder_root_url: None,
            edit_url: None,
        }
    }
}

impl Config {
    /// Parse a TOML configuration file.
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        toml::from_str(source).map_err(|e| Error::configuration(format!("invalid config: {}", e)))
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN)
    }

    /// Whether code blocks run for `target`.
    pub fn execute_for(&self, target: Target) -> bool {
        match target {
            Target::Script => false,
            Target::Markdown => self.execute.unwrap_or(false),
            Target::Notebook => self.execute.unwrap_or(true),
        }
    }

    /// The fence pair used around code in the markdown target.
    pub fn codefence(&self) -> (String, String) {
        if let Some((open, close)) = &self.codefence {
            return (open.clone(), close.clone());
        }
        if self.documenter {
            (format!("```@example {}", self.name()), "```".to_string())
        } else {
            (format!("```{}", self.language), "```".to_string())
        }
    }
}

type TextHook = Box<dyn Fn(String) -> String>;
type NotebookHook = Box<dyn Fn(Notebook) -> Notebook>;

/// User-supplied rewrites run before filtering and after emitting.
pub struct Hooks {
    pub preprocess: TextHook,
    pub postprocess: TextHook,
    pub postprocess_notebook: NotebookHook,
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks {
            preprocess: Box::new(|s| s),
            postprocess: Box::new(|s| s),
            postprocess_notebook: Box::new(|nb| nb),
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
