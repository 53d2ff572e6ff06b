//! The execution/capture engine.
//!
//! Concrete runtimes plug in through [`Sandbox`]; the rest of the pipeline
//! only sees [`ExecutionResult`]s and MIME bundles.

mod mime;
#[cfg(test)]
pub(crate) mod testing;

pub use mime::{Mime, MimeBundle, Payload, Showable};

use std::io::Write;

use crate::error::ExecutionError;

/// Records explicit display requests instead of showing them.
#[derive(Debug, Default)]
pub struct CapturingDisplay {
    requests: Vec<MimeBundle>,
}

impl CapturingDisplay {
    pub fn new() -> Self {
        CapturingDisplay::default()
    }

    /// Record every representation `value` can be shown in.
    pub fn record(&mut self, value: &dyn Showable) {
        self.requests.push(value.mime_bundle());
    }

    pub fn into_requests(self) -> Vec<MimeBundle> {
        self.requests
    }
}

/// A persistent execution context for one generation run.
///
/// State set by one block is visible to every later block. A sandbox is
/// owned by exactly one run and never shared.
pub trait Sandbox {
    /// Values returned by a block.
    type Value: Showable;
    /// Faults raised by a block.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Route explicit display requests into `display` until popped.
    fn push_display(&mut self, display: CapturingDisplay);

    /// Remove the most recently pushed display.
    fn pop_display(&mut self) -> Option<CapturingDisplay>;

    /// Run `code`, writing standard output and error into `output`.
    /// `Ok(None)` means the block produced no value.
    fn run(
        &mut self,
        code: &str,
        output: &mut dyn Write,
    ) -> Result<Option<Self::Value>, Self::Error>;

    /// Whether the block's value is suppressed by a trailing `;`.
    fn suppresses_result(&self, code: &str) -> bool {
        ends_with_semicolon(code)
    }
}

/// The outcome of executing one code block.
#[derive(Debug)]
pub struct ExecutionResult<V> {
    /// Interleaved standard output and error.
    pub output: String,
    /// The returned value, absent when nothing was produced or it was
    /// suppressed.
    pub value: Option<V>,
    /// Explicit display requests, in order.
    pub displays: Vec<MimeBundle>,
}

/// Pops the capturing display when dropped, so a panicking block cannot
/// leave it installed.
struct DisplayScope<'a, S: Sandbox> {
    sandbox: &'a mut S,
    active: bool,
}

impl<'a, S: Sandbox> DisplayScope<'a, S> {
    fn push(sandbox: &'a mut S) -> Self {
        sandbox.push_display(CapturingDisplay::new());
        DisplayScope {
            sandbox,
            active: true,
        }
    }

    fn finish(mut self) -> Vec<MimeBundle> {
        self.active = false;
        self.sandbox
            .pop_display()
            .map(CapturingDisplay::into_requests)
            .unwrap_or_default()
    }
}

impl<S: Sandbox> Drop for DisplayScope<'_, S> {
    fn drop(&mut self) {
        if self.active {
            self.sandbox.pop_display();
        }
    }
}

/// Execute `code` once inside `sandbox`.
pub fn execute<S: Sandbox>(
    sandbox: &mut S,
    code: &str,
) -> Result<ExecutionResult<S::Value>, ExecutionError> {
    let mut output = Vec::new();

    let scope = DisplayScope::push(sandbox);
    let outcome = scope.sandbox.run(code, &mut output);
    let displays = scope.finish();

    let value = outcome.map_err(|e| ExecutionError {
        code: code.to_string(),
        source: Box::new(e),
    })?;
    let value = if sandbox.suppresses_result(code) {
        None
    } else {
        value
    };

    Ok(ExecutionResult {
        output: String::from_utf8_lossy(&output).into_owned(),
        value,
        displays,
    })
}

/// True when the last code on the last non-blank line is followed by `;`.
/// Comments (`#` outside string literals) are ignored.
pub fn ends_with_semicolon(code: &str) -> bool {
    code.lines()
        .rev()
        .map(|line| strip_comment(line).trim_end())
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.ends_with(';'))
}

fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::testing::FakeSandbox;

    #[test]
    fn semicolon_detection_ignores_comments_and_blank_lines() {
        assert!(ends_with_semicolon("x = 1;"));
        assert!(ends_with_semicolon("x = 1;  # quiet\n\n"));
        assert!(!ends_with_semicolon("x = 1"));
        assert!(!ends_with_semicolon("a = 1;\nb = 2"));
        assert!(!ends_with_semicolon("s = \"a;\" # c;"));
        assert!(!ends_with_semicolon(""));
    }

    #[test]
    fn captures_output_value_and_displays() {
        let mut sandbox = FakeSandbox::default();
        let result = execute(&mut sandbox, "out hello\ndisplay shown\nplain 42").unwrap();
        assert_eq!(result.output, "hello\n");
        assert_eq!(result.displays.len(), 1);
        assert_eq!(
            result.displays[0].get(&Mime::Plain),
            Some(&Payload::Text("shown".to_string()))
        );
        assert_eq!(
            result.value.unwrap().show(Mime::Plain),
            Some(Payload::Text("42".to_string()))
        );
        assert_eq!(sandbox.display_depth(), 0);
    }

    #[test]
    fn trailing_semicolon_suppresses_value_not_output() {
        let mut sandbox = FakeSandbox::default();
        let result = execute(&mut sandbox, "out noisy\nplain 42;").unwrap();
        assert!(result.value.is_none());
        assert_eq!(result.output, "noisy\n");
    }

    #[test]
    fn fault_carries_code_and_pops_display() {
        let mut sandbox = FakeSandbox::default();
        let err = execute(&mut sandbox, "display first\nfail boom").unwrap_err();
        assert_eq!(err.code, "display first\nfail boom");
        assert!(err.to_string().contains("boom"));
        assert_eq!(sandbox.display_depth(), 0);

        // A later block starts with a fresh sink.
        let result = execute(&mut sandbox, "plain 1").unwrap();
        assert!(result.displays.is_empty());
    }

    #[test]
    fn state_persists_between_blocks() {
        let mut sandbox = FakeSandbox::default();
        execute(&mut sandbox, "set x").unwrap();
        let result = execute(&mut sandbox, "get").unwrap();
        assert_eq!(
            result.value.unwrap().show(Mime::Plain),
            Some(Payload::Text("x".to_string()))
        );
    }
}
