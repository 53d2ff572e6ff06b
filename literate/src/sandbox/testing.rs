//! A line-command sandbox for exercising the engine and emitters.
//!
//! Each line is `<command> <argument>`:
//! `out` writes a line, `display` records a plain display request,
//! `plain`/`md`/`png` return a value, `set`/`get` keep state, `fail` faults.

use std::io::Write;

use crate::sandbox::{CapturingDisplay, Mime, Payload, Sandbox, Showable};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FakeValue {
    Plain(String),
    Markdown(String),
    Png(Vec<u8>),
}

impl Showable for FakeValue {
    fn show(&self, mime: Mime) -> Option<Payload> {
        match (self, mime) {
            (FakeValue::Plain(s), Mime::Plain) => Some(Payload::Text(s.clone())),
            (FakeValue::Markdown(s), Mime::Markdown) => Some(Payload::Text(s.clone())),
            (FakeValue::Markdown(s), Mime::Plain) => Some(Payload::Text(s.clone())),
            (FakeValue::Png(bytes), Mime::Png) => Some(Payload::Binary(bytes.clone())),
            (FakeValue::Png(_), Mime::Plain) => Some(Payload::Text("Png".to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("fake fault: {0}")]
pub(crate) struct FakeFault(String);

#[derive(Debug, Default)]
pub(crate) struct FakeSandbox {
    displays: Vec<CapturingDisplay>,
    stored: Option<String>,
    pub runs: usize,
}

impl FakeSandbox {
    pub(crate) fn display_depth(&self) -> usize {
        self.displays.len()
    }
}

impl Sandbox for FakeSandbox {
    type Value = FakeValue;
    type Error = FakeFault;

    fn push_display(&mut self, display: CapturingDisplay) {
        self.displays.push(display);
    }

    fn pop_display(&mut self) -> Option<CapturingDisplay> {
        self.displays.pop()
    }

    fn run(&mut self, code: &str, output: &mut dyn Write) -> Result<Option<FakeValue>, FakeFault> {
        self.runs += 1;
        let mut value = None;
        for line in code.lines() {
            let line = line.trim_end_matches(';');
            let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
            value = match command {
                "out" => {
                    writeln!(output, "{}", arg).map_err(|e| FakeFault(e.to_string()))?;
                    None
                }
                "display" => {
                    if let Some(display) = self.displays.last_mut() {
                        display.record(&FakeValue::Plain(arg.to_string()));
                    }
                    None
                }
                "plain" => Some(FakeValue::Plain(arg.to_string())),
                "md" => Some(FakeValue::Markdown(arg.to_string())),
                "png" => Some(FakeValue::Png(arg.as_bytes().to_vec())),
                "set" => {
                    self.stored = Some(arg.to_string());
                    None
                }
                "get" => self.stored.clone().map(FakeValue::Plain),
                "fail" => return Err(FakeFault(arg.to_string())),
                _ => None,
            };
        }
        Ok(value)
    }
}
