use std::io::Write;

use literate::Sandbox;
use literate::sandbox::CapturingDisplay;

use crate::environment::Environment;
use crate::error::Error;
use crate::executor::run_source;
use crate::runtime_value::RuntimeValue;

/// A persistent `lit` session usable as a generation sandbox.
#[derive(Debug, Default)]
pub struct Interpreter {
    env: Environment,
    displays: Vec<CapturingDisplay>,
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::default()
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }
}

impl Sandbox for Interpreter {
    type Value = RuntimeValue;
    type Error = Error;

    fn push_display(&mut self, display: CapturingDisplay) {
        self.displays.push(display);
    }

    fn pop_display(&mut self) -> Option<CapturingDisplay> {
        self.displays.pop()
    }

    /// `()` counts as no value.
    fn run(&mut self, code: &str, output: &mut dyn Write) -> Result<Option<RuntimeValue>, Error> {
        let value = run_source(code, &mut self.env, output, self.displays.last_mut())?;
        Ok(match value {
            RuntimeValue::Unit => None,
            value => Some(value),
        })
    }
}
