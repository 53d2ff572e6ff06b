use std::io::Write;

use literate::sandbox::CapturingDisplay;

use crate::ast::{Program, StatementKind};
use crate::environment::Environment;
use crate::error::Error;
use crate::evaluator::evaluate;
use crate::parser::parse_program;
use crate::runtime_value::RuntimeValue;

/// Execute a parsed program statement by statement. The value of the last
/// statement is the program's value; an empty program yields `()`.
pub fn execute_program(
    program: &Program,
    env: &mut Environment,
    output: &mut dyn Write,
    mut display: Option<&mut CapturingDisplay>,
) -> Result<RuntimeValue, Error> {
    let mut last = RuntimeValue::Unit;
    for statement in &program.statements {
        last = match &statement.kind {
            StatementKind::Assignment { name, value } => {
                let value = evaluate(value, env, output, display.as_deref_mut(), 0)?;
                env.set_variable(name, value.clone());
                value
            }
            StatementKind::Expression(expr) => {
                evaluate(expr, env, output, display.as_deref_mut(), 0)?
            }
        };
    }
    Ok(last)
}

/// Parse and execute `source` in `env`.
pub fn run_source(
    source: &str,
    env: &mut Environment,
    output: &mut dyn Write,
    display: Option<&mut CapturingDisplay>,
) -> Result<RuntimeValue, Error> {
    let program = parse_program(source)?;
    execute_program(&program, env, output, display)
}
