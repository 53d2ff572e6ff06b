use std::io::Write;

use literate::sandbox::CapturingDisplay;

use crate::ast::{BinaryOperator, Expr, ExprKind, UnaryOperator};
use crate::environment::Environment;
use crate::error::{Error, RuntimeError};
use crate::runtime_value::RuntimeValue;

pub(crate) const MAX_DEPTH: usize = 256;

/// Evaluate an expression node to produce a RuntimeValue.
///
/// Text printed by the program goes to `output`; `display(..)` requests go
/// to `display` when a sink is installed and are printed otherwise.
pub fn evaluate(
    expr: &Expr,
    env: &mut Environment,
    output: &mut dyn Write,
    mut display: Option<&mut CapturingDisplay>,
    depth: usize,
) -> Result<RuntimeValue, Error> {
    if depth > MAX_DEPTH {
        return Err(Error::runtime(RuntimeError::StackOverflow, expr.span.clone()));
    }
    let at = |error: RuntimeError| Error::runtime(error, expr.span.clone());

    match &expr.kind {
        // --- Literals ---
        ExprKind::NumberLiteral(n) => Ok(RuntimeValue::Number(*n)),
        ExprKind::StringLiteral(s) => Ok(RuntimeValue::String(s.clone())),
        ExprKind::BooleanLiteral(b) => Ok(RuntimeValue::Boolean(*b)),
        ExprKind::UnitLiteral => Ok(RuntimeValue::Unit),

        // --- References ---
        ExprKind::VariableReference(name) => env
            .get_variable(name)
            .cloned()
            .ok_or_else(|| at(RuntimeError::UndefinedVariable(name.clone()))),

        // --- Operations ---
        ExprKind::UnaryOperation { operator, operand } => {
            let val = evaluate(operand, env, output, display, depth + 1)?;
            match operator {
                UnaryOperator::Negation => {
                    let n = coerce_number(&val).map_err(at)?;
                    Ok(RuntimeValue::Number(-n))
                }
                UnaryOperator::LogicalNot => Ok(RuntimeValue::Boolean(val.is_falsy())),
            }
        }

        ExprKind::BinaryOperation {
            operator,
            left,
            right,
        } => {
            let l = evaluate(left, env, output, display.as_deref_mut(), depth + 1)?;
            // Logical operators only evaluate the right side when needed.
            match operator {
                BinaryOperator::LogicalAnd if l.is_falsy() => {
                    return Ok(RuntimeValue::Boolean(false));
                }
                BinaryOperator::LogicalOr if l.is_truthy() => {
                    return Ok(RuntimeValue::Boolean(true));
                }
                _ => {}
            }
            let r = evaluate(right, env, output, display, depth + 1)?;
            eval_binary_op(*operator, &l, &r).map_err(at)
        }

        // --- Conditional ---
        ExprKind::Conditional {
            condition,
            true_branch,
            false_branch,
        } => {
            let cond_val = evaluate(condition, env, output, display.as_deref_mut(), depth + 1)?;
            let branch = if cond_val.is_truthy() {
                true_branch
            } else {
                false_branch
            };
            evaluate(branch, env, output, display, depth + 1)
        }

        // --- Built-in call ---
        ExprKind::Call { name, arguments } => {
            let mut args = Vec::with_capacity(arguments.len());
            for argument in arguments {
                args.push(evaluate(
                    argument,
                    env,
                    output,
                    display.as_deref_mut(),
                    depth + 1,
                )?);
            }
            call_builtin(name, args, output, display).map_err(at)
        }
    }
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

fn call_builtin(
    name: &str,
    args: Vec<RuntimeValue>,
    output: &mut dyn Write,
    display: Option<&mut CapturingDisplay>,
) -> Result<RuntimeValue, RuntimeError> {
    match name {
        "print" => {
            write!(output, "{}", concat(&args)).map_err(io_error)?;
            Ok(RuntimeValue::Unit)
        }
        // Standard error shares the captured stream.
        "println" | "eprintln" => {
            writeln!(output, "{}", concat(&args)).map_err(io_error)?;
            Ok(RuntimeValue::Unit)
        }
        "display" => {
            let value = single(name, args)?;
            match display {
                Some(sink) => {
                    if value != RuntimeValue::Unit {
                        sink.record(&value);
                    }
                }
                None => writeln!(output, "{}", value.repr()).map_err(io_error)?,
            }
            Ok(RuntimeValue::Unit)
        }
        "md" => Ok(RuntimeValue::Markdown(source_text(name, args)?)),
        "html" => Ok(RuntimeValue::Html(source_text(name, args)?)),
        "svg" => Ok(RuntimeValue::Svg(source_text(name, args)?)),
        "string" => Ok(RuntimeValue::String(concat(&args))),
        "len" => match single(name, args)? {
            RuntimeValue::String(s)
            | RuntimeValue::Markdown(s)
            | RuntimeValue::Html(s)
            | RuntimeValue::Svg(s) => Ok(RuntimeValue::Number(s.chars().count() as f64)),
            other => Err(RuntimeError::TypeError {
                expected: "String".to_string(),
                got: other.type_name().to_string(),
            }),
        },
        "error" => Err(RuntimeError::Custom(single(name, args)?.to_string())),
        _ => Err(RuntimeError::UnknownFunction(name.to_string())),
    }
}

fn single(name: &str, mut args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    match args.len() {
        1 => Ok(args.remove(0)),
        got => Err(RuntimeError::Arity {
            name: name.to_string(),
            expected: 1,
            got,
        }),
    }
}

/// The single string argument of `md`, `html` and `svg`.
fn source_text(name: &str, args: Vec<RuntimeValue>) -> Result<String, RuntimeError> {
    match single(name, args)? {
        RuntimeValue::String(s) => Ok(s),
        other => Err(RuntimeError::TypeError {
            expected: "String".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn concat(args: &[RuntimeValue]) -> String {
    args.iter().map(|a| a.to_string()).collect()
}

fn io_error(e: std::io::Error) -> RuntimeError {
    RuntimeError::IoError(e.to_string())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn coerce_number(val: &RuntimeValue) -> Result<f64, RuntimeError> {
    match val {
        RuntimeValue::Number(n) => Ok(*n),
        other => Err(RuntimeError::TypeError {
            expected: "Number".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn eval_binary_op(
    op: BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<RuntimeValue, RuntimeError> {
    match op {
        BinaryOperator::Addition => match (left, right) {
            (RuntimeValue::Number(a), RuntimeValue::Number(b)) => {
                Ok(RuntimeValue::Number(a + b))
            }
            (RuntimeValue::String(a), RuntimeValue::String(b)) => {
                Ok(RuntimeValue::String(format!("{}{}", a, b)))
            }
            _ => Err(RuntimeError::TypeError {
                expected: "matching numeric or string types".to_string(),
                got: format!("{} + {}", left.type_name(), right.type_name()),
            }),
        },
        BinaryOperator::Subtraction => numeric_binop(left, right, |a, b| a - b),
        BinaryOperator::Multiplication => numeric_binop(left, right, |a, b| a * b),
        BinaryOperator::Division => {
            let a = coerce_number(left)?;
            let b = coerce_number(right)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(RuntimeValue::Number(a / b))
        }
        BinaryOperator::Modulo => {
            let a = coerce_number(left)?;
            let b = coerce_number(right)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(RuntimeValue::Number(a % b))
        }
        BinaryOperator::Equality => Ok(RuntimeValue::Boolean(left == right)),
        BinaryOperator::Inequality => Ok(RuntimeValue::Boolean(left != right)),
        BinaryOperator::GreaterThan => numeric_cmp(left, right, |a, b| a > b),
        BinaryOperator::LessThan => numeric_cmp(left, right, |a, b| a < b),
        BinaryOperator::GreaterThanOrEqual => numeric_cmp(left, right, |a, b| a >= b),
        BinaryOperator::LessThanOrEqual => numeric_cmp(left, right, |a, b| a <= b),
        BinaryOperator::LogicalAnd => {
            Ok(RuntimeValue::Boolean(left.is_truthy() && right.is_truthy()))
        }
        BinaryOperator::LogicalOr => {
            Ok(RuntimeValue::Boolean(left.is_truthy() || right.is_truthy()))
        }
    }
}

fn numeric_binop(
    left: &RuntimeValue,
    right: &RuntimeValue,
    f: impl Fn(f64, f64) -> f64,
) -> Result<RuntimeValue, RuntimeError> {
    let a = coerce_number(left)?;
    let b = coerce_number(right)?;
    Ok(RuntimeValue::Number(f(a, b)))
}

fn numeric_cmp(
    left: &RuntimeValue,
    right: &RuntimeValue,
    f: impl Fn(f64, f64) -> bool,
) -> Result<RuntimeValue, RuntimeError> {
    let a = coerce_number(left)?;
    let b = coerce_number(right)?;
    Ok(RuntimeValue::Boolean(f(a, b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StatementKind;
    use crate::parser::parse_program;

    fn eval(source: &str) -> Result<RuntimeValue, Error> {
        let program = parse_program(source).expect("parse failed");
        let StatementKind::Expression(expr) = &program.statements[0].kind else {
            panic!("expected expression");
        };
        let mut env = Environment::new();
        let mut output = Vec::new();
        evaluate(expr, &mut env, &mut output, None, 0)
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("2 + 3 * 4").unwrap(), RuntimeValue::Number(14.0));
        assert_eq!(eval("(2 + 3) * 4").unwrap(), RuntimeValue::Number(20.0));
        assert_eq!(eval("10 % 3").unwrap(), RuntimeValue::Number(1.0));
        assert_eq!(eval("-5 + 10").unwrap(), RuntimeValue::Number(5.0));
    }

    #[test]
    fn short_circuit_skips_right_side() {
        assert_eq!(eval("false && undefined").unwrap(), RuntimeValue::Boolean(false));
        assert_eq!(eval("true || undefined").unwrap(), RuntimeValue::Boolean(true));
        assert!(eval("true && undefined").is_err());
    }

    #[test]
    fn errors_point_at_the_failing_expression() {
        let err = eval("1 + (2 / 0)").unwrap_err();
        assert_eq!(
            err,
            Error::runtime(RuntimeError::DivisionByZero, 4..11)
        );
        let err = eval("1 + \"a\"").unwrap_err();
        assert!(err.to_string().contains("type error"));
    }

    #[test]
    fn builtins() {
        assert_eq!(
            eval("string(\"n = \", 1 + 1)").unwrap(),
            RuntimeValue::String("n = 2".to_string())
        );
        assert_eq!(eval("len(\"héllo\")").unwrap(), RuntimeValue::Number(5.0));
        assert_eq!(
            eval("md(\"*x*\")").unwrap(),
            RuntimeValue::Markdown("*x*".to_string())
        );
        assert!(matches!(
            eval("error(\"boom\")").unwrap_err(),
            Error::Runtime {
                error: RuntimeError::Custom(ref m),
                ..
            } if m == "boom"
        ));
        assert!(matches!(
            eval("len(1, 2)").unwrap_err(),
            Error::Runtime {
                error: RuntimeError::Arity { expected: 1, got: 2, .. },
                ..
            }
        ));
        assert!(matches!(
            eval("nope()").unwrap_err(),
            Error::Runtime {
                error: RuntimeError::UnknownFunction(_),
                ..
            }
        ));
    }

    #[test]
    fn display_records_into_the_sink() {
        let program = parse_program("display(md(\"**hi**\"))").expect("parse failed");
        let StatementKind::Expression(expr) = &program.statements[0].kind else {
            panic!("expected expression");
        };
        let mut env = Environment::new();
        let mut output = Vec::new();
        let mut sink = CapturingDisplay::new();
        let value = evaluate(expr, &mut env, &mut output, Some(&mut sink), 0).unwrap();
        assert_eq!(value, RuntimeValue::Unit);
        assert!(output.is_empty());
        assert_eq!(sink.into_requests().len(), 1);
    }
}
