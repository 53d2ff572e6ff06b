pub mod ast;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod parser;
pub mod runtime_value;
pub mod sandbox;

pub use environment::Environment;
pub use error::{Error, ParseError, RuntimeError};
pub use executor::{execute_program, run_source};
pub use parser::parse_program;
pub use runtime_value::RuntimeValue;
pub use sandbox::Interpreter;
