use std::collections::HashMap;

use crate::runtime_value::RuntimeValue;

/// Global variables of one interpreter session. Blocks share a single
/// scope, so a value assigned in one block is visible to every later one.
#[derive(Debug, Default)]
pub struct Environment {
    variables: HashMap<String, RuntimeValue>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn get_variable(&self, name: &str) -> Option<&RuntimeValue> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: &str, value: RuntimeValue) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_overwrite() {
        let mut env = Environment::new();
        assert!(!env.has_variable("x"));
        env.set_variable("x", RuntimeValue::Number(1.0));
        env.set_variable("x", RuntimeValue::Number(2.0));
        assert_eq!(env.get_variable("x"), Some(&RuntimeValue::Number(2.0)));
        env.set_variable("a", RuntimeValue::Unit);
        assert!(env.has_variable("a"));
    }
}
