use std::fmt;

use literate::sandbox::{Mime, Payload, Showable};
use pulldown_cmark::{Event, Parser, TagEnd};

/// A runtime value produced by evaluating an expression.
#[derive(Debug, Clone)]
pub enum RuntimeValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Unit,
    /// Markdown source built with `md(..)`.
    Markdown(String),
    /// HTML source built with `html(..)`.
    Html(String),
    /// SVG image source built with `svg(..)`.
    Svg(String),
}

impl RuntimeValue {
    pub fn is_truthy(&self) -> bool {
        !self.is_falsy()
    }

    pub fn is_falsy(&self) -> bool {
        matches!(self, RuntimeValue::Boolean(false) | RuntimeValue::Unit)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Number(_) => "Number",
            RuntimeValue::Boolean(_) => "Boolean",
            RuntimeValue::String(_) => "String",
            RuntimeValue::Unit => "Unit",
            RuntimeValue::Markdown(_) => "Markdown",
            RuntimeValue::Html(_) => "Html",
            RuntimeValue::Svg(_) => "Svg",
        }
    }

    /// The representation shown as a block's result: strings quoted,
    /// everything else as printed.
    pub fn repr(&self) -> String {
        match self {
            RuntimeValue::String(s) => format!("{:?}", s),
            RuntimeValue::Markdown(s) => markdown_text(s),
            RuntimeValue::Svg(s) => format!("Svg({} bytes)", s.len()),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Number(n) => {
                if n.is_finite() && *n == n.floor() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            RuntimeValue::Boolean(b) => write!(f, "{}", b),
            RuntimeValue::String(s) => write!(f, "{}", s),
            RuntimeValue::Unit => write!(f, "()"),
            RuntimeValue::Markdown(s) | RuntimeValue::Html(s) | RuntimeValue::Svg(s) => {
                write!(f, "{}", s)
            }
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeValue::Number(a), RuntimeValue::Number(b)) => a == b, // NaN != NaN per IEEE 754
            (RuntimeValue::Boolean(a), RuntimeValue::Boolean(b)) => a == b,
            (RuntimeValue::String(a), RuntimeValue::String(b)) => a == b,
            (RuntimeValue::Unit, RuntimeValue::Unit) => true,
            (RuntimeValue::Markdown(a), RuntimeValue::Markdown(b)) => a == b,
            (RuntimeValue::Html(a), RuntimeValue::Html(b)) => a == b,
            (RuntimeValue::Svg(a), RuntimeValue::Svg(b)) => a == b,
            _ => false,
        }
    }
}

impl Showable for RuntimeValue {
    fn show(&self, mime: Mime) -> Option<Payload> {
        let text = match (self, mime) {
            (RuntimeValue::Unit, _) => return None,
            (_, Mime::Plain) => self.repr(),
            (RuntimeValue::Markdown(s), Mime::Markdown) => s.clone(),
            (RuntimeValue::Html(s), Mime::Html) => s.clone(),
            (RuntimeValue::Svg(s), Mime::Svg) => s.clone(),
            _ => return None,
        };
        Some(Payload::Text(text))
    }
}

/// The visible text of a markdown fragment: markup dropped, blocks on
/// their own lines.
pub fn markdown_text(source: &str) -> String {
    let mut text = String::new();
    for event in Parser::new(source) {
        match event {
            Event::Text(s) | Event::Code(s) => text.push_str(&s),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => {
                if !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }
    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_without_trailing_zero() {
        assert_eq!(RuntimeValue::Number(3.0).to_string(), "3");
        assert_eq!(RuntimeValue::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn strings_are_quoted_as_results() {
        let value = RuntimeValue::String("hi \"there\"".to_string());
        assert_eq!(value.to_string(), "hi \"there\"");
        assert_eq!(
            value.show(Mime::Plain),
            Some(Payload::Text("\"hi \\\"there\\\"\"".to_string()))
        );
    }

    #[test]
    fn markdown_offers_source_and_text() {
        let value = RuntimeValue::Markdown("# Title\n\nSome **bold** `code`.".to_string());
        let bundle = value.mime_bundle();
        assert_eq!(
            bundle.get(&Mime::Markdown),
            Some(&Payload::Text("# Title\n\nSome **bold** `code`.".to_string()))
        );
        assert_eq!(
            bundle.get(&Mime::Plain),
            Some(&Payload::Text("Title\nSome bold code.".to_string()))
        );
        assert_eq!(bundle.len(), 2);
    }

    #[test]
    fn svg_is_an_image() {
        let value = RuntimeValue::Svg("<svg/>".to_string());
        assert_eq!(value.show(Mime::Svg), Some(Payload::Text("<svg/>".to_string())));
        assert_eq!(value.show(Mime::Png), None);
        assert_eq!(value.show(Mime::Markdown), None);
    }

    #[test]
    fn unit_shows_nothing() {
        assert!(RuntimeValue::Unit.mime_bundle().is_empty());
    }
}
