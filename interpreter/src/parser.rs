use std::ops::Range;

use crate::ast::{BinaryOperator, Expr, ExprKind, Program, Statement, StatementKind, UnaryOperator};
use crate::error::ParseError;
use crate::evaluator::MAX_DEPTH;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    StringLit(String),
    True,
    False,
    Unit,

    Ident(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,       // =
    EqEq,     // ==
    BangEq,   // !=
    Gt,
    Lt,
    GtEq,
    LtEq,
    AmpAmp,   // &&
    PipePipe, // ||
    Bang,     // !
    Question, // ?
    Colon,    // :
    Comma,

    // Grouping
    LParen,
    RParen,

    /// Newline outside parentheses, or `;`.
    Separator,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    span: Range<usize>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse one code block.
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = ExprParser::new(tokens, source.len());
    parser.parse_program()
}

// ---------------------------------------------------------------------------
// Text tokenizer: raw text string → Token stream
// ---------------------------------------------------------------------------

fn tokenize(text: &str) -> Result<Vec<Spanned>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut i = 0;
    let mut tokens = Vec::new();
    // Newlines only separate statements outside parentheses.
    let mut depth = 0usize;

    // Map character indices to byte offsets within the text
    let byte_pos: Vec<usize> = {
        let mut bp = Vec::with_capacity(len + 1);
        let mut offset = 0;
        for c in &chars {
            bp.push(offset);
            offset += c.len_utf8();
        }
        bp.push(offset);
        bp
    };

    while i < len {
        let c = chars[i];
        let start = i;
        let token = match c {
            ' ' | '\t' | '\r' => {
                i += 1;
                continue;
            }
            '\n' => {
                i += 1;
                if depth > 0 {
                    continue;
                }
                Token::Separator
            }
            ';' => {
                i += 1;
                Token::Separator
            }

            // Comment to end of line
            '#' => {
                while i < len && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }

            // String literal
            '"' => {
                i += 1;
                let mut s = String::new();
                loop {
                    if i >= len {
                        return Err(ParseError::error(
                            "unterminated string literal",
                            byte_pos[start]..byte_pos[len],
                        ));
                    }
                    match chars[i] {
                        '"' => {
                            i += 1;
                            break;
                        }
                        '\\' if i + 1 < len => {
                            let escaped = match chars[i + 1] {
                                'n' => '\n',
                                't' => '\t',
                                '"' => '"',
                                '\\' => '\\',
                                other => {
                                    return Err(ParseError::error(
                                        format!("unknown escape sequence '\\{}'", other),
                                        byte_pos[i]..byte_pos[i + 2],
                                    ));
                                }
                            };
                            s.push(escaped);
                            i += 2;
                        }
                        other => {
                            s.push(other);
                            i += 1;
                        }
                    }
                }
                Token::StringLit(s)
            }

            // Numbers
            '0'..='9' => {
                while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                match num_str.parse::<f64>() {
                    Ok(n) => Token::Number(n),
                    Err(_) => {
                        return Err(ParseError::error(
                            format!("invalid number '{}'", num_str),
                            byte_pos[start]..byte_pos[i],
                        ));
                    }
                }
            }

            // Identifiers and keywords
            'a'..='z' | 'A'..='Z' | '_' => {
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                match ident.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(ident),
                }
            }

            // Two-character operators
            '=' => {
                i += 1;
                if i < len && chars[i] == '=' {
                    i += 1;
                    Token::EqEq
                } else {
                    Token::Eq
                }
            }
            '!' => {
                i += 1;
                if i < len && chars[i] == '=' {
                    i += 1;
                    Token::BangEq
                } else {
                    Token::Bang
                }
            }
            '>' => {
                i += 1;
                if i < len && chars[i] == '=' {
                    i += 1;
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '<' => {
                i += 1;
                if i < len && chars[i] == '=' {
                    i += 1;
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            '&' | '|' => {
                i += 1;
                if i < len && chars[i] == c {
                    i += 1;
                    if c == '&' { Token::AmpAmp } else { Token::PipePipe }
                } else {
                    return Err(ParseError::error(
                        format!("unexpected character '{}'", c),
                        byte_pos[start]..byte_pos[i],
                    )
                    .with_note(format!("did you mean '{}{}'?", c, c)));
                }
            }

            // Single-character operators
            '+' => { i += 1; Token::Plus }
            '-' => { i += 1; Token::Minus }
            '*' => { i += 1; Token::Star }
            '/' => { i += 1; Token::Slash }
            '%' => { i += 1; Token::Percent }
            '?' => { i += 1; Token::Question }
            ':' => { i += 1; Token::Colon }
            ',' => { i += 1; Token::Comma }
            '(' => {
                i += 1;
                // Check for unit literal ()
                if i < len && chars[i] == ')' {
                    i += 1;
                    Token::Unit
                } else {
                    depth += 1;
                    Token::LParen
                }
            }
            ')' => {
                i += 1;
                depth = depth.saturating_sub(1);
                Token::RParen
            }

            _ => {
                return Err(ParseError::error(
                    format!("unexpected character '{}'", c),
                    byte_pos[start]..byte_pos[start + 1],
                ));
            }
        };
        tokens.push(Spanned {
            token,
            span: byte_pos[start]..byte_pos[i],
        });
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Pratt parser
// ---------------------------------------------------------------------------

struct ExprParser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Byte length of the source, used to locate end-of-input errors.
    end: usize,
    /// Current `parse_expr` nesting.
    depth: usize,
}

// Binding powers (precedence). Higher = tighter binding.
// Left bp, right bp. For left-assoc: right = left + 1. For right-assoc: right = left.
const BP_CONDITIONAL: u8 = 2;     // ? :
const BP_OR: u8 = 4;              // ||
const BP_AND: u8 = 6;             // &&
const BP_EQUALITY: u8 = 8;        // == !=
const BP_COMPARISON: u8 = 10;     // < > <= >=
const BP_ADDITIVE: u8 = 12;       // + -
const BP_MULTIPLICATIVE: u8 = 14; // * / %
const BP_UNARY: u8 = 16;          // ! -

impl ExprParser {
    fn new(tokens: Vec<Spanned>, end: usize) -> Self {
        ExprParser {
            tokens,
            pos: 0,
            end,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let t = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(t)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Span of the next token, or an empty span at the end of input.
    fn here(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.clone())
            .unwrap_or(self.end..self.end)
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::error(msg, self.here())
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<Range<usize>, ParseError> {
        match self.advance() {
            Some(t) if t.token == token => Ok(t.span),
            Some(t) => Err(ParseError::error(format!("expected {}", what), t.span)),
            None => Err(self.error(format!("expected {}, found end of input", what))),
        }
    }

    /// Check if the upcoming tokens are an assignment: ident = expr
    /// (ident followed by single `=`, not `==`)
    fn is_assignment(&self) -> bool {
        matches!(
            (
                self.tokens.get(self.pos).map(|t| &t.token),
                self.tokens.get(self.pos + 1).map(|t| &t.token)
            ),
            (Some(Token::Ident(_)), Some(Token::Eq))
        )
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        loop {
            while self.eat(&Token::Separator) {}
            if self.at_end() {
                break;
            }
            statements.push(self.parse_statement()?);
            if !self.at_end() && self.peek() != Some(&Token::Separator) {
                return Err(self.error("expected end of statement"));
            }
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        if self.is_assignment() {
            let Some(Spanned {
                token: Token::Ident(name),
                span,
            }) = self.advance()
            else {
                return Err(self.error("expected identifier"));
            };
            self.expect(Token::Eq, "'='")?;
            let value = self.parse_expr(0)?;
            let span = span.start..value.span.end;
            return Ok(Statement {
                kind: StatementKind::Assignment { name, value },
                span,
            });
        }

        let expr = self.parse_expr(0)?;
        Ok(Statement {
            span: expr.span.clone(),
            kind: StatementKind::Expression(expr),
        })
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let expr = self.parse_operators(min_bp);
        self.depth -= 1;
        expr
    }

    fn parse_operators(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_prefix()?;

        loop {
            let Some(token) = self.peek() else { break };
            let Some((l_bp, r_bp)) = infix_bp(token) else { break };

            if l_bp < min_bp {
                break;
            }

            // Special case: conditional operator (?)
            if *token == Token::Question {
                self.advance();
                let true_branch = self.parse_expr(0)?;
                self.expect(Token::Colon, "':' in conditional expression")?;
                let false_branch = self.parse_expr(r_bp)?;
                let span = left.span.start..false_branch.span.end;
                left = Expr {
                    kind: ExprKind::Conditional {
                        condition: Box::new(left),
                        true_branch: Box::new(true_branch),
                        false_branch: Box::new(false_branch),
                    },
                    span,
                };
                continue;
            }

            let operator = match token {
                Token::Plus => BinaryOperator::Addition,
                Token::Minus => BinaryOperator::Subtraction,
                Token::Star => BinaryOperator::Multiplication,
                Token::Slash => BinaryOperator::Division,
                Token::Percent => BinaryOperator::Modulo,
                Token::EqEq => BinaryOperator::Equality,
                Token::BangEq => BinaryOperator::Inequality,
                Token::Gt => BinaryOperator::GreaterThan,
                Token::Lt => BinaryOperator::LessThan,
                Token::GtEq => BinaryOperator::GreaterThanOrEqual,
                Token::LtEq => BinaryOperator::LessThanOrEqual,
                Token::AmpAmp => BinaryOperator::LogicalAnd,
                Token::PipePipe => BinaryOperator::LogicalOr,
                _ => return Err(self.error("unexpected infix operator")),
            };
            self.advance();
            let right = self.parse_expr(r_bp)?;

            let span = left.span.start..right.span.end;
            left = Expr {
                kind: ExprKind::BinaryOperation {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let Some(Spanned { token, span }) = self.advance() else {
            return Err(self.error("unexpected end of expression"));
        };

        let kind = match token {
            // Literals
            Token::Number(n) => ExprKind::NumberLiteral(n),
            Token::StringLit(s) => ExprKind::StringLiteral(s),
            Token::True => ExprKind::BooleanLiteral(true),
            Token::False => ExprKind::BooleanLiteral(false),
            Token::Unit => ExprKind::UnitLiteral,

            // Calls and references
            Token::Ident(name) => {
                if self.eat(&Token::Unit) {
                    let end = self.tokens[self.pos - 1].span.end;
                    return Ok(Expr {
                        kind: ExprKind::Call {
                            name,
                            arguments: Vec::new(),
                        },
                        span: span.start..end,
                    });
                }
                if self.eat(&Token::LParen) {
                    let (arguments, end) = self.parse_arguments()?;
                    return Ok(Expr {
                        kind: ExprKind::Call { name, arguments },
                        span: span.start..end,
                    });
                }
                ExprKind::VariableReference(name)
            }

            // Unary operators
            Token::Bang | Token::Minus => {
                let operator = if token == Token::Bang {
                    UnaryOperator::LogicalNot
                } else {
                    UnaryOperator::Negation
                };
                let operand = self.parse_expr(BP_UNARY)?;
                let span = span.start..operand.span.end;
                return Ok(Expr {
                    kind: ExprKind::UnaryOperation {
                        operator,
                        operand: Box::new(operand),
                    },
                    span,
                });
            }

            // Parenthesized expression
            Token::LParen => {
                if self.peek() == Some(&Token::RParen) {
                    let close = self.expect(Token::RParen, "')'")?;
                    return Ok(Expr {
                        kind: ExprKind::UnitLiteral,
                        span: span.start..close.end,
                    });
                }
                let expr = self.parse_expr(0)?;
                let close = self.expect(Token::RParen, "')'")?;
                return Ok(Expr {
                    kind: expr.kind,
                    span: span.start..close.end,
                });
            }

            other => {
                return Err(ParseError::error(
                    format!("unexpected {}", describe(&other)),
                    span,
                ));
            }
        };

        Ok(Expr { kind, span })
    }

    /// Arguments after an opening parenthesis, up to and including `)`.
    fn parse_arguments(&mut self) -> Result<(Vec<Expr>, usize), ParseError> {
        let mut arguments = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            let close = self.expect(Token::RParen, "')'")?;
            return Ok((arguments, close.end));
        }
        loop {
            arguments.push(self.parse_expr(0)?);
            if self.eat(&Token::Comma) {
                continue;
            }
            let close = self.expect(Token::RParen, "',' or ')' in argument list")?;
            return Ok((arguments, close.end));
        }
    }
}

fn infix_bp(token: &Token) -> Option<(u8, u8)> {
    match token {
        Token::Question => Some((BP_CONDITIONAL, BP_CONDITIONAL)),
        Token::PipePipe => Some((BP_OR, BP_OR + 1)),
        Token::AmpAmp => Some((BP_AND, BP_AND + 1)),
        Token::EqEq | Token::BangEq => Some((BP_EQUALITY, BP_EQUALITY + 1)),
        Token::Gt | Token::Lt | Token::GtEq | Token::LtEq => {
            Some((BP_COMPARISON, BP_COMPARISON + 1))
        }
        Token::Plus | Token::Minus => Some((BP_ADDITIVE, BP_ADDITIVE + 1)),
        Token::Star | Token::Slash | Token::Percent => {
            Some((BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1))
        }
        _ => None,
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Separator => "end of statement".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Eq => "'='".to_string(),
        other => format!("token {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> ExprKind {
        let program = parse_program(source).expect("parse failed");
        match &program.statements[0].kind {
            StatementKind::Expression(e) => e.kind.clone(),
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn precedence_follows_binding_power() {
        let ExprKind::BinaryOperation {
            operator, right, ..
        } = expr("1 + 2 * 3")
        else {
            panic!("expected binary operation");
        };
        assert_eq!(operator, BinaryOperator::Addition);
        assert!(matches!(
            right.kind,
            ExprKind::BinaryOperation {
                operator: BinaryOperator::Multiplication,
                ..
            }
        ));
    }

    #[test]
    fn statements_split_on_newline_and_semicolon() {
        let program = parse_program("a = 1; b = 2\n\nc").expect("parse failed");
        assert_eq!(program.statements.len(), 3);
        assert!(matches!(
            program.statements[0].kind,
            StatementKind::Assignment { .. }
        ));
    }

    #[test]
    fn newlines_inside_parentheses_are_ignored() {
        let program = parse_program("f(1,\n  2)\n").expect("parse failed");
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn comments_and_trailing_semicolon() {
        let program = parse_program("x = 1; # set x\n").expect("parse failed");
        assert_eq!(program.statements.len(), 1);
        let program = parse_program("# only a comment").expect("parse failed");
        assert!(program.statements.is_empty());
    }

    #[test]
    fn calls_with_and_without_arguments() {
        assert!(matches!(
            expr("f()"),
            ExprKind::Call { ref arguments, .. } if arguments.is_empty()
        ));
        assert!(matches!(
            expr("f( )"),
            ExprKind::Call { ref arguments, .. } if arguments.is_empty()
        ));
        assert!(matches!(
            expr("println(\"a\", 1 + 2)"),
            ExprKind::Call { ref arguments, .. } if arguments.len() == 2
        ));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            expr(r#""a\n\"b\"\\""#),
            ExprKind::StringLiteral("a\n\"b\"\\".to_string())
        );
    }

    #[test]
    fn conditional_is_right_associative() {
        let ExprKind::Conditional { false_branch, .. } = expr("a ? 1 : b ? 2 : 3") else {
            panic!("expected conditional");
        };
        assert!(matches!(false_branch.kind, ExprKind::Conditional { .. }));
    }

    #[test]
    fn spans_cover_the_expression() {
        let program = parse_program("x = 1 + foo").expect("parse failed");
        assert_eq!(program.statements[0].span, 0..11);
        let StatementKind::Assignment { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(value.span, 4..11);
    }

    #[test]
    fn errors_carry_spans() {
        let err = parse_program("x = \"open").unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!(err.span, 4..9);

        let err = parse_program("1 +").unwrap_err();
        assert_eq!(err.span, 3..3);

        let err = parse_program("a b").unwrap_err();
        assert_eq!(err.message, "expected end of statement");
        assert_eq!(err.span, 2..3);

        let err = parse_program("x = 1 @").unwrap_err();
        assert_eq!(err.span, 6..7);

        let err = parse_program("a ? b").unwrap_err();
        assert!(err.message.contains("':'"));
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let nested = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let err = parse_program(&nested).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");

        let negated = format!("x = {}1", "-".repeat(100_000));
        let err = parse_program(&negated).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");

        let chained = format!("x = {}1", "a ? 1 : ".repeat(10_000));
        assert!(parse_program(&chained).is_err());
    }

    #[test]
    fn moderate_nesting_parses() {
        let nested = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert!(matches!(expr(&nested), ExprKind::NumberLiteral(n) if n == 1.0));
        assert!(parse_program(&format!("{}1", "-".repeat(100))).is_ok());
    }
}
