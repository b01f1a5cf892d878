//! Restricted arithmetic evaluator for numeric metadata text.
//!
//! Metadata values such as `spacing=0.3` or `XResolution=1/0.065` arrive as
//! text. Only decimal literals, `+ - * /`, unary signs and parentheses are
//! accepted; everything else is rejected without being interpreted.

use thiserror::Error;

/// Maximum nesting of parentheses and unary signs.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("Empty expression")]
    Empty,

    #[error("Unexpected character '{ch}' at column {col}")]
    UnexpectedChar { ch: char, col: usize },

    #[error("Invalid number literal '{literal}' at column {col}")]
    InvalidNumber { literal: String, col: usize },

    #[error("Unexpected {found} at column {col}")]
    UnexpectedToken { found: String, col: usize },

    #[error("Expression nested deeper than {max} levels", max = MAX_DEPTH)]
    TooDeep,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Expression evaluates to a non-finite value")]
    NonFinite,
}

pub type Result<T> = std::result::Result<T, ExprError>;

/// Evaluate an arithmetic expression over numeric literals.
pub fn evaluate(text: &str) -> Result<f64> {
    let tokens = Lexer::new(text).tokenize()?;
    if matches!(tokens.first(), Some((Token::Eof, _))) {
        return Err(ExprError::Empty);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr(0)?;
    parser.expect_eof()?;

    if !value.is_finite() {
        return Err(ExprError::NonFinite);
    }
    Ok(value)
}

// ===========================================================================
// Tokenizer
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(v) => format!("number {}", v),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug)]
struct Lexer<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// `digits [. digits] [e|E [+|-] digits]` or `. digits [...]`
    fn number(&mut self) -> Result<Token> {
        let start = self.pos;
        let mut digits = self.skip_digits();
        if self.peek_byte() == Some(b'.') {
            self.pos += 1;
            digits += self.skip_digits();
        }
        if digits > 0 && matches!(self.peek_byte(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek_byte(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            digits = self.skip_digits();
        }

        let literal = &self.text[start..self.pos];
        if digits == 0 {
            return Err(ExprError::InvalidNumber {
                literal: literal.to_string(),
                col: start + 1,
            });
        }
        literal
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ExprError::InvalidNumber {
                literal: literal.to_string(),
                col: start + 1,
            })
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>> {
        let mut tokens = Vec::new();
        loop {
            while matches!(self.peek_byte(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                self.pos += 1;
            }
            let col = self.pos + 1;
            let Some(b) = self.peek_byte() else {
                tokens.push((Token::Eof, col));
                return Ok(tokens);
            };

            let token = match b {
                b'0'..=b'9' | b'.' => self.number()?,
                b'+' | b'-' | b'*' | b'/' | b'(' | b')' => {
                    self.pos += 1;
                    match b {
                        b'+' => Token::Plus,
                        b'-' => Token::Minus,
                        b'*' => Token::Star,
                        b'/' => Token::Slash,
                        b'(' => Token::LParen,
                        _ => Token::RParen,
                    }
                }
                _ => {
                    let ch = self.text[self.pos..].chars().next().unwrap_or('?');
                    return Err(ExprError::UnexpectedChar { ch, col });
                }
            };
            tokens.push((token, col));
        }
    }
}

// ===========================================================================
// Parser
// ===========================================================================

/// Recursive-descent evaluator.
///
/// ```text
/// expr  := term (('+' | '-') term)*
/// term  := unary (('*' | '/') unary)*
/// unary := ('+' | '-') unary | atom
/// atom  := number | '(' expr ')'
/// ```
struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> (Token, usize) {
        // Tokenizer always terminates the stream with Eof.
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> (Token, usize) {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self) -> ExprError {
        let (token, col) = self.peek();
        ExprError::UnexpectedToken {
            found: token.describe(),
            col,
        }
    }

    fn expect_eof(&self) -> Result<()> {
        match self.peek() {
            (Token::Eof, _) => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    fn expr(&mut self, depth: usize) -> Result<f64> {
        let mut value = self.term(depth)?;
        loop {
            match self.peek().0 {
                Token::Plus => {
                    self.bump();
                    value += self.term(depth)?;
                }
                Token::Minus => {
                    self.bump();
                    value -= self.term(depth)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self, depth: usize) -> Result<f64> {
        let mut value = self.unary(depth)?;
        loop {
            match self.peek().0 {
                Token::Star => {
                    self.bump();
                    value *= self.unary(depth)?;
                }
                Token::Slash => {
                    self.bump();
                    let divisor = self.unary(depth)?;
                    if divisor == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self, depth: usize) -> Result<f64> {
        if depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        match self.peek().0 {
            Token::Plus => {
                self.bump();
                self.unary(depth + 1)
            }
            Token::Minus => {
                self.bump();
                Ok(-self.unary(depth + 1)?)
            }
            _ => self.atom(depth),
        }
    }

    fn atom(&mut self, depth: usize) -> Result<f64> {
        match self.peek().0 {
            Token::Number(v) => {
                self.bump();
                Ok(v)
            }
            Token::LParen => {
                self.bump();
                let value = self.expr(depth + 1)?;
                match self.peek().0 {
                    Token::RParen => {
                        self.bump();
                        Ok(value)
                    }
                    _ => Err(self.unexpected()),
                }
            }
            _ => Err(self.unexpected()),
        }
    }
}
