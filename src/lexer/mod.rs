//! Character stream → token stream.
//!
//! The lexer is whitespace sensitive (newline runs collapse to one
//! [`Token::Newline`] carrying the following line's indent) and supports
//! re-entry mid-string for interpolation: when [`Lexer::next_token`] meets an
//! unescaped `{` inside a string literal it returns a
//! [`Token::StringLiteral`] with `interpolation: true` and leaves its cursor
//! positioned just past the brace. The parser consumes an expression and the
//! matching `}`, then calls [`Lexer::continue_string_token`] to resume
//! scanning the string body — see `src/parser/mod.rs` for the other half of
//! this protocol.
mod span;
mod token;

pub use span::{Location, Span};
pub use token::Token;

use std::{
    error::Error,
    fmt::{self, Display},
    iter::Peekable,
    str::Chars,
};

use colored::Colorize;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Operator characters from which [`Token::Symbol`] runs are built, beyond
/// the ASCII set named in the specification (`- & | : % ^ @ ? * / + !`) this
/// also accepts `< > = ~`, since `:=`, `==`, comparisons, and the generic
/// brackets all need a home in the symbol character class; see SPEC_FULL.md.
const ASCII_SYMBOL_CHARS: &[char] = &[
    '-', '&', '|', ':', '%', '^', '@', '?', '*', '/', '+', '!', '<', '>', '=', '~',
];

static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "dialect", "import", "def", "var", "type", "method", "class", "inherits", "return",
        "self", "super", "outer", "true", "false", "done", "object", "prefix",
    ]
    .into_iter()
    .collect()
});

fn is_symbol_char(c: char) -> bool {
    ASCII_SYMBOL_CHARS.contains(&c) || (!c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace())
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\'' || c == '′'
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub location: Location,
    source: String,
}

pub type LexResult<T> = Result<T, LexError>;

impl Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Location { line, column } = self.location;
        let lines: Vec<&str> = self.source.lines().collect();
        let prev_line = if line > 1 { lines.get(line - 2).copied().unwrap_or("") } else { "" };
        let this_line = lines.get(line.saturating_sub(1)).copied().unwrap_or("");

        let margin = format!("{line}").len();
        let fill = " ".repeat(margin);
        let pad = " ".repeat(column.saturating_sub(1));
        let caret = "^".to_string().red();

        write!(
            f,
            "{fill} |{prev_line}\n{line} |{this_line}\n{fill} |{pad}{caret} {}",
            self.message
        )
    }
}

impl Error for LexError {}

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    iterator: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            iterator: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn here(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            location: self.here(),
            source: self.source.to_owned(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.iterator.peek().copied()
    }

    fn peek_second(&self) -> Option<char> {
        let mut clone = self.iterator.clone();
        clone.next();
        clone.next()
    }

    fn bump(&mut self) -> Option<char> {
        let next = self.iterator.next()?;
        if next == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(next)
    }

    /// Skip spaces and `//` comments on the current line only; does not
    /// consume the newline itself. Returns an error on a bare tab.
    fn skip_line_trivia(&mut self) -> LexResult<()> {
        loop {
            match self.peek() {
                Some(' ') => {
                    self.bump();
                }
                Some('\t') => return Err(self.error("tabs are not allowed for indentation")),
                Some('/') if self.peek_second() == Some('/') => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        if self.peek() == Some('\r') {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Consume exactly one newline (`\n` or `\r\n`); errors on a bare `\r`.
    fn eat_newline(&mut self) -> LexResult<()> {
        match self.peek() {
            Some('\r') => {
                self.bump();
                if self.peek() == Some('\n') {
                    self.bump();
                    Ok(())
                } else {
                    Err(self.error("stray carriage return"))
                }
            }
            Some('\n') => {
                self.bump();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Skip all leading trivia before a token. If at least one newline was
    /// consumed, returns the indent (leading-space count) of the next
    /// non-blank line, collapsing any number of blank/comment-only lines
    /// into that single measurement.
    fn skip_trivia(&mut self) -> LexResult<Option<usize>> {
        self.skip_line_trivia()?;
        if !matches!(self.peek(), Some('\n') | Some('\r')) {
            return Ok(None);
        }

        loop {
            self.eat_newline()?;

            let start_column = self.column;
            self.skip_line_trivia()?;
            let indent = self.column - start_column;

            match self.peek() {
                Some('\n') | Some('\r') => continue,
                _ => return Ok(Some(indent)),
            }
        }
    }

    /// Produce the next token, or `None` at end of input for callers that
    /// want to stop rather than see repeated `EndOfInput` tokens.
    pub fn next_token(&mut self) -> LexResult<Token> {
        let location_before_trivia = self.here();
        if let Some(indent) = self.skip_trivia()? {
            return Ok(Token::Newline { indent, location: location_before_trivia });
        }

        let spaced = self.column != location_before_trivia.column || self.line != location_before_trivia.line;
        let location = self.here();

        let Some(next) = self.peek() else {
            return Ok(Token::EndOfInput { location });
        };

        match next {
            c if is_identifier_start(c) => self.lex_identifier(location),
            '0'..='9' => self.lex_number(location),
            '"' => self.lex_string_body(location, false),
            '.' if self.peek_second() != Some('.') && !self.peek_second().map(|c| c.is_ascii_digit()).unwrap_or(false) => {
                self.bump();
                Ok(Token::Punctuation { value: ".".into(), spaced, location })
            }
            c if is_symbol_char(c) => self.lex_symbol(location, spaced),
            c if "(){},;[]".contains(c) => {
                self.bump();
                Ok(Token::Punctuation { value: c.to_string(), spaced, location })
            }
            other => Err(self.error(format!("unrecognised character '{other}'"))),
        }
    }

    fn lex_identifier(&mut self, location: Location) -> LexResult<Token> {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if is_identifier_continue(c) {
                value.push(c);
                self.bump();
            } else {
                break;
            }
        }

        if KEYWORDS.contains(value.as_str()) {
            Ok(Token::Keyword { value, location })
        } else {
            Ok(Token::Identifier { value, location })
        }
    }

    fn lex_number(&mut self, location: Location) -> LexResult<Token> {
        let mut value = String::new();
        let leading_zero = self.peek() == Some('0');

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                value.push(c);
                self.bump();
            } else {
                break;
            }
        }

        // base-prefixed literal: NxDIGITS, e.g. 16xFF
        if self.peek() == Some('x') && !value.is_empty() {
            let base: u32 = value.parse().map_err(|_| self.error("invalid base prefix"))?;
            self.bump();
            value.push('x');
            let mut saw_digit = false;
            while let Some(c) = self.peek() {
                if c.is_digit(base.max(2)) {
                    value.push(c);
                    self.bump();
                    saw_digit = true;
                } else {
                    break;
                }
            }
            if !saw_digit {
                return Err(self.error("expected digits after base prefix"));
            }
            return Ok(Token::NumberLiteral { value, location });
        }

        if leading_zero && value.len() > 1 {
            return Err(self.error("number literal may not have a leading zero"));
        }

        // fractional part, but a lone '.' not followed by a digit belongs to
        // the next token (method-call dot), not this number.
        if self.peek() == Some('.') && self.peek_second().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            value.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    value.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = self.iterator.clone();
            let mut probe = String::new();
            probe.push(lookahead.next().unwrap());
            if matches!(lookahead.peek(), Some('+') | Some('-')) {
                probe.push(lookahead.next().unwrap());
            }
            let has_exponent_digits = matches!(lookahead.peek(), Some(c) if c.is_ascii_digit());

            if has_exponent_digits {
                value.push(self.bump().unwrap());
                if matches!(self.peek(), Some('+') | Some('-')) {
                    value.push(self.bump().unwrap());
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        value.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            } else if lookahead.peek().is_none() || !has_exponent_digits {
                // Only an error if this really looks like a dangling exponent
                // (e/E immediately consumed by letters that can't start
                // another token, i.e. nothing valid follows). Otherwise the
                // 'e'/'E' simply begins the next token (an identifier).
            }
        }

        Ok(Token::NumberLiteral { value, location })
    }

    fn lex_symbol(&mut self, location: Location, spaced: bool) -> LexResult<Token> {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if is_symbol_char(c) {
                value.push(c);
                self.bump();
            } else if c == '.' && self.peek_second() == Some('.') {
                value.push('.');
                self.bump();
            } else {
                break;
            }
        }
        Ok(Token::Symbol { value, spaced, location })
    }

    /// Scan the body of a string literal starting *inside* the quotes (or,
    /// when `resumed` is true, starting right after an interpolation hole's
    /// closing `}`), stopping at an unescaped `{` (interpolation) or the
    /// closing `"`.
    fn lex_string_body(&mut self, location: Location, resumed: bool) -> LexResult<Token> {
        if !resumed {
            self.bump(); // opening quote
        }

        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\n') | Some('\r') => return Err(self.error("string literal may not span a newline")),
                Some('"') => return Ok(Token::StringLiteral { value, interpolation: false, location }),
                Some('{') => return Ok(Token::StringLiteral { value, interpolation: true, location }),
                Some('\\') => {
                    let escaped = self.bump().ok_or_else(|| self.error("unterminated escape sequence"))?;
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        'b' => '\u{8}',
                        'f' => '\u{c}',
                        'v' => '\u{b}',
                        '0' => '\0',
                        '\\' => '\\',
                        '"' => '"',
                        '{' => '{',
                        '}' => '}',
                        'u' => self.lex_unicode_escape()?,
                        other => return Err(self.error(format!("invalid escape sequence '\\{other}'"))),
                    });
                }
                Some(c) if c.is_control() => {
                    return Err(self.error("control characters are not allowed in string literals"))
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn lex_unicode_escape(&mut self) -> LexResult<char> {
        let mut digits = String::with_capacity(4);
        for _ in 0..4 {
            let c = self.bump().ok_or_else(|| self.error("unterminated unicode escape"))?;
            if !c.is_ascii_hexdigit() {
                return Err(self.error("invalid digit in unicode escape"));
            }
            digits.push(c);
        }
        let code = u32::from_str_radix(&digits, 16).map_err(|_| self.error("invalid unicode escape"))?;
        char::from_u32(code).ok_or_else(|| self.error("unicode escape does not name a valid character"))
    }

    /// Resume lexing a string literal's body right after the `}` that
    /// closed an interpolation hole. See the module-level doc comment.
    pub fn continue_string_token(&mut self) -> LexResult<Token> {
        let location = self.here();
        self.lex_string_body(location, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token().expect("lex error");
            let done = token.is_end_of_input();
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    #[test]
    fn lexes_identifier() {
        let tokens = lex_all("foo");
        assert!(matches!(&tokens[0], Token::Identifier { value, .. } if value == "foo"));
    }

    #[test]
    fn keyword_is_retagged() {
        let tokens = lex_all("self");
        assert!(matches!(&tokens[0], Token::Keyword { value, .. } if value == "self"));
    }

    #[test]
    fn rejects_leading_zero() {
        let mut lexer = Lexer::new("007");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn base_prefixed_number() {
        let tokens = lex_all("16xFF");
        assert!(matches!(&tokens[0], Token::NumberLiteral { value, .. } if value == "16xFF"));
    }

    #[test]
    fn blank_lines_collapse_to_one_newline() {
        let tokens = lex_all("a\n\n\n  b");
        assert!(matches!(&tokens[0], Token::Identifier { value, .. } if value == "a"));
        assert!(matches!(&tokens[1], Token::Newline { indent: 2, .. }));
        assert!(matches!(&tokens[2], Token::Identifier { value, .. } if value == "b"));
    }

    #[test]
    fn rejects_tab() {
        let mut lexer = Lexer::new("\ta");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn rejects_bare_carriage_return() {
        let mut lexer = Lexer::new("a\rb");
        lexer.next_token().unwrap();
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn string_interpolation_splits_into_two_tokens() {
        let mut lexer = Lexer::new("\"x={1}y\"");
        let first = lexer.next_token().unwrap();
        assert!(matches!(&first, Token::StringLiteral { value, interpolation: true, .. } if value == "x="));
        // parser would now parse `1` then consume `}` then call continue_string_token
        let one = lexer.next_token().unwrap();
        assert!(matches!(one, Token::NumberLiteral { .. }));
        let brace = lexer.next_token().unwrap();
        assert!(brace.is_punctuation("}"));
        let rest = lexer.continue_string_token().unwrap();
        assert!(matches!(&rest, Token::StringLiteral { value, interpolation: false, .. } if value == "y"));
    }

    #[test]
    fn comment_is_subsumed_into_newline() {
        let tokens = lex_all("a // hi\n  b");
        assert!(matches!(&tokens[1], Token::Newline { indent: 2, .. }));
    }

    #[test]
    fn operator_run_is_one_symbol_token() {
        let tokens = lex_all("a >= b");
        assert!(matches!(&tokens[1], Token::Symbol { value, .. } if value == ">="));
    }
}
