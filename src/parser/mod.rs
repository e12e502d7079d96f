//! Token stream → AST. Recursive-descent with a single lazily-lexed
//! lookahead token and explicit checkpoint/restore for the handful of
//! productions that need to commit-then-rewind (`attempt`).
//!
//! Indentation is tracked as a stack of "this block's statement indent"
//! values, pushed when a `{` is opened and measured from the first newline
//! that follows it (or reused from the enclosing block for a single-line
//! `{ ... }`). A statement is terminated by a `Newline`, a `;`, or the
//! block's closing `}`.
//!
//! String interpolation is a two-lexer-call protocol: a `StringLiteral`
//! token with `interpolation: true` means the lexer's cursor sits right
//! after the opening `{` of a hole. The parser reads an ordinary expression,
//! consumes the matching `}` itself (without going through `bump`, since
//! `next_token` would try to lex past it as source code), then calls
//! [`crate::lexer::Lexer::continue_string_token`] to resume scanning the
//! string body from there.

pub mod ast;
mod errors;

pub use errors::{ParseError, ParseResult};

use crate::lexer::{Lexer, Location, Token};
use ast::*;

const MATH_OPERATORS: &[&str] = &["^", "*", "/", "+", "-"];

fn is_math_operator(op: &str) -> bool {
    MATH_OPERATORS.contains(&op)
}

fn parse_number_literal(raw: &str) -> Option<f64> {
    match raw.split_once('x') {
        Some((base, digits)) => {
            let base: u32 = base.parse().ok()?;
            i64::from_str_radix(digits, base).ok().map(|v| v as f64)
        }
        None => raw.parse::<f64>().ok(),
    }
}

pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    indent_stack: Vec<usize>,
    /// Disables bare-block literal arguments and the `:=` request sugar —
    /// used while parsing a pattern expression (spec.md §4.2 "Strict
    /// context": type patterns and return-pattern positions).
    strict: bool,
}

enum Terminator {
    CloseBrace,
    EndOfInput,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token().map_err(|e| ParseError::from_lex(e, source))?;
        Ok(Self { source, lexer, current, indent_stack: vec![0], strict: false })
    }

    /// A whole module: a flat statement list (dialect/import/def/var/type/
    /// method/class declarations and expression statements, freely mixed)
    /// running to end of input.
    pub fn parse_module(&mut self) -> ParseResult<Vec<Statement>> {
        self.parse_statement_list(Terminator::EndOfInput)
    }

    // ---- token primitives ------------------------------------------------

    fn here(&self) -> Location {
        self.current.location()
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.here(), self.source)
    }

    /// Advances past the current token with no newline filtering — callers
    /// decide where newlines are significant.
    fn bump(&mut self) -> ParseResult<Token> {
        let next = self.lexer.next_token().map_err(|e| ParseError::from_lex(e, self.source))?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn skip_newlines(&mut self) -> ParseResult<()> {
        while matches!(self.current, Token::Newline { .. }) {
            self.bump()?;
        }
        Ok(())
    }

    fn expect_punctuation(&mut self, value: &str) -> ParseResult<Location> {
        if self.current.is_punctuation(value) {
            let location = self.here();
            self.bump()?;
            Ok(location)
        } else {
            Err(self.error_here(format!("expected '{value}', found {}", self.current.printable_name())))
        }
    }

    fn expect_keyword(&mut self, value: &str) -> ParseResult<Location> {
        if self.current.is_keyword(value) {
            let location = self.here();
            self.bump()?;
            Ok(location)
        } else {
            Err(self.error_here(format!("expected '{value}', found {}", self.current.printable_name())))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.current.clone() {
            Token::Identifier { value, .. } => {
                self.bump()?;
                Ok(value)
            }
            other => Err(self.error_here(format!("expected an identifier, found {}", other.printable_name()))),
        }
    }

    fn expect_identifier_node(&mut self) -> ParseResult<Identifier> {
        let location = self.here();
        let name = self.expect_identifier()?;
        Ok(Identifier::new(name, location))
    }

    fn expect_symbol_value(&mut self) -> ParseResult<String> {
        match self.current.clone() {
            Token::Symbol { value, .. } => {
                self.bump()?;
                Ok(value)
            }
            other => Err(self.error_here(format!("expected an operator, found {}", other.printable_name()))),
        }
    }

    /// `def`/`var` use plain `=`, one character, never fused with `:` (that
    /// combination is reserved for the `:=` assignment-method terminator).
    fn expect_equals_sign(&mut self) -> ParseResult<()> {
        if self.current.is_symbol("=") {
            self.bump()?;
            Ok(())
        } else {
            Err(self.error_here(format!("expected '=', found {}", self.current.printable_name())))
        }
    }

    /// Checkpoints lexer + current token + indent stack, runs `f`, and
    /// restores on failure so the caller can try an alternative production.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let lexer = self.lexer.clone();
        let current = self.current.clone();
        let indent_stack = self.indent_stack.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.lexer = lexer;
                self.current = current;
                self.indent_stack = indent_stack;
                Err(e)
            }
        }
    }

    // ---- block / statement-list plumbing ----------------------------------

    fn enter_block(&mut self) -> ParseResult<()> {
        self.expect_punctuation("{")?;
        let indent = match &self.current {
            Token::Newline { indent, .. } => *indent,
            _ => *self.indent_stack.last().unwrap_or(&0),
        };
        self.indent_stack.push(indent);
        Ok(())
    }

    fn exit_block(&mut self) -> ParseResult<()> {
        self.indent_stack.pop();
        self.expect_punctuation("}")?;
        Ok(())
    }

    fn is_close_brace(&self) -> bool {
        self.current.is_punctuation("}")
    }

    fn parse_statement_list(&mut self, terminator: Terminator) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines()?;
            match terminator {
                Terminator::CloseBrace if self.is_close_brace() => break,
                Terminator::EndOfInput if self.current.is_end_of_input() => break,
                _ => {}
            }
            if self.current.is_end_of_input() {
                break;
            }
            statements.push(self.parse_statement()?);
            match &self.current {
                Token::Newline { .. } => {
                    self.bump()?;
                }
                Token::Punctuation { value, .. } if value == ";" => {
                    self.bump()?;
                }
                _ if self.is_close_brace() || self.current.is_end_of_input() => break,
                other => {
                    return Err(self.error_here(format!(
                        "expected newline, ';', or '}}' after statement, found {}",
                        other.printable_name()
                    )))
                }
            }
        }
        Ok(statements)
    }

    fn parse_braced_body(&mut self) -> ParseResult<Vec<Statement>> {
        self.enter_block()?;
        let body = self.parse_statement_list(Terminator::CloseBrace)?;
        self.exit_block()?;
        Ok(body)
    }

    fn consume_statement_separator(&mut self) -> ParseResult<()> {
        match &self.current {
            Token::Newline { .. } => {
                self.bump()?;
                Ok(())
            }
            Token::Punctuation { value, .. } if value == ";" => {
                self.bump()?;
                Ok(())
            }
            _ if self.is_close_brace() => Ok(()),
            other => Err(self.error_here(format!("expected newline or ';', found {}", other.printable_name()))),
        }
    }

    // ---- statements --------------------------------------------------------

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current.clone() {
            Token::Keyword { value, .. } if value == "dialect" => Ok(Statement::Declaration(Declaration::Dialect(self.parse_dialect()?))),
            Token::Keyword { value, .. } if value == "import" => Ok(Statement::Declaration(Declaration::Import(self.parse_import()?))),
            Token::Keyword { value, .. } if value == "def" => Ok(Statement::Declaration(Declaration::Def(self.parse_def()?))),
            Token::Keyword { value, .. } if value == "var" => Ok(Statement::Declaration(Declaration::Var(self.parse_var()?))),
            Token::Keyword { value, .. } if value == "type" => self.parse_type_decl_or_literal_statement(),
            Token::Keyword { value, .. } if value == "method" => Ok(Statement::Declaration(Declaration::Method(self.parse_method_decl(false, false)?))),
            Token::Keyword { value, .. } if value == "class" => Ok(Statement::Declaration(Declaration::Class(self.parse_class_decl()?))),
            Token::Identifier { value, .. } if value == "override" => {
                self.bump()?;
                self.expect_keyword("method")?;
                Ok(Statement::Declaration(Declaration::Method(self.parse_method_decl(true, false)?)))
            }
            Token::Identifier { value, .. } if value == "confidential" => {
                self.bump()?;
                self.expect_keyword("method")?;
                Ok(Statement::Declaration(Declaration::Method(self.parse_method_decl(false, true)?)))
            }
            Token::Keyword { value, .. } if value == "return" => Ok(Statement::Return(self.parse_return()?)),
            _ => Ok(Statement::Expression(self.parse_expression()?)),
        }
    }

    fn parse_dialect(&mut self) -> ParseResult<DialectDecl> {
        let location = self.expect_keyword("dialect")?;
        let path = self.parse_path_string()?;
        Ok(DialectDecl { path, location })
    }

    fn parse_import(&mut self) -> ParseResult<ImportDecl> {
        let location = self.expect_keyword("import")?;
        let path = self.parse_path_string()?;
        let mut names = Vec::new();
        if self.current.is_punctuation("(") {
            self.bump()?;
            self.skip_newlines()?;
            if !self.current.is_punctuation(")") {
                loop {
                    names.push(self.expect_identifier_node()?);
                    self.skip_newlines()?;
                    if self.current.is_punctuation(",") {
                        self.bump()?;
                        self.skip_newlines()?;
                        continue;
                    }
                    break;
                }
            }
            self.expect_punctuation(")")?;
        }
        Ok(ImportDecl { path, names, location })
    }

    fn parse_path_string(&mut self) -> ParseResult<String> {
        match self.current.clone() {
            Token::StringLiteral { value, interpolation: false, .. } => {
                self.bump()?;
                Ok(value)
            }
            other => Err(self.error_here(format!("expected a module path string, found {}", other.printable_name()))),
        }
    }

    fn parse_def(&mut self) -> ParseResult<DefDecl> {
        let location = self.expect_keyword("def")?;
        let name = self.expect_identifier_node()?;
        let pattern = self.parse_optional_pattern_annotation()?;
        self.expect_equals_sign()?;
        let value = self.parse_expression()?;
        Ok(DefDecl { name, pattern, value, location })
    }

    fn parse_var(&mut self) -> ParseResult<VarDecl> {
        let location = self.expect_keyword("var")?;
        let name = self.expect_identifier_node()?;
        let pattern = self.parse_optional_pattern_annotation()?;
        let value = if self.current.is_symbol(":=") {
            self.bump()?;
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(VarDecl { name, pattern, value, location })
    }

    fn parse_optional_pattern_annotation(&mut self) -> ParseResult<Option<Expression>> {
        if self.current.is_symbol(":") {
            self.bump()?;
            Ok(Some(self.parse_pattern_expression()?))
        } else {
            Ok(None)
        }
    }

    fn parse_pattern_expression(&mut self) -> ParseResult<Expression> {
        let previous = self.strict;
        self.strict = true;
        let result = self.parse_expression();
        self.strict = previous;
        result
    }

    /// `type` commits to a declaration unless immediately followed by `{`,
    /// in which case it is a type-literal expression statement (spec.md
    /// §4.2 "Declaration vs literal").
    fn parse_type_decl_or_literal_statement(&mut self) -> ParseResult<Statement> {
        let attempt = self.attempt(|p| {
            let location = p.here();
            p.bump()?; // `type`
            if p.current.is_punctuation("{") {
                return Err(p.error_here("type literal, not a declaration"));
            }
            let name = p.expect_identifier_node()?;
            p.expect_equals_sign()?;
            Ok((name, location))
        });
        match attempt {
            Ok((name, location)) => {
                let value = self.parse_expression()?;
                Ok(Statement::Declaration(Declaration::TypeDecl(TypeDecl { name, value, location })))
            }
            Err(_) => Ok(Statement::Expression(self.parse_expression()?)),
        }
    }

    fn parse_return(&mut self) -> ParseResult<ReturnStatement> {
        let location = self.expect_keyword("return")?;
        let value = if self.starts_expression() { Some(self.parse_expression()?) } else { None };
        Ok(ReturnStatement { value, location })
    }

    fn starts_expression(&self) -> bool {
        !matches!(self.current, Token::Newline { .. }) && !self.current.is_end_of_input() && !self.current.is_punctuation("}") && !self.current.is_punctuation(";")
    }

    // ---- method / class declarations ----------------------------------------

    fn parse_method_decl(&mut self, is_override: bool, confidential: bool) -> ParseResult<MethodDecl> {
        let location = self.expect_keyword("method")?;
        let signature = self.parse_signature()?;
        let body = self.parse_braced_body()?;
        Ok(MethodDecl { signature, body, is_override, confidential, location })
    }

    fn parse_class_decl(&mut self) -> ParseResult<ClassDecl> {
        let location = self.expect_keyword("class")?;
        let name = self.expect_identifier_node()?;
        let constructor_signature = if self.current.is_punctuation("(") {
            let params = self.parse_param_list()?;
            Some(Signature {
                parts: vec![SignaturePart {
                    name: name.name.clone(),
                    generics: Vec::new(),
                    params,
                    is_operator: false,
                    is_prefix: false,
                    location,
                }],
                is_assignment: false,
                return_pattern: None,
                location,
            })
        } else {
            None
        };
        let body = self.parse_braced_body()?;
        Ok(ClassDecl { name, constructor_signature, body, location })
    }

    fn parse_signature(&mut self) -> ParseResult<Signature> {
        let location = self.here();

        // `prefix -` declares a unary prefix-operator method.
        if self.current.is_keyword("prefix") {
            self.bump()?;
            let name = self.expect_symbol_value()?;
            let part = SignaturePart { name, generics: Vec::new(), params: Vec::new(), is_operator: true, is_prefix: true, location };
            let return_pattern = self.parse_optional_return_pattern()?;
            return Ok(Signature { parts: vec![part], is_assignment: false, return_pattern, location });
        }

        // bare binary-operator method, e.g. `method +(other) { ... }`
        if matches!(self.current, Token::Symbol { .. }) {
            let name = self.expect_symbol_value()?;
            let params = if self.current.is_punctuation("(") { self.parse_param_list()? } else { Vec::new() };
            let part = SignaturePart { name, generics: Vec::new(), params, is_operator: true, is_prefix: false, location };
            let return_pattern = self.parse_optional_return_pattern()?;
            return Ok(Signature { parts: vec![part], is_assignment: false, return_pattern, location });
        }

        let mut parts = vec![self.parse_signature_part()?];
        if !parts[0].params.is_empty() {
            while matches!(self.current, Token::Identifier { .. }) {
                parts.push(self.parse_signature_part()?);
            }
        }

        let is_assignment = if self.current.is_symbol(":=") {
            self.bump()?;
            true
        } else {
            false
        };

        let return_pattern = self.parse_optional_return_pattern()?;
        Ok(Signature { parts, is_assignment, return_pattern, location })
    }

    fn parse_signature_part(&mut self) -> ParseResult<SignaturePart> {
        let location = self.here();
        let name = self.expect_identifier()?;
        let generics = self.parse_optional_signature_generics()?;
        let params = if self.current.is_punctuation("(") { self.parse_param_list()? } else { Vec::new() };
        Ok(SignaturePart { name, generics, params, is_operator: false, is_prefix: false, location })
    }

    fn parse_optional_signature_generics(&mut self) -> ParseResult<Vec<Identifier>> {
        if !matches!(&self.current, Token::Symbol { value, spaced, .. } if value == "<" && !spaced) {
            return Ok(Vec::new());
        }
        self.bump()?;
        let mut generics = vec![self.expect_identifier_node()?];
        while self.current.is_punctuation(",") {
            self.bump()?;
            generics.push(self.expect_identifier_node()?);
        }
        self.expect_generics_close()?;
        Ok(generics)
    }

    fn parse_param_list(&mut self) -> ParseResult<Vec<Parameter>> {
        self.expect_punctuation("(")?;
        self.skip_newlines()?;
        let mut params = Vec::new();
        if !self.current.is_punctuation(")") {
            loop {
                params.push(self.parse_parameter()?);
                self.skip_newlines()?;
                if self.current.is_punctuation(",") {
                    self.bump()?;
                    self.skip_newlines()?;
                    continue;
                }
                break;
            }
        }
        self.expect_punctuation(")")?;
        Ok(params)
    }

    fn parse_parameter(&mut self) -> ParseResult<Parameter> {
        let is_var_arg = if self.current.is_symbol("*") {
            self.bump()?;
            true
        } else {
            false
        };
        let name = self.expect_identifier_node()?;
        let pattern = self.parse_optional_pattern_annotation()?;
        Ok(Parameter { name, pattern, is_var_arg })
    }

    /// `-> pattern` after a signature's parts, asserted against the
    /// method's result on every natural return (spec.md §4.4 "Part
    /// joining").
    fn parse_optional_return_pattern(&mut self) -> ParseResult<Option<Expression>> {
        if self.current.is_symbol("->") {
            self.bump()?;
            Ok(Some(self.parse_pattern_expression()?))
        } else {
            Ok(None)
        }
    }

    /// `>` closing a generics list may have been lexed fused with further
    /// operator characters (`>>`, `>=`); split the leading `>` off and
    /// leave the rest as the new current token rather than re-lexing.
    fn expect_generics_close(&mut self) -> ParseResult<()> {
        match self.current.clone() {
            Token::Symbol { value, location, .. } if value.starts_with('>') => {
                if value.len() == 1 {
                    self.bump()?;
                } else {
                    let rest: String = value.chars().skip(1).collect();
                    self.current = Token::Symbol { value: rest, spaced: false, location: Location::new(location.line, location.column + 1) };
                }
                Ok(())
            }
            other => Err(self.error_here(format!("expected '>' to close generics, found {}", other.printable_name()))),
        }
    }

    // ---- expressions ---------------------------------------------------------

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        let target = self.parse_operator_expr()?;
        if !self.strict && self.current.is_symbol(":=") {
            let location = self.here();
            self.bump()?;
            let value = self.parse_assignment()?;
            return Ok(Expression::Assignment(AssignmentExpr { target: Box::new(target), value: Box::new(value), location }));
        }
        Ok(target)
    }

    /// Binary operators other than `^ * / + -` all share one precedence
    /// level and may not be mixed unparenthesized (spec.md §4.2 "Request
    /// parsing").
    fn parse_operator_expr(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive()?;
        let mut chosen: Option<String> = None;
        loop {
            let Some(op) = self.peek_non_math_operator() else { break };
            if let Some(previous) = &chosen {
                if previous != &op {
                    return Err(self.error_here(format!("cannot mix operators '{previous}' and '{op}' without parentheses")));
                }
            } else {
                chosen = Some(op.clone());
            }
            let location = self.here();
            self.bump()?;
            let right = self.parse_additive()?;
            left = Self::binary(left, op, right, location);
        }
        Ok(left)
    }

    fn peek_non_math_operator(&self) -> Option<String> {
        match &self.current {
            Token::Symbol { value, .. } if value != ":=" && value != "->" && !is_math_operator(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match &self.current {
                Token::Symbol { value, .. } if value == "+" || value == "-" => value.clone(),
                _ => break,
            };
            let location = self.here();
            self.bump()?;
            let right = self.parse_multiplicative()?;
            left = Self::binary(left, op, right, location);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_exponent()?;
        loop {
            let op = match &self.current {
                Token::Symbol { value, .. } if value == "*" || value == "/" => value.clone(),
                _ => break,
            };
            let location = self.here();
            self.bump()?;
            let right = self.parse_exponent()?;
            left = Self::binary(left, op, right, location);
        }
        Ok(left)
    }

    fn parse_exponent(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;
        while matches!(&self.current, Token::Symbol { value, .. } if value == "^") {
            let location = self.here();
            self.bump()?;
            let right = self.parse_unary()?;
            left = Self::binary(left, "^".to_owned(), right, location);
        }
        Ok(left)
    }

    fn binary(left: Expression, op: String, right: Expression, location: Location) -> Expression {
        Expression::QualifiedRequest(QualifiedRequest {
            receiver: Box::new(left),
            parts: vec![RequestPart { name: op, generics: Vec::new(), args: vec![right], has_params: true, is_operator: true, is_prefix: false, location }],
            location,
        })
    }

    /// A leading operator symbol in expression position sends that
    /// `prefix`-named method to the operand that follows it (`-x`).
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if let Token::Symbol { value, .. } = &self.current {
            let op = value.clone();
            let location = self.here();
            self.bump()?;
            let operand = self.parse_unary()?;
            return Ok(Expression::QualifiedRequest(QualifiedRequest {
                receiver: Box::new(operand),
                parts: vec![RequestPart { name: op, generics: Vec::new(), args: Vec::new(), has_params: false, is_operator: true, is_prefix: true, location }],
                location,
            }));
        }
        self.parse_postfix()
    }

    /// Dot chains: `receiver.part()part()...`, repeated for every `.`.
    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_primary()?;
        while self.current.is_punctuation(".") {
            let location = self.here();
            self.bump()?;
            let parts = self.parse_request_parts()?;
            expr = Expression::QualifiedRequest(QualifiedRequest { receiver: Box::new(expr), parts, location });
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let location = self.here();
        match self.current.clone() {
            Token::NumberLiteral { value, .. } => {
                self.bump()?;
                let parsed = parse_number_literal(&value).ok_or_else(|| ParseError::new(format!("invalid number literal '{value}'"), location, self.source))?;
                Ok(Expression::NumberLiteral { value: parsed, location })
            }
            Token::StringLiteral { value, interpolation, .. } => {
                self.bump()?;
                if interpolation {
                    self.parse_interpolated_string(value, location)
                } else {
                    Ok(Expression::StringLiteral { value, location })
                }
            }
            Token::Keyword { value, .. } if value == "true" => {
                self.bump()?;
                Ok(Expression::BooleanLiteral { value: true, location })
            }
            Token::Keyword { value, .. } if value == "false" => {
                self.bump()?;
                Ok(Expression::BooleanLiteral { value: false, location })
            }
            Token::Keyword { value, .. } if value == "done" => {
                self.bump()?;
                Ok(Expression::DoneLiteral(location))
            }
            Token::Keyword { value, .. } if value == "self" => {
                self.bump()?;
                Ok(Expression::SelfExpr(location))
            }
            Token::Keyword { value, .. } if value == "super" => {
                self.bump()?;
                Ok(Expression::SuperExpr(location))
            }
            Token::Keyword { value, .. } if value == "outer" => {
                self.bump()?;
                Ok(Expression::OuterExpr(location))
            }
            Token::Keyword { value, .. } if value == "object" => self.parse_object_constructor(),
            Token::Keyword { value, .. } if value == "type" => self.parse_type_literal(),
            Token::Punctuation { value, .. } if value == "{" => self.parse_block(),
            Token::Punctuation { value, .. } if value == "(" => {
                self.bump()?;
                self.skip_newlines()?;
                let inner = self.parse_expression()?;
                self.skip_newlines()?;
                self.expect_punctuation(")")?;
                Ok(inner)
            }
            Token::Identifier { .. } => {
                let parts = self.parse_request_parts()?;
                Ok(Expression::UnqualifiedRequest(UnqualifiedRequest { parts, location }))
            }
            other => Err(self.error_here(format!("unexpected {}", other.printable_name()))),
        }
    }

    /// Splices lexer-reported interpolation holes into a chain of `++`
    /// sends: `"left" ++ inner.asString ++ "middle" ++ ... ++ "tail"`
    /// (spec.md §8 "Interpolation").
    fn parse_interpolated_string(&mut self, first_chunk: String, location: Location) -> ParseResult<Expression> {
        let mut result = Expression::StringLiteral { value: first_chunk, location };
        loop {
            let inner = self.parse_expression()?;
            if !self.current.is_punctuation("}") {
                return Err(self.error_here(format!("expected '}}' to close string interpolation, found {}", self.current.printable_name())));
            }
            let as_string = Expression::QualifiedRequest(QualifiedRequest {
                receiver: Box::new(inner),
                parts: vec![RequestPart { name: "asString".to_owned(), generics: Vec::new(), args: Vec::new(), has_params: false, is_operator: false, is_prefix: false, location }],
                location,
            });
            result = Self::concat(result, as_string, location);

            let resumed = self.lexer.continue_string_token().map_err(|e| ParseError::from_lex(e, self.source))?;
            let Token::StringLiteral { value: chunk, interpolation, .. } = resumed else {
                unreachable!("continue_string_token always yields a StringLiteral")
            };
            result = Self::concat(result, Expression::StringLiteral { value: chunk, location }, location);

            if interpolation {
                self.current = self.bump_past_interpolation_hole()?;
                continue;
            }
            self.current = self.bump_past_interpolation_hole()?;
            break;
        }
        Ok(result)
    }

    /// Fetches the next real token after an interpolation `}` (either the
    /// hole that just closed, or the tail chunk that ends the string);
    /// either way the lexer cursor is now past the string entirely and
    /// ordinary `next_token` lexing resumes.
    fn bump_past_interpolation_hole(&mut self) -> ParseResult<Token> {
        self.lexer.next_token().map_err(|e| ParseError::from_lex(e, self.source))
    }

    fn concat(left: Expression, right: Expression, location: Location) -> Expression {
        Expression::QualifiedRequest(QualifiedRequest {
            receiver: Box::new(left),
            parts: vec![RequestPart { name: "++".to_owned(), generics: Vec::new(), args: vec![right], has_params: true, is_operator: true, is_prefix: false, location }],
            location,
        })
    }

    fn parse_object_constructor(&mut self) -> ParseResult<Expression> {
        let location = self.expect_keyword("object")?;
        self.enter_block()?;
        self.skip_newlines()?;
        let inherits = if self.current.is_keyword("inherits") {
            let iloc = self.here();
            self.bump()?;
            let parent = self.parse_inherits_request()?;
            self.consume_statement_separator()?;
            if matches!(self.current, Token::Newline { .. }) {
                self.bump()?;
            }
            Some(InheritsClause { parent: Box::new(parent), location: iloc })
        } else {
            None
        };
        let body = self.parse_statement_list(Terminator::CloseBrace)?;
        self.exit_block()?;
        Ok(Expression::ObjectConstructor(ObjectConstructor { inherits, body, location }))
    }

    /// `inherits` only ever names a request — qualified, unqualified, or a
    /// bare boolean literal (for the degenerate "inherits true/false"
    /// marker types) — never a general expression.
    fn parse_inherits_request(&mut self) -> ParseResult<Expression> {
        let location = self.here();
        match self.current.clone() {
            Token::Keyword { value, .. } if value == "true" => {
                self.bump()?;
                Ok(Expression::BooleanLiteral { value: true, location })
            }
            Token::Keyword { value, .. } if value == "false" => {
                self.bump()?;
                Ok(Expression::BooleanLiteral { value: false, location })
            }
            Token::Identifier { .. } => {
                let parts = self.parse_request_parts()?;
                let mut expr = Expression::UnqualifiedRequest(UnqualifiedRequest { parts, location });
                while self.current.is_punctuation(".") {
                    let loc = self.here();
                    self.bump()?;
                    let parts = self.parse_request_parts()?;
                    expr = Expression::QualifiedRequest(QualifiedRequest { receiver: Box::new(expr), parts, location: loc });
                }
                Ok(expr)
            }
            other => Err(self.error_here(format!("expected an inherits expression, found {}", other.printable_name()))),
        }
    }

    fn parse_block(&mut self) -> ParseResult<Expression> {
        let location = self.here();
        self.enter_block()?;
        self.skip_newlines()?;
        let params = self.attempt(|p| p.parse_block_params()).unwrap_or_default();
        let body = self.parse_statement_list(Terminator::CloseBrace)?;
        self.exit_block()?;
        Ok(Expression::Block(BlockExpr { params, body, location }))
    }

    /// `a, *b -> body`: a parameter list followed by `->`. Tried
    /// speculatively since a block with no `->` is just a body.
    fn parse_block_params(&mut self) -> ParseResult<Vec<Parameter>> {
        let mut params = Vec::new();
        if matches!(self.current, Token::Identifier { .. }) || self.current.is_symbol("*") {
            loop {
                params.push(self.parse_parameter()?);
                if self.current.is_punctuation(",") {
                    self.bump()?;
                    continue;
                }
                break;
            }
        }
        if self.current.is_symbol("->") {
            self.bump()?;
            Ok(params)
        } else {
            Err(self.error_here("not a block parameter list"))
        }
    }

    fn parse_type_literal(&mut self) -> ParseResult<Expression> {
        let location = self.expect_keyword("type")?;
        let name = if matches!(self.current, Token::Identifier { .. }) { Some(self.expect_identifier()?) } else { None };
        self.enter_block()?;
        self.skip_newlines()?;
        let mut signatures = Vec::new();
        while !self.is_close_brace() {
            signatures.push(self.parse_signature()?);
            self.skip_newlines()?;
            if self.current.is_punctuation(",") || self.current.is_punctuation(";") {
                self.bump()?;
                self.skip_newlines()?;
            }
        }
        self.exit_block()?;
        Ok(Expression::TypeLiteral(TypeLiteral { name, signatures, location }))
    }

    // ---- request parts (shared by unqualified requests and dot chains) -----

    fn parse_request_parts(&mut self) -> ParseResult<Vec<RequestPart>> {
        let mut parts = vec![self.parse_one_request_part()?];
        while parts.last().unwrap().has_params && matches!(self.current, Token::Identifier { .. }) {
            parts.push(self.parse_one_request_part()?);
        }
        Ok(parts)
    }

    fn parse_one_request_part(&mut self) -> ParseResult<RequestPart> {
        let location = self.here();
        let name = self.expect_identifier()?;
        let generics = self.parse_optional_request_generics()?;
        if self.current.is_punctuation("(") {
            self.bump()?;
            self.skip_newlines()?;
            let mut args = Vec::new();
            if !self.current.is_punctuation(")") {
                loop {
                    args.push(self.parse_expression()?);
                    self.skip_newlines()?;
                    if self.current.is_punctuation(",") {
                        self.bump()?;
                        self.skip_newlines()?;
                        continue;
                    }
                    break;
                }
            }
            self.expect_punctuation(")")?;
            Ok(RequestPart { name, generics, args, has_params: true, is_operator: false, is_prefix: false, location })
        } else if !self.strict && self.can_start_literal_argument() {
            let arg = self.parse_primary()?;
            Ok(RequestPart { name, generics, args: vec![arg], has_params: true, is_operator: false, is_prefix: false, location })
        } else {
            Ok(RequestPart { name, generics, args: Vec::new(), has_params: false, is_operator: false, is_prefix: false, location })
        }
    }

    fn parse_optional_request_generics(&mut self) -> ParseResult<Vec<Expression>> {
        if !matches!(&self.current, Token::Symbol { value, spaced, .. } if value == "<" && !spaced) {
            return Ok(Vec::new());
        }
        self.bump()?;
        let mut generics = vec![self.parse_expression()?];
        while self.current.is_punctuation(",") {
            self.bump()?;
            generics.push(self.parse_expression()?);
        }
        self.expect_generics_close()?;
        Ok(generics)
    }

    /// Whether the current token can open a bare (parenthesis-free) literal
    /// argument: a block, or a primitive literal — never a general
    /// expression (spec.md §4.2 "Request parsing").
    fn can_start_literal_argument(&self) -> bool {
        self.current.is_punctuation("{")
            || matches!(self.current, Token::NumberLiteral { .. } | Token::StringLiteral { .. })
            || self.current.is_keyword("true")
            || self.current.is_keyword("false")
            || self.current.is_keyword("done")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Vec<Statement> {
        Parser::new(source).expect("lex error").parse_module().expect("parse error")
    }

    #[test]
    fn parses_def_and_var() {
        let statements = parse_ok("def x = 1\nvar y := 2");
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn parses_multi_part_unqualified_request() {
        let statements = parse_ok("if (true) then { 1 } else { 2 }");
        match &statements[0] {
            Statement::Expression(Expression::UnqualifiedRequest(r)) => assert_eq!(r.parts.len(), 3),
            other => panic!("expected unqualified request, got {other:?}"),
        }
    }

    #[test]
    fn parses_qualified_dot_chain() {
        let statements = parse_ok("list.do { x -> x }");
        match &statements[0] {
            Statement::Expression(Expression::QualifiedRequest(r)) => assert_eq!(r.parts[0].name, "do"),
            other => panic!("expected qualified request, got {other:?}"),
        }
    }

    #[test]
    fn binary_precedence_groups_math_operators() {
        let statements = parse_ok("1 + 2 * 3");
        let Statement::Expression(Expression::QualifiedRequest(outer)) = &statements[0] else { panic!("not a request") };
        assert_eq!(outer.parts[0].name, "+");
        match &outer.parts[0].args[0] {
            Expression::QualifiedRequest(inner) => assert_eq!(inner.parts[0].name, "*"),
            other => panic!("expected nested '*' request, got {other:?}"),
        }
    }

    #[test]
    fn rejects_mixed_non_math_operators_without_parens() {
        let err = Parser::new("a == b && c").unwrap().parse_module();
        assert!(err.is_err());
    }

    #[test]
    fn parses_prefix_operator() {
        let statements = parse_ok("-x");
        match &statements[0] {
            Statement::Expression(Expression::QualifiedRequest(r)) => {
                assert_eq!(r.parts[0].name, "-");
                assert!(r.parts[0].is_prefix);
            }
            other => panic!("expected prefix request, got {other:?}"),
        }
    }

    #[test]
    fn parses_object_with_inherits() {
        let statements = parse_ok("object {\n  inherits Base.new\n  method m { 1 }\n}");
        match &statements[0] {
            Statement::Expression(Expression::ObjectConstructor(o)) => {
                assert!(o.inherits.is_some());
                assert_eq!(o.body.len(), 1);
            }
            other => panic!("expected object constructor, got {other:?}"),
        }
    }

    #[test]
    fn parses_type_literal_with_duplicate_detected_later() {
        let statements = parse_ok("type { foo, foo }");
        match &statements[0] {
            Statement::Expression(Expression::TypeLiteral(t)) => assert_eq!(t.signatures.len(), 2),
            other => panic!("expected type literal, got {other:?}"),
        }
    }

    #[test]
    fn parses_method_with_return_pattern() {
        let statements = parse_ok("method double(n) -> Number { n * 2 }");
        match &statements[0] {
            Statement::Declaration(Declaration::Method(m)) => assert!(m.signature.return_pattern.is_some()),
            other => panic!("expected method declaration, got {other:?}"),
        }
    }

    #[test]
    fn parses_string_interpolation() {
        let statements = parse_ok("\"x={1}y\"");
        match &statements[0] {
            Statement::Expression(Expression::QualifiedRequest(_)) => {}
            other => panic!("expected a concatenation chain, got {other:?}"),
        }
    }

    #[test]
    fn parses_assignment() {
        let statements = parse_ok("x := 5");
        assert!(matches!(&statements[0], Statement::Expression(Expression::Assignment(_))));
    }
}
