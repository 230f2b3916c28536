// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

mod declaration;
mod declarator;
mod expression;
mod statement;

use std::{collections::HashMap, sync::Arc};

use crate::{
    ast::TranslationUnit,
    diagnostic::{Diagnostic, DiagnosticSink},
    error::ParseError,
    location::Location,
    options::PreprocessorOptions,
    peekable_iter::PeekableIter,
    preprocessor::Preprocessor,
    source_buffer::{SourceBuffer, SourceMap},
    token::{Keyword, Punctuator, Token, TokenWithLocation},
};

/// Names that are typedef names before any declaration,
/// the GNU headers use them without declaring them.
const BUILTIN_TYPEDEF_NAMES: [&str; 1] = ["__builtin_va_list"];

/// The result of parsing a source file.
///
/// The translation unit is always present, declarations that could not
/// be parsed are left out and reported in `diagnostics`.
#[derive(Debug)]
pub struct ParseResult {
    pub translation_unit: TranslationUnit,
    pub diagnostics: DiagnosticSink,
    pub source_map: SourceMap,
}

/// Preprocesses and parses a source file.
#[tracing::instrument(skip_all, fields(file = %source.name()))]
pub fn parse_source(source: Arc<SourceBuffer>, options: PreprocessorOptions) -> ParseResult {
    let preprocessor = Preprocessor::new(source, options);
    let result = Parser::new(preprocessor).parse();

    tracing::debug!(
        declarations = result.translation_unit.declarations.len(),
        errors = result.diagnostics.error_count(),
        "parse finished"
    );

    result
}

// The preprocessed tokens without the unknown characters,
// which were already reported by the lexer.
struct TokenStream {
    preprocessor: Preprocessor,
}

impl Iterator for TokenStream {
    type Item = TokenWithLocation;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let token_with_location = self.preprocessor.next_token();
            if !matches!(token_with_location.token, Token::Unknown(_)) {
                return Some(token_with_location);
            }
        }
    }
}

/// A recursive descent parser for C.
///
/// Syntax errors never stop the parser: each one is reported as a diagnostic,
/// then the tokens up to the next declaration or statement boundary are
/// skipped (see `synchronize`).
pub struct Parser {
    upstream: PeekableIter<TokenStream>,
    last_location: Location,

    // Stays in place when the end of input is reached.
    end_of_input: TokenWithLocation,

    // The number of tokens consumed so far.
    consumed: usize,

    // Ordinary identifiers of each scope, the value is whether it is a typedef name.
    // The first scope is the file scope.
    scopes: Vec<HashMap<String, bool>>,

    // The current nesting of brackets, blocks and statements, see `nested`.
    nesting_depth: usize,
    max_nesting_depth: usize,
}

// Implementation of the Parser
//
// see:
// - https://en.cppreference.com/w/c/language.html
// - https://port70.net/~nsz/c/c11/n1570.html#A.2
impl Parser {
    pub fn new(preprocessor: Preprocessor) -> Self {
        let file_scope = BUILTIN_TYPEDEF_NAMES
            .iter()
            .map(|name| (name.to_string(), true))
            .collect();
        let max_nesting_depth = preprocessor.options.max_nesting_depth;

        Self {
            upstream: PeekableIter::new(TokenStream { preprocessor }),
            last_location: Location::default(),
            end_of_input: TokenWithLocation::new(Token::EndOfInput, Location::default(), ""),
            consumed: 0,
            scopes: vec![file_scope],
            nesting_depth: 0,
            max_nesting_depth,
        }
    }

    pub fn parse(mut self) -> ParseResult {
        let translation_unit = self.parse_translation_unit();
        let (source_map, diagnostics) = self.upstream.into_upstream().preprocessor.into_parts();

        ParseResult {
            translation_unit,
            diagnostics,
            source_map,
        }
    }

    pub fn diagnostics(&self) -> &DiagnosticSink {
        self.upstream.upstream().preprocessor.diagnostics()
    }

    fn parse_translation_unit(&mut self) -> TranslationUnit {
        let mut declarations = vec![];

        loop {
            match self.peek_token(0) {
                Token::EndOfInput => break,
                Token::Punctuator(Punctuator::Semicolon) => {
                    // an extra ';' outside of a function
                    self.next_token();
                }
                Token::Punctuator(Punctuator::BraceClose) => {
                    let token = self.next_token();
                    self.report(ParseError::message(
                        "extraneous closing brace ('}')",
                        token.location,
                    ));
                }
                _ => {
                    let consumed = self.consumed;
                    match self.parse_external_declaration() {
                        Ok(mut items) => declarations.append(&mut items),
                        Err(error) => {
                            self.report(error);
                            self.synchronize();
                            if self.consumed == consumed {
                                self.next_token();
                            }
                        }
                    }
                }
            }
        }

        TranslationUnit { declarations }
    }

    // Token access
    // ------------

    fn next_token(&mut self) -> TokenWithLocation {
        if self.peek_token(0) == &Token::EndOfInput {
            return self.peek(0).clone();
        }

        match self.upstream.next() {
            Some(token_with_location) => {
                self.consumed += 1;
                self.last_location = token_with_location.location;
                token_with_location
            }
            None => self.end_of_input.clone(),
        }
    }

    fn peek(&mut self, offset: usize) -> &TokenWithLocation {
        match self.upstream.peek(offset) {
            Some(token_with_location) => token_with_location,
            None => &self.end_of_input,
        }
    }

    fn peek_token(&mut self, offset: usize) -> &Token {
        &self.peek(offset).token
    }

    fn peek_location(&mut self, offset: usize) -> Location {
        self.peek(offset).location
    }

    fn peek_punctuator(&mut self, offset: usize, punctuator: Punctuator) -> bool {
        self.peek_token(offset).is_punctuator(punctuator)
    }

    fn peek_keyword(&mut self, offset: usize, keyword: Keyword) -> bool {
        self.peek_token(offset).is_keyword(keyword)
    }

    fn peek_identifier(&mut self, offset: usize) -> Option<&str> {
        match self.peek_token(offset) {
            Token::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Consumes the next token if it is the given punctuator.
    fn consume_punctuator_if(&mut self, punctuator: Punctuator) -> bool {
        if self.peek_punctuator(0, punctuator) {
            self.next_token();
            true
        } else {
            false
        }
    }

    fn expect_and_consume_punctuator(
        &mut self,
        punctuator: Punctuator,
        context: Option<&str>,
    ) -> Result<Location, ParseError> {
        if self.peek_punctuator(0, punctuator) {
            Ok(self.next_token().location)
        } else {
            Err(ParseError::Expected {
                expected: punctuator.to_string(),
                context: context.map(|context| context.to_owned()),
                location: self.peek_location(0),
            })
        }
    }

    fn expect_and_consume_identifier(&mut self) -> Result<(String, Location), ParseError> {
        match self.peek_token(0) {
            Token::Identifier(_) => {
                let token_with_location = self.next_token();
                match token_with_location.token {
                    Token::Identifier(name) => Ok((name, token_with_location.location)),
                    _ => Err(self.unexpected_token(&["identifier"])),
                }
            }
            _ => Err(self.unexpected_token(&["identifier"])),
        }
    }

    /// Builds the error for the next token, it is not consumed.
    fn unexpected_token(&mut self, expected: &[&str]) -> ParseError {
        let token_with_location = self.peek(0);
        let found = match token_with_location.token {
            Token::EndOfInput => "end of input".to_owned(),
            _ => token_with_location.spelling.clone(),
        };

        ParseError::UnexpectedToken {
            found,
            expected: expected.iter().map(|item| item.to_string()).collect(),
            location: token_with_location.location,
        }
    }

    fn report(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.upstream
            .upstream_mut()
            .preprocessor
            .diagnostics_mut()
            .push(diagnostic.into());
    }

    // Scopes
    // ------

    fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn leave_scope(&mut self) {
        // the file scope is never left
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn declare_name(&mut self, name: &str, is_typedef: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), is_typedef);
        }
    }

    /// Whether the name refers to a typedef in the current scope,
    /// an inner declaration of an ordinary identifier hides the typedef.
    fn is_typedef_name(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .copied()
            .unwrap_or(false)
    }

    // Nesting
    // -------

    /// Runs a parse step one nesting level deeper.
    ///
    /// Every recursion of the grammar passes through this method,
    /// so that deeply nested input is reported instead of exhausting the stack.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.nesting_depth >= self.max_nesting_depth {
            return Err(ParseError::NestingTooDeep {
                max: self.max_nesting_depth,
                location: self.peek_location(0),
            });
        }

        self.nesting_depth += 1;
        let result = parse(self);
        self.nesting_depth -= 1;
        result
    }

    // Error recovery
    // --------------

    /// Skips tokens until a boundary where parsing can resume:
    /// after a `;`, before the `}` that closes the current block,
    /// after a balanced `{ ... }` group, or before a keyword
    /// that starts a statement or a declaration.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        let mut skipped = 0usize;

        loop {
            match self.peek_token(0) {
                Token::EndOfInput => break,
                Token::Punctuator(Punctuator::Semicolon) if depth == 0 => {
                    self.next_token();
                    break;
                }
                Token::Punctuator(Punctuator::BraceOpen) => {
                    depth += 1;
                }
                Token::Punctuator(Punctuator::BraceClose) => {
                    if depth == 0 {
                        break;
                    }

                    depth -= 1;
                    if depth == 0 {
                        self.next_token();
                        skipped += 1;
                        break;
                    }
                }
                Token::Keyword(keyword) if depth == 0 && skipped > 0 => {
                    if is_boundary_keyword(*keyword) {
                        break;
                    }
                }
                _ => {}
            }

            self.next_token();
            skipped += 1;
        }

        tracing::trace!(skipped, location = ?self.peek_location(0), "parser resynchronized");
    }
}

// Keywords that can only start a statement or a declaration.
fn is_boundary_keyword(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::If
            | Keyword::For
            | Keyword::While
            | Keyword::Do
            | Keyword::Switch
            | Keyword::Return
            | Keyword::Break
            | Keyword::Continue
            | Keyword::Goto
            | Keyword::Case
            | Keyword::Default
            | Keyword::Typedef
            | Keyword::Extern
            | Keyword::Static
            | Keyword::StaticAssert
            | Keyword::UnderscoreStaticAssert
            | Keyword::Struct
            | Keyword::Union
            | Keyword::Enum
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::{
        ast::{Declaration, TranslationUnit},
        options::PreprocessorOptions,
        source_buffer::SourceBuffer,
    };

    use super::{ParseResult, parse_source};

    pub(crate) fn parse(src: &str) -> ParseResult {
        parse_source(
            Arc::new(SourceBuffer::new("main.c", src)),
            PreprocessorOptions::new(),
        )
    }

    /// Parses source text that must have no diagnostics.
    pub(crate) fn parse_ok(src: &str) -> TranslationUnit {
        let result = parse(src);
        assert!(
            result.diagnostics.is_empty(),
            "{}",
            result.diagnostics.render(&result.source_map, false)
        );
        result.translation_unit
    }

    pub(crate) fn messages(result: &ParseResult) -> Vec<String> {
        result
            .diagnostics
            .iter()
            .map(|diagnostic| diagnostic.message.clone())
            .collect()
    }

    fn names(translation_unit: &TranslationUnit) -> Vec<&str> {
        translation_unit
            .declarations
            .iter()
            .filter_map(Declaration::name)
            .collect()
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_ok("").declarations.len(), 0);
        assert_eq!(parse_ok(";;\n").declarations.len(), 0);
    }

    #[test]
    fn test_recover_at_file_scope() {
        let result = parse("int a = ;\nint b;\n}\nint c;\n");

        assert_eq!(
            messages(&result),
            vec![
                "unexpected token ';', expected one of: 'expression'",
                "extraneous closing brace ('}')"
            ]
        );
        assert_eq!(names(&result.translation_unit), vec!["b", "c"]);
    }

    #[test]
    fn test_recover_in_function_body() {
        let src = "\
int foo(int x) {
    return x;
}

int baz(int x) {
    foo bar baz
}

int qux(int y) {
    return y;
}
";
        let result = parse(src);

        assert!(result.diagnostics.has_errors());
        assert!(messages(&result)[0].starts_with(
            "unexpected token 'foo', expected one of: 'int', 'char', 'short'"
        ));
        assert_eq!(names(&result.translation_unit), vec!["foo", "baz", "qux"]);
    }

    #[test]
    fn test_unknown_characters_are_skipped() {
        let result = parse("int a @= 1;\n");
        assert_eq!(messages(&result).len(), 1);
        assert_eq!(names(&result.translation_unit), vec!["a"]);
    }

    #[test]
    fn test_unclosed_brace() {
        let result = parse("int main() {\n    return 0;\n");
        assert_eq!(messages(&result), vec!["expected '}'"]);
        assert_eq!(names(&result.translation_unit), vec!["main"]);
    }

    #[test]
    fn test_nesting_limit() {
        let parse_with_limit = |src: &str| {
            parse_source(
                Arc::new(SourceBuffer::new("main.c", src)),
                PreprocessorOptions::new().with_max_nesting_depth(16),
            )
        };

        let parentheses = format!("int a = {}1{};\nint b;\n", "(".repeat(20), ")".repeat(20));
        let result = parse_with_limit(&parentheses);
        assert_eq!(
            messages(&result),
            vec!["bracket nesting level exceeded maximum of 16"]
        );
        assert_eq!(names(&result.translation_unit), vec!["b"]);

        // the rest of the block is kept after the nested blocks are skipped
        let blocks = format!(
            "int main() {{\n{}{}\n    return 0;\n}}\nint after;\n",
            "{".repeat(20),
            "}".repeat(20)
        );
        let result = parse_with_limit(&blocks);
        assert_eq!(
            messages(&result),
            vec!["bracket nesting level exceeded maximum of 16"]
        );
        assert_eq!(names(&result.translation_unit), vec!["main", "after"]);

        let initializer = format!("int c[1] = {}0{};\n", "{".repeat(20), "}".repeat(20));
        assert_eq!(
            messages(&parse_with_limit(&initializer))[0],
            "bracket nesting level exceeded maximum of 16"
        );

        // below the limit
        let shallow = format!("int d = {}1{};\n", "(".repeat(12), ")".repeat(12));
        assert!(parse_with_limit(&shallow).diagnostics.is_empty());
    }

    #[test]
    fn test_typedef_name_is_hidden_by_inner_declaration() {
        let src = "\
typedef int T;
int main() {
    T a = 1;
    {
        int T = 2;
        a = T * a;
    }
    return a;
}
";
        assert_eq!(names(&parse_ok(src)), vec!["T", "main"]);
    }
}
