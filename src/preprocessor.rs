// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::{
    collections::{HashSet, VecDeque},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDateTime;

use crate::{
    diagnostic::{Diagnostic, DiagnosticSink},
    error::PreprocessError,
    expansion::{PendingToken, TokenSource},
    expression,
    lexer::Lexer,
    location::Location,
    macro_map::{MacroDefinition, MacroMap, MacroParameters},
    options::PreprocessorOptions,
    source_buffer::{SourceBuffer, SourceMap},
    token::{Punctuator, Token, TokenWithLocation},
};

pub const COMMAND_LINE_FILE_NAME: &str = "<command line>";

#[derive(Debug, PartialEq, Clone, Copy)]
enum ConditionalState {
    // The current group is being processed.
    Active,

    // No group has been taken yet, a later `#elif` or `#else` may be taken.
    Pending,

    // A previous group has been taken, the remaining groups are skipped.
    Done,

    // The whole conditional is inside a skipped group.
    Disabled,
}

#[derive(Debug)]
struct Conditional {
    state: ConditionalState,
    location: Location,
    else_location: Option<Location>,
}

struct IncludeFrame {
    lexer: Lexer,

    // The resolved path of the file, `None` for the command line definitions.
    path: Option<PathBuf>,

    // The open `#if` groups of this file.
    conditionals: Vec<Conditional>,
}

impl IncludeFrame {
    fn new(lexer: Lexer, path: Option<PathBuf>) -> Self {
        Self {
            lexer,
            path,
            conditionals: vec![],
        }
    }
}

enum ElifKind {
    Expression,
    Defined(/* expect_defined */ bool),
}

/// Runs the preprocessing phase over a main file and the files it includes,
/// producing the expanded token stream on demand.
///
/// The stream ends with an `EndOfInput` token located at the end of the main file,
/// and `DirectiveStart`, `DirectiveEnd` and `HeaderName` never appear in it.
///
/// Errors are collected in the diagnostic sink, the preprocessor always
/// runs to the end of the input.
///
/// see:
/// - https://en.cppreference.com/w/c/preprocessor.html
/// - https://gcc.gnu.org/onlinedocs/cpp/
pub struct Preprocessor {
    pub(crate) options: PreprocessorOptions,
    pub(crate) source_map: SourceMap,
    pub(crate) diagnostics: DiagnosticSink,
    pub(crate) macros: MacroMap,

    // The innermost file is the last one, the main file is never popped.
    frames: Vec<IncludeFrame>,

    // Tokens produced by expansion (or pushed back by a lookahead), read before the files.
    pub(crate) pending: VecDeque<PendingToken>,

    once_files: HashSet<PathBuf>,
    pub(crate) undefined_builtins: HashSet<String>,
    pub(crate) counter: u64,
    pub(crate) timestamp: NaiveDateTime,
    pub(crate) base_file_name: String,

    // The nesting of macro arguments being pre-expanded.
    pub(crate) expansion_depth: usize,
    pub(crate) expansion_limit_reported: bool,

    // Unterminated conditionals of the main file have been reported.
    end_reported: bool,

    // The `EndOfInput` token has been yielded by the iterator.
    exhausted: bool,
}

impl Preprocessor {
    pub fn new(source: Arc<SourceBuffer>, options: PreprocessorOptions) -> Self {
        let mut source_map = SourceMap::new();
        let main_file_number = source_map.add(Arc::clone(&source));
        let base_file_name = source.name().to_owned();

        let mut frames = vec![IncludeFrame::new(
            Lexer::new(source, main_file_number),
            Some(PathBuf::from(&base_file_name)),
        )];

        // the command line definitions are processed before the main file
        let predefinition_text = options.predefinition_text();
        if !predefinition_text.is_empty() {
            let buffer = Arc::new(SourceBuffer::new(
                COMMAND_LINE_FILE_NAME,
                &predefinition_text,
            ));
            let file_number = source_map.add(Arc::clone(&buffer));
            frames.push(IncludeFrame::new(Lexer::new(buffer, file_number), None));
        }

        let timestamp = options
            .timestamp
            .unwrap_or_else(|| chrono::Local::now().naive_local());

        Self {
            options,
            source_map,
            diagnostics: DiagnosticSink::new(),
            macros: MacroMap::new(),
            frames,
            pending: VecDeque::new(),
            once_files: HashSet::new(),
            undefined_builtins: HashSet::new(),
            counter: 0,
            timestamp,
            base_file_name,
            expansion_depth: 0,
            expansion_limit_reported: false,
            end_reported: false,
            exhausted: false,
        }
    }

    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.diagnostics
    }

    /// The parser reports its own diagnostics into the same sink,
    /// so that all diagnostics of a run are kept in source order.
    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticSink {
        &mut self.diagnostics
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn macros(&self) -> &MacroMap {
        &self.macros
    }

    pub fn into_parts(self) -> (SourceMap, DiagnosticSink) {
        (self.source_map, self.diagnostics)
    }

    /// Returns the next fully expanded token.
    ///
    /// After the end of the input `EndOfInput` is returned repeatedly.
    pub fn next_token(&mut self) -> TokenWithLocation {
        loop {
            let token = self.next_unexpanded();
            if token.token() == &Token::EndOfInput {
                return token.token_with_location;
            }

            let mut source = TokenSource::Stream;
            if let Some(token) = self.expand_token(token, &mut source) {
                return token.token_with_location;
            }
        }
    }

    /// Returns the next token that survives conditional inclusion,
    /// directives are executed on the way.
    pub(crate) fn next_unexpanded(&mut self) -> PendingToken {
        if let Some(token) = self.pending.pop_front() {
            return token;
        }

        loop {
            let token_with_location = self.next_raw_token();
            match token_with_location.token {
                Token::EndOfInput => return PendingToken::new(token_with_location),
                Token::DirectiveStart => {
                    self.handle_directive(token_with_location.location);
                }
                _ if self.is_skipping() => {
                    // tokens of a skipped group
                }
                _ => return PendingToken::new(token_with_location),
            }
        }
    }

    fn next_raw_token(&mut self) -> TokenWithLocation {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return TokenWithLocation::synthesized(Token::EndOfInput, Location::default());
            };

            let token_with_location = frame.lexer.next_token();
            let lexer_diagnostics = frame.lexer.take_diagnostics();
            self.diagnostics.extend(lexer_diagnostics);

            if token_with_location.token != Token::EndOfInput {
                return token_with_location;
            }

            if self.frames.len() > 1 {
                if let Some(frame) = self.frames.pop() {
                    tracing::trace!(
                        file = frame.lexer.source().name(),
                        "end of included file"
                    );
                    self.report_unterminated_conditionals(frame.conditionals);
                }
                self.sync_lexer_skipping();
                continue;
            }

            if !self.end_reported {
                self.end_reported = true;
                let conditionals = self
                    .frames
                    .last_mut()
                    .map(|frame| std::mem::take(&mut frame.conditionals))
                    .unwrap_or_default();
                self.report_unterminated_conditionals(conditionals);
            }

            return token_with_location;
        }
    }

    fn report_unterminated_conditionals(&mut self, conditionals: Vec<Conditional>) {
        for conditional in conditionals {
            self.diagnostics
                .error("unterminated conditional directive", conditional.location);
        }
    }

    fn is_skipping(&self) -> bool {
        self.frames
            .last()
            .and_then(|frame| frame.conditionals.last())
            .is_some_and(|conditional| conditional.state != ConditionalState::Active)
    }

    fn sync_lexer_skipping(&mut self) {
        let skipping = self.is_skipping();
        if let Some(frame) = self.frames.last_mut() {
            frame.lexer.set_skipping(skipping);
        }
    }

    fn conditionals_mut(&mut self) -> Option<&mut Vec<Conditional>> {
        self.frames.last_mut().map(|frame| &mut frame.conditionals)
    }

    /// The number of files being processed, 1 while in the main file.
    pub(crate) fn include_level(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn is_defined(&self, name: &str) -> bool {
        self.macros.contains(name) || self.is_builtin_macro(name)
    }

    // Reads the tokens of the current directive line, returns them
    // together with the location of the line end.
    fn read_directive_line(&mut self) -> (Vec<TokenWithLocation>, Location) {
        let mut tokens = vec![];
        loop {
            let token_with_location = self.next_raw_token();
            match token_with_location.token {
                Token::DirectiveEnd | Token::EndOfInput => {
                    return (tokens, token_with_location.location);
                }
                _ => tokens.push(token_with_location),
            }
        }
    }

    fn handle_directive(&mut self, hash_location: Location) {
        let (line, end_location) = self.read_directive_line();

        // the null directive
        let Some(first) = line.first() else {
            return;
        };

        let skipping = self.is_skipping();

        let Some(name) = first.token.name().map(str::to_owned) else {
            // `# 33 "file.c"` line markers are accepted and ignored
            if !skipping && !matches!(first.token, Token::Number(_)) {
                self.diagnostics
                    .error("invalid preprocessing directive", first.location);
            }
            return;
        };

        let name_location = first.location;
        let rest = &line[1..];

        let result = match name.as_str() {
            "if" => self.handle_if(hash_location, rest, end_location),
            "ifdef" => self.handle_ifdef(hash_location, rest, true, end_location),
            "ifndef" => self.handle_ifdef(hash_location, rest, false, end_location),
            "elif" => self.handle_elif(ElifKind::Expression, name_location, rest, end_location),
            "elifdef" => {
                self.handle_elif(ElifKind::Defined(true), name_location, rest, end_location)
            }
            "elifndef" => {
                self.handle_elif(ElifKind::Defined(false), name_location, rest, end_location)
            }
            "else" => self.handle_else(name_location, rest),
            "endif" => self.handle_endif(name_location, rest),
            _ if skipping => Ok(()),
            "define" => self.handle_define(rest, end_location),
            "undef" => self.handle_undef(rest, end_location),
            "include" | "include_next" => self.handle_include(&name, rest, end_location),
            "error" => Err(PreprocessError::Message(
                join_spellings(rest),
                name_location,
            )),
            "warning" => {
                self.diagnostics.push(
                    Diagnostic::warning(&join_spellings(rest), name_location)
                        .with_code("-W#warnings"),
                );
                Ok(())
            }
            "pragma" => {
                self.handle_pragma(rest);
                Ok(())
            }
            "line" | "ident" | "sccs" => Ok(()),
            _ => Err(PreprocessError::message(
                "invalid preprocessing directive",
                name_location,
            )),
        };

        if let Err(error) = result {
            self.diagnostics.push(error.into());
        }

        self.sync_lexer_skipping();
    }

    fn warn_extra_tokens(&mut self, directive_name: &str, extra: &[TokenWithLocation]) {
        if let Some(first) = extra.first() {
            self.diagnostics.push(
                Diagnostic::warning(
                    &format!("extra tokens at end of #{} directive", directive_name),
                    first.location,
                )
                .with_code("-Wextra-tokens"),
            );
        }
    }

    fn push_conditional(&mut self, state: ConditionalState, location: Location) {
        if let Some(conditionals) = self.conditionals_mut() {
            conditionals.push(Conditional {
                state,
                location,
                else_location: None,
            });
        }
    }

    fn handle_if(
        &mut self,
        hash_location: Location,
        tokens: &[TokenWithLocation],
        end_location: Location,
    ) -> Result<(), PreprocessError> {
        let state = if self.is_skipping() {
            ConditionalState::Disabled
        } else {
            self.condition_to_state(tokens, end_location)
        };

        self.push_conditional(state, hash_location);
        Ok(())
    }

    fn handle_ifdef(
        &mut self,
        hash_location: Location,
        tokens: &[TokenWithLocation],
        expect_defined: bool,
        end_location: Location,
    ) -> Result<(), PreprocessError> {
        let state = if self.is_skipping() {
            ConditionalState::Disabled
        } else {
            self.defined_to_state(
                if expect_defined { "ifdef" } else { "ifndef" },
                tokens,
                expect_defined,
                end_location,
            )
        };

        self.push_conditional(state, hash_location);
        Ok(())
    }

    fn condition_to_state(
        &mut self,
        tokens: &[TokenWithLocation],
        end_location: Location,
    ) -> ConditionalState {
        match self.evaluate_condition(tokens, end_location) {
            Ok(true) => ConditionalState::Active,
            Ok(false) => ConditionalState::Pending,
            Err(error) => {
                // a bad condition is treated as false
                self.diagnostics.push(error.into());
                ConditionalState::Pending
            }
        }
    }

    fn defined_to_state(
        &mut self,
        directive_name: &str,
        tokens: &[TokenWithLocation],
        expect_defined: bool,
        end_location: Location,
    ) -> ConditionalState {
        let Some(first) = tokens.first() else {
            self.diagnostics.error("macro name missing", end_location);
            return ConditionalState::Pending;
        };

        let Some(name) = first.token.name() else {
            self.diagnostics
                .error("macro name must be an identifier", first.location);
            return ConditionalState::Pending;
        };

        let is_defined = self.is_defined(name);
        self.warn_extra_tokens(directive_name, &tokens[1..]);

        if is_defined == expect_defined {
            ConditionalState::Active
        } else {
            ConditionalState::Pending
        }
    }

    fn handle_elif(
        &mut self,
        kind: ElifKind,
        name_location: Location,
        tokens: &[TokenWithLocation],
        end_location: Location,
    ) -> Result<(), PreprocessError> {
        let Some((current_state, else_location)) = self
            .conditionals_mut()
            .and_then(|c| c.last())
            .map(|c| (c.state, c.else_location))
        else {
            return Err(PreprocessError::message("#elif without #if", name_location));
        };

        if let Some(else_location) = else_location {
            return Err(PreprocessError::MessageWithNote {
                message: "#elif after #else".to_owned(),
                location: name_location,
                note: "previous #else is here".to_owned(),
                note_location: else_location,
            });
        }

        let state = match current_state {
            ConditionalState::Active => ConditionalState::Done,
            ConditionalState::Pending => match kind {
                ElifKind::Expression => self.condition_to_state(tokens, end_location),
                ElifKind::Defined(expect_defined) => self.defined_to_state(
                    if expect_defined { "elifdef" } else { "elifndef" },
                    tokens,
                    expect_defined,
                    end_location,
                ),
            },
            other => other,
        };

        if let Some(conditional) = self.conditionals_mut().and_then(|c| c.last_mut()) {
            conditional.state = state;
        }
        Ok(())
    }

    fn handle_else(
        &mut self,
        name_location: Location,
        tokens: &[TokenWithLocation],
    ) -> Result<(), PreprocessError> {
        let Some(conditional) = self.conditionals_mut().and_then(|c| c.last_mut()) else {
            return Err(PreprocessError::message("#else without #if", name_location));
        };

        if let Some(else_location) = conditional.else_location {
            return Err(PreprocessError::MessageWithNote {
                message: "#else after #else".to_owned(),
                location: name_location,
                note: "previous #else is here".to_owned(),
                note_location: else_location,
            });
        }

        conditional.else_location = Some(name_location);
        conditional.state = match conditional.state {
            ConditionalState::Active => ConditionalState::Done,
            ConditionalState::Pending => ConditionalState::Active,
            other => other,
        };

        if conditional.state != ConditionalState::Disabled {
            self.warn_extra_tokens("else", tokens);
        }
        Ok(())
    }

    fn handle_endif(
        &mut self,
        name_location: Location,
        tokens: &[TokenWithLocation],
    ) -> Result<(), PreprocessError> {
        let Some(conditional) = self.conditionals_mut().and_then(|c| c.pop()) else {
            return Err(PreprocessError::message("#endif without #if", name_location));
        };

        if conditional.state != ConditionalState::Disabled {
            self.warn_extra_tokens("endif", tokens);
        }
        Ok(())
    }

    /// Evaluates the controlling expression of `#if` and `#elif`.
    ///
    /// `defined X`, `defined(X)` and `__has_include(...)` are replaced first,
    /// then the line is macro-expanded and evaluated.
    fn evaluate_condition(
        &mut self,
        tokens: &[TokenWithLocation],
        end_location: Location,
    ) -> Result<bool, PreprocessError> {
        if tokens.is_empty() {
            return Err(PreprocessError::message(
                "expected value in expression",
                end_location,
            ));
        }

        let mut replaced = vec![];
        let mut index = 0;

        while index < tokens.len() {
            let token_with_location = &tokens[index];
            let (value, consumed) = match token_with_location.token.name() {
                Some("defined") => {
                    let (name, consumed) =
                        parse_defined_operand(&tokens[index + 1..], token_with_location.location, end_location)?;
                    (self.is_defined(&name), consumed)
                }
                Some(name @ ("__has_include" | "__has_include_next")) => {
                    let (path, angle, consumed) = parse_has_include_operand(
                        name,
                        &tokens[index + 1..],
                        end_location,
                    )?;
                    (self.resolve_include(&path, angle).is_some(), consumed)
                }
                _ => {
                    replaced.push(PendingToken::new(token_with_location.clone()));
                    index += 1;
                    continue;
                }
            };

            replaced.push(PendingToken::new(
                number_token(if value { "1" } else { "0" }, token_with_location.location)
                    .with_leading_space(token_with_location.leading_space),
            ));
            index += 1 + consumed;
        }

        let expanded = self
            .expand_list(replaced)
            .into_iter()
            .map(|token| token.token_with_location)
            .collect::<Vec<_>>();

        let value = expression::evaluate_tokens(expanded, end_location)?;
        Ok(value.is_true())
    }

    fn handle_define(
        &mut self,
        tokens: &[TokenWithLocation],
        end_location: Location,
    ) -> Result<(), PreprocessError> {
        let name_token = check_macro_name(tokens, end_location)?;
        let name = name_token.token.name().unwrap_or_default().to_owned();

        if matches!(name_token.token, Token::Keyword(_)) {
            self.diagnostics.push(
                Diagnostic::warning("keyword is hidden by macro definition", name_token.location)
                    .with_code("-Wkeyword-macro"),
            );
        }

        // a function-like macro has '(' right after the name, without whitespace
        let (parameters, body_start) = match tokens.get(1) {
            Some(paren)
                if paren.token.is_punctuator(Punctuator::ParenthesisOpen) && !paren.leading_space =>
            {
                let (parameters, consumed) = parse_macro_parameters(&tokens[2..], end_location)?;
                (Some(parameters), 2 + consumed)
            }
            _ => (None, 1),
        };

        let mut replacement = tokens[body_start..].to_vec();
        if let Some(first) = replacement.first_mut() {
            first.leading_space = false;
        }

        check_replacement(&replacement, parameters.as_ref())?;

        let definition = MacroDefinition {
            name: name.clone(),
            parameters,
            replacement,
            location: name_token.location,
        };

        if self.is_builtin_macro(&name) {
            self.diagnostics.push(
                Diagnostic::warning("redefining builtin macro", name_token.location)
                    .with_code("-Wbuiltin-macro-redefined"),
            );
        }

        if let Some(previous) = self.macros.get(&name) {
            if !previous.is_same_definition(&definition) {
                let diagnostic = Diagnostic::warning(
                    &format!("'{}' macro redefined", name),
                    name_token.location,
                )
                .with_code("-Wmacro-redefined")
                .with_note("previous definition is here", previous.location);
                self.diagnostics.push(diagnostic);
            }
        }

        tracing::debug!(name = %name, "define macro");
        self.macros.define(definition);
        Ok(())
    }

    fn handle_undef(
        &mut self,
        tokens: &[TokenWithLocation],
        end_location: Location,
    ) -> Result<(), PreprocessError> {
        let name_token = check_macro_name(tokens, end_location)?;
        let name = name_token.token.name().unwrap_or_default().to_owned();
        let location = name_token.location;

        self.warn_extra_tokens("undef", &tokens[1..]);

        if self.macros.remove(&name).is_some() {
            tracing::debug!(name = %name, "undefine macro");
        } else if self.is_builtin_macro(&name) {
            self.diagnostics.push(
                Diagnostic::warning("undefining builtin macro", location)
                    .with_code("-Wbuiltin-macro-redefined"),
            );
            self.undefined_builtins.insert(name);
        } else {
            self.diagnostics.push(
                Diagnostic::warning(&format!("macro '{}' is not defined", name), location)
                    .with_code("-Wundef"),
            );
        }
        Ok(())
    }

    fn handle_pragma(&mut self, tokens: &[TokenWithLocation]) {
        match tokens.first().and_then(|t| t.token.name()) {
            Some("once") => {
                if let Some(path) = self.frames.last().and_then(|frame| frame.path.clone()) {
                    self.once_files.insert(path);
                }
            }
            _ => {
                tracing::trace!(pragma = %join_spellings(tokens), "ignore pragma");
            }
        }
    }

    /// Resolves the path of `#include` and `__has_include`.
    ///
    /// A quoted path is searched relative to the current file first.
    fn resolve_include(&self, path: &str, angle: bool) -> Option<PathBuf> {
        let file_provider = self.options.file_provider.as_deref()?;
        let header = Path::new(path);

        if angle {
            file_provider
                .resolve_user_file(header)
                .or_else(|| file_provider.resolve_system_file(header))
        } else {
            let current = self.frames.last().and_then(|frame| frame.path.as_deref());
            file_provider.resolve_quoted_file(header, current)
        }
    }

    #[tracing::instrument(skip(self, tokens, end_location))]
    fn handle_include(
        &mut self,
        directive_name: &str,
        tokens: &[TokenWithLocation],
        end_location: Location,
    ) -> Result<(), PreprocessError> {
        let (path, angle, location) = self.parse_include_operand(directive_name, tokens, end_location)?;

        let depth = self.frames.len();
        if depth > self.options.max_include_depth {
            return Err(PreprocessError::IncludeTooDeep {
                depth,
                max: self.options.max_include_depth,
                location,
            });
        }

        let Some(resolved) = self.resolve_include(&path, angle) else {
            return Err(PreprocessError::FileNotFound { path, location });
        };

        if self.once_files.contains(&resolved) {
            tracing::debug!(path = %resolved.display(), "skip file included once");
            return Ok(());
        }

        let text = match self.options.file_provider.as_deref() {
            Some(file_provider) => file_provider.load_file(&resolved).map_err(|error| {
                PreprocessError::Message(format!("cannot read '{}': {}", path, error), location)
            })?,
            None => return Err(PreprocessError::FileNotFound { path, location }),
        };

        let buffer = Arc::new(SourceBuffer::new(&resolved.to_string_lossy(), &text));
        let file_number = self.source_map.add(Arc::clone(&buffer));

        tracing::debug!(path = %resolved.display(), file_number, "enter included file");
        self.frames
            .push(IncludeFrame::new(Lexer::new(buffer, file_number), Some(resolved)));
        Ok(())
    }

    // Returns the path, whether it is an `<...>` path, and its location.
    fn parse_include_operand(
        &mut self,
        directive_name: &str,
        tokens: &[TokenWithLocation],
        end_location: Location,
    ) -> Result<(String, bool, Location), PreprocessError> {
        const EXPECTED_FILE_NAME: &str = "expected \"FILENAME\" or <FILENAME>";

        let Some(first) = tokens.first() else {
            return Err(PreprocessError::message(EXPECTED_FILE_NAME, end_location));
        };

        if let Token::HeaderName(path, angle) = &first.token {
            self.warn_extra_tokens(directive_name, &tokens[1..]);
            return Ok((path.clone(), *angle, first.location));
        }

        // computed include, e.g. `#include HEADER`
        let expanded = self.expand_list(
            tokens
                .iter()
                .cloned()
                .map(PendingToken::new)
                .collect(),
        );

        match expanded.first().map(|t| &t.token_with_location.token) {
            Some(Token::String(path, _)) => Ok((path.clone(), false, first.location)),
            Some(Token::Punctuator(Punctuator::LessThan)) => {
                let mut path = String::new();
                for (index, token) in expanded.iter().enumerate().skip(1) {
                    let token_with_location = &token.token_with_location;
                    if token_with_location.token.is_punctuator(Punctuator::GreaterThan) {
                        return Ok((path, true, first.location));
                    }
                    if index > 1 && token_with_location.leading_space {
                        path.push(' ');
                    }
                    path.push_str(&token_with_location.spelling);
                }
                Err(PreprocessError::message(EXPECTED_FILE_NAME, first.location))
            }
            _ => Err(PreprocessError::message(EXPECTED_FILE_NAME, first.location)),
        }
    }
}

impl Iterator for Preprocessor {
    type Item = TokenWithLocation;

    /// Yields the tokens up to and including `EndOfInput`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let token_with_location = self.next_token();
        if token_with_location.token == Token::EndOfInput {
            self.exhausted = true;
        }
        Some(token_with_location)
    }
}

pub(crate) fn number_token(text: &str, location: Location) -> TokenWithLocation {
    match crate::lexer::parse_number(text) {
        Ok(number) => TokenWithLocation::new(Token::Number(number), location, text),
        Err(_) => TokenWithLocation::new(Token::Identifier(text.to_owned()), location, text),
    }
}

// Joins the spellings of a token sequence, keeping one space where the source had whitespace.
pub(crate) fn join_spellings(tokens: &[TokenWithLocation]) -> String {
    let mut text = String::new();
    for (index, token_with_location) in tokens.iter().enumerate() {
        if index > 0 && token_with_location.leading_space {
            text.push(' ');
        }
        text.push_str(&token_with_location.spelling);
    }
    text
}

fn check_macro_name(
    tokens: &[TokenWithLocation],
    end_location: Location,
) -> Result<&TokenWithLocation, PreprocessError> {
    let Some(first) = tokens.first() else {
        return Err(PreprocessError::message("macro name missing", end_location));
    };

    match first.token.name() {
        Some("defined") => Err(PreprocessError::message(
            "'defined' cannot be used as a macro name",
            first.location,
        )),
        Some(_) => Ok(first),
        None => Err(PreprocessError::message(
            "macro name must be an identifier",
            first.location,
        )),
    }
}

// Parses the operand of `defined`, i.e. `X` or `(X)`,
// returns the name and the number of consumed tokens.
fn parse_defined_operand(
    tokens: &[TokenWithLocation],
    defined_location: Location,
    end_location: Location,
) -> Result<(String, usize), PreprocessError> {
    let name_of = |index: usize| -> Result<String, PreprocessError> {
        match tokens.get(index) {
            Some(token_with_location) => match token_with_location.token.name() {
                Some(name) => Ok(name.to_owned()),
                None => Err(PreprocessError::message(
                    "macro name must be an identifier",
                    token_with_location.location,
                )),
            },
            None => Err(PreprocessError::message("macro name missing", end_location)),
        }
    };

    match tokens.first() {
        Some(paren) if paren.token.is_punctuator(Punctuator::ParenthesisOpen) => {
            let name = name_of(1)?;
            match tokens.get(2) {
                Some(close) if close.token.is_punctuator(Punctuator::ParenthesisClose) => {
                    Ok((name, 3))
                }
                _ => Err(PreprocessError::MessageWithNote {
                    message: "missing ')' after 'defined'".to_owned(),
                    location: tokens.get(2).map_or(end_location, |t| t.location),
                    note: "to match this '('".to_owned(),
                    note_location: paren.location,
                }),
            }
        }
        Some(_) => Ok((name_of(0)?, 1)),
        None => Err(PreprocessError::message(
            "macro name missing",
            defined_location,
        )),
    }
}

// Parses `("file.h")` or `(<file.h>)` following `__has_include`,
// returns the path, whether it is an `<...>` path, and the number of consumed tokens.
fn parse_has_include_operand(
    operator_name: &str,
    tokens: &[TokenWithLocation],
    end_location: Location,
) -> Result<(String, bool, usize), PreprocessError> {
    let location_at = |index: usize| tokens.get(index).map_or(end_location, |t| t.location);

    if !tokens
        .first()
        .is_some_and(|t| t.token.is_punctuator(Punctuator::ParenthesisOpen))
    {
        return Err(PreprocessError::Message(
            format!("missing '(' after '{}'", operator_name),
            location_at(0),
        ));
    }

    let (path, angle) = match tokens.get(1).map(|t| &t.token) {
        Some(Token::HeaderName(path, angle)) => (path.clone(), *angle),
        Some(Token::String(path, _)) => (path.clone(), false),
        _ => {
            return Err(PreprocessError::message(
                "expected \"FILENAME\" or <FILENAME>",
                location_at(1),
            ));
        }
    };

    if !tokens
        .get(2)
        .is_some_and(|t| t.token.is_punctuator(Punctuator::ParenthesisClose))
    {
        return Err(PreprocessError::message("missing ')' after file name", location_at(2)));
    }

    Ok((path, angle, 3))
}

// Parses the parameter list after `#define NAME(`,
// returns the parameters and the number of consumed tokens including the ')'.
fn parse_macro_parameters(
    tokens: &[TokenWithLocation],
    end_location: Location,
) -> Result<(MacroParameters, usize), PreprocessError> {
    let missing_paren = |index: usize| match tokens.get(index) {
        Some(token_with_location) => PreprocessError::message(
            "expected ')' in macro parameter list",
            token_with_location.location,
        ),
        None => PreprocessError::message("missing ')' in macro parameter list", end_location),
    };
    let is_close = |index: usize| {
        tokens
            .get(index)
            .is_some_and(|t| t.token.is_punctuator(Punctuator::ParenthesisClose))
    };

    let mut names: Vec<String> = vec![];

    if is_close(0) {
        return Ok((
            MacroParameters {
                names,
                variadic: false,
            },
            1,
        ));
    }

    let mut index = 0;
    loop {
        let Some(token_with_location) = tokens.get(index) else {
            return Err(missing_paren(index));
        };

        if token_with_location.token.is_punctuator(Punctuator::Ellipsis) {
            if !is_close(index + 1) {
                return Err(missing_paren(index + 1));
            }
            names.push("__VA_ARGS__".to_owned());
            return Ok((
                MacroParameters {
                    names,
                    variadic: true,
                },
                index + 2,
            ));
        }

        let Some(name) = token_with_location.token.name() else {
            return Err(PreprocessError::message(
                "invalid token in macro parameter list",
                token_with_location.location,
            ));
        };

        if name == "__VA_ARGS__" {
            return Err(PreprocessError::message(
                "__VA_ARGS__ can only appear in the expansion of a C99 variadic macro",
                token_with_location.location,
            ));
        }

        if names.iter().any(|n| n == name) {
            return Err(PreprocessError::Message(
                format!("duplicate macro parameter name '{}'", name),
                token_with_location.location,
            ));
        }

        names.push(name.to_owned());
        index += 1;

        match tokens.get(index) {
            // GNU named variadic parameter, e.g. `args...`
            Some(next) if next.token.is_punctuator(Punctuator::Ellipsis) => {
                if !is_close(index + 1) {
                    return Err(missing_paren(index + 1));
                }
                return Ok((
                    MacroParameters {
                        names,
                        variadic: true,
                    },
                    index + 2,
                ));
            }
            Some(next) if next.token.is_punctuator(Punctuator::Comma) => {
                index += 1;
            }
            Some(next) if next.token.is_punctuator(Punctuator::ParenthesisClose) => {
                return Ok((
                    MacroParameters {
                        names,
                        variadic: false,
                    },
                    index + 1,
                ));
            }
            _ => return Err(missing_paren(index)),
        }
    }
}

fn check_replacement(
    replacement: &[TokenWithLocation],
    parameters: Option<&MacroParameters>,
) -> Result<(), PreprocessError> {
    let is_paste = |t: &TokenWithLocation| t.token.is_punctuator(Punctuator::PoundPound);

    for token_with_location in [replacement.first(), replacement.last()].into_iter().flatten() {
        if is_paste(token_with_location) {
            return Err(PreprocessError::message(
                "'##' cannot appear at either end of a macro expansion",
                token_with_location.location,
            ));
        }
    }

    // `#` is only an operator in function-like macros
    let Some(parameters) = parameters else {
        return Ok(());
    };

    for (index, token_with_location) in replacement.iter().enumerate() {
        if token_with_location.token.name() == Some("__VA_OPT__") && parameters.variadic {
            let has_paren = replacement
                .get(index + 1)
                .is_some_and(|t| t.token.is_punctuator(Punctuator::ParenthesisOpen));
            if !has_paren {
                return Err(PreprocessError::message(
                    "missing '(' following __VA_OPT__",
                    token_with_location.location,
                ));
            }
            if find_matching_paren(replacement, index + 1).is_none() {
                return Err(PreprocessError::message(
                    "unterminated __VA_OPT__",
                    token_with_location.location,
                ));
            }
        }

        if !token_with_location.token.is_punctuator(Punctuator::Pound) {
            continue;
        }

        let operand = replacement.get(index + 1).and_then(|t| t.token.name());
        let is_parameter = operand.is_some_and(|name| {
            parameters.index_of(name).is_some() || (name == "__VA_OPT__" && parameters.variadic)
        });

        if !is_parameter {
            return Err(PreprocessError::message(
                "'#' is not followed by a macro parameter",
                token_with_location.location,
            ));
        }
    }

    Ok(())
}

/// Returns the index of the ')' matching the '(' at `open_index`.
pub(crate) fn find_matching_paren(tokens: &[TokenWithLocation], open_index: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token_with_location) in tokens.iter().enumerate().skip(open_index) {
        match &token_with_location.token {
            Token::Punctuator(Punctuator::ParenthesisOpen) => depth += 1,
            Token::Punctuator(Punctuator::ParenthesisClose) => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::{
        memory_file_provider::MemoryFileProvider,
        options::PreprocessorOptions,
        source_buffer::SourceBuffer,
        token::Token,
    };

    use super::Preprocessor;

    fn preprocess_with_options(src: &str, options: PreprocessorOptions) -> (String, Vec<String>) {
        let mut preprocessor =
            Preprocessor::new(Arc::new(SourceBuffer::new("main.c", src)), options);

        let spellings = preprocessor
            .by_ref()
            .filter(|t| t.token != Token::EndOfInput)
            .map(|t| t.spelling)
            .collect::<Vec<_>>();

        let messages = preprocessor
            .diagnostics()
            .iter()
            .map(|d| d.message.clone())
            .collect();

        (spellings.join(" "), messages)
    }

    fn preprocess(src: &str) -> (String, Vec<String>) {
        preprocess_with_options(src, PreprocessorOptions::new())
    }

    fn preprocess_text(src: &str) -> String {
        let (text, messages) = preprocess(src);
        assert_eq!(messages, Vec::<String>::new());
        text
    }

    #[test]
    fn test_no_directive() {
        assert_eq!(preprocess_text("int a = 1;\n"), "int a = 1 ;");
        assert_eq!(preprocess_text(""), "");
    }

    #[test]
    fn test_object_like_macro() {
        assert_eq!(
            preprocess_text("#define A 11\n#define B A + A\nint x = B;\n"),
            "int x = 11 + 11 ;"
        );

        // a macro does not expand inside its own expansion
        assert_eq!(preprocess_text("#define X X\nX\n"), "X");
        assert_eq!(
            preprocess_text("#define foo foo a bar\n#define bar foo\nfoo\n"),
            "foo a foo"
        );

        // empty replacement
        assert_eq!(preprocess_text("#define E\nint E x;\n"), "int x ;");
    }

    #[test]
    fn test_undef() {
        assert_eq!(
            preprocess_text("#define A 1\n#undef A\nA\n"),
            "A"
        );

        let (_, messages) = preprocess("#undef NOPE\n");
        assert_eq!(messages, vec!["macro 'NOPE' is not defined"]);
    }

    #[test]
    fn test_redefinition() {
        // identical redefinition is allowed
        assert_eq!(
            preprocess_text("#define A 1 + 2\n#define A 1  +  2\nA\n"),
            "1 + 2"
        );

        let (text, messages) = preprocess("#define A 1\n#define A 2\nA\n");
        assert_eq!(text, "2");
        assert_eq!(messages, vec!["'A' macro redefined"]);
    }

    #[test]
    fn test_define_errors() {
        let (_, messages) = preprocess("#define\n");
        assert_eq!(messages, vec!["macro name missing"]);

        let (_, messages) = preprocess("#define 123\n");
        assert_eq!(messages, vec!["macro name must be an identifier"]);

        let (_, messages) = preprocess("#define defined\n");
        assert_eq!(messages, vec!["'defined' cannot be used as a macro name"]);

        let (_, messages) = preprocess("#define F(a, a) a\n");
        assert_eq!(messages, vec!["duplicate macro parameter name 'a'"]);

        let (_, messages) = preprocess("#define F(a b) a\n");
        assert_eq!(messages, vec!["expected ')' in macro parameter list"]);

        let (_, messages) = preprocess("#define F(a, 1) a\n");
        assert_eq!(messages, vec!["invalid token in macro parameter list"]);

        let (_, messages) = preprocess("#define F(a) #b\n");
        assert_eq!(messages, vec!["'#' is not followed by a macro parameter"]);

        let (_, messages) = preprocess("#define F(a) ## a\n");
        assert_eq!(
            messages,
            vec!["'##' cannot appear at either end of a macro expansion"]
        );
    }

    #[test]
    fn test_conditionals() {
        let src = "\
#define A 2
#if A == 1
one
#elif A == 2
two
#else
other
#endif
#ifdef A
defined
#endif
#ifndef A
undefined
#endif
";
        assert_eq!(preprocess_text(src), "two defined");

        let src = "\
#if 0
#if 1
no
#else
no
#endif
#elif defined(B) || !defined A
yes
#endif
";
        assert_eq!(preprocess_text(src), "yes");

        let src = "\
#if 0
#elifdef UNDEFINED
no
#elifndef UNDEFINED
yes
#endif
";
        assert_eq!(preprocess_text(src), "yes");
    }

    #[test]
    fn test_skipped_group_is_not_lexed_for_errors() {
        let src = "\
#if 0
'unterminated
#bogus directive
#endif
ok
";
        assert_eq!(preprocess_text(src), "ok");
    }

    #[test]
    fn test_conditional_errors() {
        let (_, messages) = preprocess("#endif\n");
        assert_eq!(messages, vec!["#endif without #if"]);

        let (_, messages) = preprocess("#else\n");
        assert_eq!(messages, vec!["#else without #if"]);

        let (_, messages) = preprocess("#elif 1\n");
        assert_eq!(messages, vec!["#elif without #if"]);

        let (text, messages) = preprocess("#if 1\na\n#else\nb\n#else\nc\n#endif\n");
        assert_eq!(text, "a");
        assert_eq!(messages, vec!["#else after #else"]);

        let (text, messages) = preprocess("#if 1\na\n");
        assert_eq!(text, "a");
        assert_eq!(messages, vec!["unterminated conditional directive"]);

        // a bad condition is reported and treated as false
        let (text, messages) = preprocess("#if 1 +\na\n#else\nb\n#endif\n");
        assert_eq!(text, "b");
        assert_eq!(messages, vec!["expected value in expression"]);
    }

    #[test]
    fn test_condition_expands_macros() {
        let src = "\
#define VERSION 3
#define AT_LEAST(v) (VERSION >= (v))
#if AT_LEAST(2) && !AT_LEAST(4)
ok
#endif
";
        assert_eq!(preprocess_text(src), "ok");
    }

    #[test]
    fn test_error_and_warning_directives() {
        let (text, messages) = preprocess("#warning be careful\n#error stop here\nafter\n");
        assert_eq!(text, "after");
        assert_eq!(messages, vec!["be careful", "stop here"]);

        let (_, messages) = preprocess("#foo\n");
        assert_eq!(messages, vec!["invalid preprocessing directive"]);

        // null directive, line markers and pragmas
        assert_eq!(
            preprocess_text("#\n# 1 \"main.c\"\n#pragma GCC diagnostic push\nx\n"),
            "x"
        );
    }

    #[test]
    fn test_include() {
        let mut provider = MemoryFileProvider::default();
        provider.add_file("/include/config.h", "#define SIZE 16\n");
        provider.add_system_file("types.h", "typedef int myint;\n");
        provider.add_file("/include/once.h", "#pragma once\nonce\n");

        let options = PreprocessorOptions::new().with_file_provider(provider);
        let src = "\
#include \"config.h\"
#include <types.h>
#include \"once.h\"
#include \"once.h\"
#if __has_include(<types.h>) && !__has_include(\"missing.h\")
int a[SIZE];
#endif
";
        let (text, messages) = preprocess_with_options(src, options);
        assert_eq!(text, "typedef int myint ; once int a [ 16 ] ;");
        assert_eq!(messages, Vec::<String>::new());
    }

    #[test]
    fn test_include_errors() {
        let (text, messages) = preprocess("#include \"missing.h\"\nx\n");
        assert_eq!(text, "x");
        assert_eq!(messages, vec!["'missing.h' file not found"]);

        let (_, messages) = preprocess("#include\n");
        assert_eq!(messages, vec!["expected \"FILENAME\" or <FILENAME>"]);

        let mut provider = MemoryFileProvider::default();
        provider.add_file("/include/self.h", "#include \"self.h\"\n");
        let options = PreprocessorOptions::new()
            .with_file_provider(provider)
            .with_max_include_depth(8);
        let (_, messages) = preprocess_with_options("#include \"self.h\"\n", options);
        assert_eq!(
            messages,
            vec!["#include nested depth 9 exceeds maximum of 8"]
        );
    }

    #[test]
    fn test_computed_include() {
        let mut provider = MemoryFileProvider::default();
        provider.add_file("/include/a.h", "from_a\n");

        let options = PreprocessorOptions::new().with_file_provider(provider);
        let (text, messages) =
            preprocess_with_options("#define HEADER \"a.h\"\n#include HEADER\n", options);
        assert_eq!(text, "from_a");
        assert_eq!(messages, Vec::<String>::new());
    }

    #[test]
    fn test_command_line_definitions() {
        let options = PreprocessorOptions::new()
            .with_definition("DEBUG", "1")
            .with_definition("TWICE(x)", "((x) * 2)");
        let (text, messages) =
            preprocess_with_options("#if DEBUG\nTWICE(3)\n#endif\n", options);
        assert_eq!(text, "( ( 3 ) * 2 )");
        assert_eq!(messages, Vec::<String>::new());
    }

    #[test]
    fn test_end_of_input_repeats() {
        let mut preprocessor = Preprocessor::new(
            Arc::new(SourceBuffer::new("main.c", "a")),
            PreprocessorOptions::new(),
        );
        assert_eq!(preprocessor.next_token().spelling, "a");
        assert_eq!(preprocessor.next_token().token, Token::EndOfInput);
        assert_eq!(preprocessor.next_token().token, Token::EndOfInput);
    }
}
