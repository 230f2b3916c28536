// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! Macro expansion with hide sets.
//!
//! Every token carries the set of macro names it must not be expanded by.
//! The result of an expansion is pushed back in front of the input and rescanned,
//! so a macro can expand into another macro invocation but never into itself.
//!
//! see:
//! - https://en.cppreference.com/w/c/preprocessor/replace.html
//! - Dave Prosser's algorithm, https://www.spinellis.gr/blog/20060626/cpp.algo.pdf

use std::{
    collections::{BTreeSet, VecDeque},
    sync::Arc,
};

use crate::{
    diagnostic::Diagnostic,
    error::PreprocessError,
    lexer::Lexer,
    location::Location,
    macro_map::{MacroDefinition, MacroParameters},
    preprocessor::{Preprocessor, find_matching_paren},
    source_buffer::SourceBuffer,
    token::{Punctuator, StringEncoding, Token, TokenWithLocation},
};

pub(crate) type HideSet = BTreeSet<String>;

/// A token waiting to be rescanned, with the names of the macros
/// it was produced by.
#[derive(Debug, Clone)]
pub(crate) struct PendingToken {
    pub token_with_location: TokenWithLocation,
    pub hide_set: HideSet,
}

impl PendingToken {
    pub fn new(token_with_location: TokenWithLocation) -> Self {
        Self {
            token_with_location,
            hide_set: HideSet::new(),
        }
    }

    pub fn token(&self) -> &Token {
        &self.token_with_location.token
    }

    pub fn location(&self) -> Location {
        self.token_with_location.location
    }
}

/// Where the tokens following a macro name come from.
pub(crate) enum TokenSource<'a> {
    // The main token stream, directives are executed while reading.
    Stream,

    // A finite list, e.g. a macro argument being pre-expanded or a `#if` line.
    List(&'a mut VecDeque<PendingToken>),
}

// The replacement list after parameter substitution, before `##` is applied.
enum Piece {
    Token(PendingToken),

    // Stands for an empty argument next to `##`.
    Placemarker,

    Paste,
}

struct Invocation<'a> {
    parameters: Option<&'a MacroParameters>,
    arguments: Vec<Vec<PendingToken>>,

    // Fully macro-expanded arguments, computed when first needed.
    expanded_arguments: Vec<Option<Vec<PendingToken>>>,

    location: Location,
}

impl Invocation<'_> {
    fn parameter_index(&self, token_with_location: &TokenWithLocation) -> Option<usize> {
        let parameters = self.parameters?;
        token_with_location
            .token
            .name()
            .and_then(|name| parameters.index_of(name))
    }

    fn is_variadic_parameter(&self, token_with_location: &TokenWithLocation) -> bool {
        match (self.parameters, self.parameter_index(token_with_location)) {
            (Some(parameters), Some(index)) => parameters.is_variadic_index(index),
            _ => false,
        }
    }

    fn variadic_argument_is_empty(&self) -> bool {
        match self.parameters {
            Some(parameters) if parameters.variadic => self
                .arguments
                .get(parameters.names.len() - 1)
                .is_none_or(|argument| argument.is_empty()),
            _ => true,
        }
    }
}

impl Preprocessor {
    fn source_next(&mut self, source: &mut TokenSource) -> Option<PendingToken> {
        match source {
            TokenSource::Stream => {
                let token = self.next_unexpanded();
                if token.token() == &Token::EndOfInput {
                    None
                } else {
                    Some(token)
                }
            }
            TokenSource::List(queue) => queue.pop_front(),
        }
    }

    fn push_front(&mut self, source: &mut TokenSource, tokens: Vec<PendingToken>) {
        match source {
            TokenSource::Stream => prepend(&mut self.pending, tokens),
            TokenSource::List(queue) => prepend(queue, tokens),
        }
    }

    /// Expands the given token if it names a macro.
    ///
    /// Returns the token itself when it is not expanded, or `None` when the
    /// expansion has been pushed back into the source for rescanning.
    pub(crate) fn expand_token(
        &mut self,
        token: PendingToken,
        source: &mut TokenSource,
    ) -> Option<PendingToken> {
        let Some(name) = token.token().name() else {
            return Some(token);
        };

        if token.hide_set.contains(name) {
            return Some(token);
        }

        if let Some(definition) = self.macros.get(name).cloned() {
            tracing::trace!(name = %definition.name, "expand macro");

            return match &definition.parameters {
                None => {
                    let tokens = self.expand_object_like(&token, &definition);
                    self.push_front(source, tokens);
                    None
                }
                Some(parameters) => {
                    self.expand_function_like(token, &definition, parameters, source)
                }
            };
        }

        if self.is_builtin_macro(name) {
            let name = name.to_owned();
            return Some(self.expand_builtin_macro(&name, token));
        }

        Some(token)
    }

    /// Fully expands a finite token list, used for macro arguments
    /// and the operands of `#if` and `#include`.
    pub(crate) fn expand_list(&mut self, tokens: Vec<PendingToken>) -> Vec<PendingToken> {
        let mut queue: VecDeque<PendingToken> = tokens.into();
        let mut output = vec![];

        while let Some(token) = queue.pop_front() {
            let mut source = TokenSource::List(&mut queue);
            if let Some(token) = self.expand_token(token, &mut source) {
                output.push(token);
            }
        }

        output
    }

    fn expand_object_like(
        &mut self,
        name_token: &PendingToken,
        definition: &MacroDefinition,
    ) -> Vec<PendingToken> {
        let mut hide_set = name_token.hide_set.clone();
        hide_set.insert(definition.name.clone());

        let mut invocation = Invocation {
            parameters: None,
            arguments: vec![],
            expanded_arguments: vec![],
            location: name_token.location(),
        };

        let pieces = self.substitute(&mut invocation, &definition.replacement);
        let tokens = self.paste_pieces(pieces);
        finish_expansion(tokens, name_token, &hide_set)
    }

    fn expand_function_like(
        &mut self,
        name_token: PendingToken,
        definition: &MacroDefinition,
        parameters: &MacroParameters,
        source: &mut TokenSource,
    ) -> Option<PendingToken> {
        // the name of a function-like macro is not an invocation without a '('
        let Some(open) = self.source_next(source) else {
            return Some(name_token);
        };

        if !open.token().is_punctuator(Punctuator::ParenthesisOpen) {
            self.push_front(source, vec![open]);
            return Some(name_token);
        }

        let mut consumed = vec![open];
        let mut arguments: Vec<Vec<PendingToken>> = vec![vec![]];
        let mut depth = 0usize;

        let closing = loop {
            let Some(token) = self.source_next(source) else {
                self.diagnostics
                    .push(PreprocessError::UnterminatedInvocation(name_token.location()).into());
                self.push_front(source, consumed);
                return Some(name_token);
            };

            consumed.push(token.clone());

            match token.token() {
                Token::Punctuator(Punctuator::ParenthesisOpen) => depth += 1,
                Token::Punctuator(Punctuator::ParenthesisClose) => {
                    if depth == 0 {
                        break token;
                    }
                    depth -= 1;
                }
                Token::Punctuator(Punctuator::Comma)
                    if depth == 0
                        // extra commas belong to the variadic argument
                        && !(parameters.variadic && arguments.len() == parameters.names.len()) =>
                {
                    arguments.push(vec![]);
                    continue;
                }
                _ => {}
            }

            if let Some(argument) = arguments.last_mut() {
                argument.push(token);
            }
        };

        if let Err(message) = check_argument_count(&mut arguments, parameters) {
            let diagnostic = Diagnostic::error(message, closing.location())
                .with_note(&format!("macro '{}' defined here", definition.name), definition.location);
            self.diagnostics.push(diagnostic);
            self.push_front(source, consumed);
            return Some(name_token);
        }

        // the intersection keeps a macro expandable when only its name,
        // but not the whole invocation, came from its own expansion
        let mut hide_set = name_token
            .hide_set
            .intersection(&closing.hide_set)
            .cloned()
            .collect::<HideSet>();
        hide_set.insert(definition.name.clone());

        let argument_count = arguments.len();
        let mut invocation = Invocation {
            parameters: Some(parameters),
            arguments,
            expanded_arguments: vec![None; argument_count],
            location: name_token.location(),
        };

        let pieces = self.substitute(&mut invocation, &definition.replacement);
        let tokens = self.paste_pieces(pieces);
        let tokens = finish_expansion(tokens, &name_token, &hide_set);

        self.push_front(source, tokens);
        None
    }

    fn expanded_argument(&mut self, invocation: &mut Invocation, index: usize) -> Vec<PendingToken> {
        if let Some(Some(expanded)) = invocation.expanded_arguments.get(index) {
            return expanded.clone();
        }

        let argument = invocation.arguments.get(index).cloned().unwrap_or_default();

        // arguments nested deeper than the limit are substituted unexpanded
        let max = self.options.max_nesting_depth;
        if self.expansion_depth >= max {
            if !self.expansion_limit_reported {
                self.expansion_limit_reported = true;
                self.diagnostics.push(
                    PreprocessError::ExpansionTooDeep {
                        max,
                        location: invocation.location,
                    }
                    .into(),
                );
            }
            return argument;
        }

        self.expansion_depth += 1;
        let expanded = self.expand_list(argument);
        self.expansion_depth -= 1;
        if self.expansion_depth == 0 {
            self.expansion_limit_reported = false;
        }

        if let Some(slot) = invocation.expanded_arguments.get_mut(index) {
            *slot = Some(expanded.clone());
        }
        expanded
    }

    /// Replaces the parameters in the replacement list with the arguments.
    ///
    /// - `#param` becomes a string literal of the raw argument.
    /// - A parameter next to `##` becomes the raw argument.
    /// - Other parameters become the fully expanded argument.
    fn substitute(
        &mut self,
        invocation: &mut Invocation,
        replacement: &[TokenWithLocation],
    ) -> Vec<Piece> {
        let is_paste = |index: usize| {
            replacement
                .get(index)
                .is_some_and(|t| t.token.is_punctuator(Punctuator::PoundPound))
        };
        let is_function_like = invocation.parameters.is_some();
        let variadic = invocation.parameters.is_some_and(|p| p.variadic);

        let mut pieces = vec![];
        let mut index = 0;

        while index < replacement.len() {
            let current = &replacement[index];
            let next = replacement.get(index + 1);

            // `#param` and `#__VA_OPT__(...)`
            if is_function_like && current.token.is_punctuator(Punctuator::Pound) {
                if let Some(next) = next {
                    if let Some(parameter_index) = invocation.parameter_index(next) {
                        let argument =
                            invocation.arguments.get(parameter_index).cloned().unwrap_or_default();
                        pieces.push(Piece::Token(stringify(
                            &argument,
                            invocation.location,
                            current.leading_space,
                        )));
                        index += 2;
                        continue;
                    }

                    if variadic && next.token.name() == Some("__VA_OPT__") {
                        let close = find_matching_paren(replacement, index + 2)
                            .unwrap_or(replacement.len() - 1);
                        let content = self.va_opt_content(invocation, &replacement[index + 2..=close]);
                        pieces.push(Piece::Token(stringify(
                            &content,
                            invocation.location,
                            current.leading_space,
                        )));
                        index = close + 1;
                        continue;
                    }
                }
            }

            if current.token.is_punctuator(Punctuator::PoundPound) {
                pieces.push(Piece::Paste);
                index += 1;
                continue;
            }

            // GNU `, ## __VA_ARGS__` drops the comma when the variadic argument is empty
            if current.token.is_punctuator(Punctuator::Comma)
                && is_paste(index + 1)
                && replacement
                    .get(index + 2)
                    .is_some_and(|t| invocation.is_variadic_parameter(t))
            {
                if !invocation.variadic_argument_is_empty() {
                    pieces.push(Piece::Token(self.replacement_token(current, invocation.location)));
                    let parameter_index = invocation.arguments.len() - 1;
                    pieces.extend(
                        invocation.arguments[parameter_index]
                            .iter()
                            .cloned()
                            .map(|token| Piece::Token(mark_expanded(token))),
                    );
                }
                index += 3;
                continue;
            }

            if variadic
                && current.token.name() == Some("__VA_OPT__")
                && next.is_some_and(|t| t.token.is_punctuator(Punctuator::ParenthesisOpen))
            {
                let close =
                    find_matching_paren(replacement, index + 1).unwrap_or(replacement.len() - 1);
                let content = &replacement[index + 2..close];

                if invocation.variadic_argument_is_empty() {
                    pieces.push(Piece::Placemarker);
                } else {
                    let inner = self.substitute(invocation, content);
                    if inner.is_empty() {
                        pieces.push(Piece::Placemarker);
                    } else {
                        pieces.extend(inner);
                    }
                }
                index = close + 1;
                continue;
            }

            if let Some(parameter_index) = invocation.parameter_index(current) {
                let next_to_paste = (index > 0 && is_paste(index - 1)) || is_paste(index + 1);

                let argument = if next_to_paste {
                    invocation.arguments.get(parameter_index).cloned().unwrap_or_default()
                } else {
                    self.expanded_argument(invocation, parameter_index)
                };

                if argument.is_empty() {
                    if next_to_paste {
                        pieces.push(Piece::Placemarker);
                    }
                } else {
                    for (argument_index, token) in argument.into_iter().enumerate() {
                        let mut token = mark_expanded(token);
                        if argument_index == 0 {
                            token.token_with_location.leading_space = current.leading_space;
                        }
                        pieces.push(Piece::Token(token));
                    }
                }

                index += 1;
                continue;
            }

            pieces.push(Piece::Token(self.replacement_token(current, invocation.location)));
            index += 1;
        }

        pieces
    }

    // Substitutes the content of `__VA_OPT__(...)` for stringification,
    // `tokens` includes the parentheses.
    fn va_opt_content(
        &mut self,
        invocation: &mut Invocation,
        tokens: &[TokenWithLocation],
    ) -> Vec<PendingToken> {
        if invocation.variadic_argument_is_empty() || tokens.len() < 2 {
            return vec![];
        }

        let pieces = self.substitute(invocation, &tokens[1..tokens.len() - 1]);
        self.paste_pieces(pieces)
    }

    fn replacement_token(
        &self,
        token_with_location: &TokenWithLocation,
        invocation_location: Location,
    ) -> PendingToken {
        let mut token_with_location = token_with_location.clone();
        token_with_location.location = invocation_location;
        token_with_location.expanded = true;
        PendingToken::new(token_with_location)
    }

    /// Applies the `##` operators and removes the placemarkers.
    fn paste_pieces(&mut self, pieces: Vec<Piece>) -> Vec<PendingToken> {
        let mut output: Vec<Piece> = vec![];
        let mut iter = pieces.into_iter();

        while let Some(piece) = iter.next() {
            let Piece::Paste = piece else {
                output.push(piece);
                continue;
            };

            let left = output.pop();
            let right = iter.next();

            let result = match (left, right) {
                (Some(Piece::Token(left)), Some(Piece::Token(right))) => {
                    match self.paste_tokens(left, right) {
                        Ok(token) => Piece::Token(token),
                        Err((left, right)) => {
                            output.push(Piece::Token(left));
                            Piece::Token(right)
                        }
                    }
                }
                (Some(Piece::Token(left)), _) => Piece::Token(left),
                (_, Some(Piece::Token(right))) => Piece::Token(right),
                _ => Piece::Placemarker,
            };
            output.push(result);
        }

        output
            .into_iter()
            .filter_map(|piece| match piece {
                Piece::Token(token) => Some(token),
                _ => None,
            })
            .collect()
    }

    // Concatenates the spellings of two tokens and lexes the result,
    // which must be exactly one token.
    fn paste_tokens(
        &mut self,
        left: PendingToken,
        right: PendingToken,
    ) -> Result<PendingToken, (PendingToken, PendingToken)> {
        let text = format!(
            "{}{}",
            left.token_with_location.spelling, right.token_with_location.spelling
        );

        let buffer = Arc::new(SourceBuffer::new("<scratch space>", &text));
        let mut lexer = Lexer::new(buffer, left.location().file_number);
        let first = lexer.next_token();
        let second = lexer.next_token();
        let is_single_token = lexer.take_diagnostics().is_empty()
            && second.token == Token::EndOfInput
            && !matches!(
                first.token,
                Token::EndOfInput | Token::DirectiveStart | Token::Unknown(_)
            );

        if !is_single_token {
            self.diagnostics.error(
                &format!("pasting formed '{}', an invalid preprocessing token", text),
                left.location(),
            );
            return Err((left, right));
        }

        let hide_set = left
            .hide_set
            .intersection(&right.hide_set)
            .cloned()
            .collect::<HideSet>();

        let mut token_with_location = TokenWithLocation::new(first.token, left.location(), &text);
        token_with_location.leading_space = left.token_with_location.leading_space;
        token_with_location.expanded = true;

        Ok(PendingToken {
            token_with_location,
            hide_set,
        })
    }
}

fn prepend(queue: &mut VecDeque<PendingToken>, tokens: Vec<PendingToken>) {
    for token in tokens.into_iter().rev() {
        queue.push_front(token);
    }
}

fn mark_expanded(mut token: PendingToken) -> PendingToken {
    token.token_with_location.expanded = true;
    token
}

// Checks the number of arguments, an omitted variadic argument is added as empty.
fn check_argument_count(
    arguments: &mut Vec<Vec<PendingToken>>,
    parameters: &MacroParameters,
) -> Result<(), &'static str> {
    let expected = parameters.names.len();

    // `F()` passes one empty argument, which is no argument for a macro without parameters
    if expected == 0 {
        return match arguments.as_slice() {
            [argument] if argument.is_empty() => {
                arguments.clear();
                Ok(())
            }
            _ => Err("too many arguments provided to function-like macro invocation"),
        };
    }

    if arguments.len() > expected {
        return Err("too many arguments provided to function-like macro invocation");
    }

    if parameters.variadic && arguments.len() == parameters.required_count() {
        arguments.push(vec![]);
    }

    if arguments.len() < expected {
        return Err("too few arguments provided to function-like macro invocation");
    }

    Ok(())
}

fn finish_expansion(
    tokens: Vec<PendingToken>,
    name_token: &PendingToken,
    hide_set: &HideSet,
) -> Vec<PendingToken> {
    tokens
        .into_iter()
        .enumerate()
        .map(|(index, mut token)| {
            token.hide_set.extend(hide_set.iter().cloned());
            token.token_with_location.expanded = true;
            if index == 0 {
                token.token_with_location.leading_space =
                    name_token.token_with_location.leading_space;
            }
            token
        })
        .collect()
}

/// Creates the string literal of the `#` operator.
///
/// Whitespace between tokens becomes a single space, and `"` and `\`
/// inside string and character literals are escaped.
fn stringify(tokens: &[PendingToken], location: Location, leading_space: bool) -> PendingToken {
    let mut value = String::new();
    let mut spelling = String::from("\"");

    for (index, token) in tokens.iter().enumerate() {
        let token_with_location = &token.token_with_location;
        if index > 0 && token_with_location.leading_space {
            value.push(' ');
            spelling.push(' ');
        }

        value.push_str(&token_with_location.spelling);

        if matches!(token_with_location.token, Token::String(..) | Token::Char(..)) {
            for c in token_with_location.spelling.chars() {
                if c == '"' || c == '\\' {
                    spelling.push('\\');
                }
                spelling.push(c);
            }
        } else {
            spelling.push_str(&token_with_location.spelling);
        }
    }
    spelling.push('"');

    let mut token_with_location = TokenWithLocation::new(
        Token::String(value, StringEncoding::Default),
        location,
        &spelling,
    );
    token_with_location.leading_space = leading_space;
    token_with_location.expanded = true;
    PendingToken::new(token_with_location)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::{
        options::PreprocessorOptions,
        preprocessor::Preprocessor,
        source_buffer::SourceBuffer,
        token::{StringEncoding, Token, TokenWithLocation},
    };

    fn expand_tokens(src: &str) -> (Vec<TokenWithLocation>, Vec<String>) {
        expand_tokens_with_options(src, PreprocessorOptions::new())
    }

    fn expand_tokens_with_options(
        src: &str,
        options: PreprocessorOptions,
    ) -> (Vec<TokenWithLocation>, Vec<String>) {
        let mut preprocessor =
            Preprocessor::new(Arc::new(SourceBuffer::new("main.c", src)), options);
        let tokens = preprocessor
            .by_ref()
            .filter(|t| t.token != Token::EndOfInput)
            .collect::<Vec<_>>();
        let messages = preprocessor
            .diagnostics()
            .iter()
            .map(|d| d.message.clone())
            .collect();
        (tokens, messages)
    }

    fn expand(src: &str) -> String {
        let (tokens, messages) = expand_tokens(src);
        assert_eq!(messages, Vec::<String>::new());
        tokens
            .iter()
            .map(|t| t.spelling.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_function_like_macro() {
        assert_eq!(
            expand("#define ADD(a, b) ((a) + (b))\nADD(1, 2 * 3)\n"),
            "( ( 1 ) + ( 2 * 3 ) )"
        );

        // parentheses protect commas in arguments
        assert_eq!(
            expand("#define FIRST(a, b) a\nFIRST((1, 2), 3)\n"),
            "( 1 , 2 )"
        );

        // the name without '(' is not an invocation
        assert_eq!(expand("#define F(x) x\nint F;\n"), "int F ;");

        // the invocation may span lines
        assert_eq!(expand("#define F(x) [x]\nF\n(\n1\n)\n"), "[ 1 ]");

        // empty arguments
        assert_eq!(expand("#define F(a, b) <a|b>\nF(,)\n"), "< | >");
        assert_eq!(expand("#define Z() zero\nZ()\n"), "zero");
    }

    #[test]
    fn test_nested_and_recursive_expansion() {
        let src = "\
#define SQUARE(x) ((x) * (x))
#define DOUBLE(x) (2 * (x))
SQUARE(DOUBLE(3))
";
        assert_eq!(
            expand(src),
            "( ( ( 2 * ( 3 ) ) ) * ( ( 2 * ( 3 ) ) ) )"
        );

        // the argument is pre-expanded, the inner `f` is not blocked
        assert_eq!(expand("#define f(a) a*g\n#define g(a) f(a)\nf(2)(9)\n"), "2 * 9 * g");

        assert_eq!(expand("#define X X X\nX\n"), "X X");
    }

    #[test]
    fn test_stringify() {
        let (tokens, messages) = expand_tokens("#define STR(x) #x\nSTR( a  +   \"b\\n\" )\n");
        assert_eq!(messages, Vec::<String>::new());
        assert_eq!(tokens.len(), 1);
        assert_eq!(
            tokens[0].token,
            Token::String("a + \"b\\n\"".to_owned(), StringEncoding::Default)
        );
        assert_eq!(tokens[0].spelling, "\"a + \\\"b\\\\n\\\"\"");

        // the argument of `#` is not expanded
        assert_eq!(
            expand("#define STR(x) #x\n#define XSTR(x) STR(x)\n#define V 42\nSTR(V) XSTR(V)\n"),
            "\"V\" \"42\""
        );
    }

    #[test]
    fn test_paste() {
        assert_eq!(expand("#define CAT(a, b) a ## b\nCAT(foo, bar)\n"), "foobar");
        assert_eq!(expand("#define CAT(a, b) a ## b\nCAT(1, 2)\n"), "12");
        assert_eq!(expand("#define CAT(a, b) a ## b\nCAT(, x) CAT(x, )\n"), "x x");
        assert_eq!(expand("#define OP(a) a ## =\nOP(+)\n"), "+=");

        // the pasted name is rescanned
        assert_eq!(
            expand("#define CAT(a, b) a ## b\n#define ab 7\nCAT(a, b)\n"),
            "7"
        );

        let (tokens, messages) = expand_tokens("#define CAT(a, b) a ## b\nCAT(., +)\n");
        assert_eq!(
            messages,
            vec!["pasting formed '.+', an invalid preprocessing token"]
        );
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_variadic_macro() {
        let src = "\
#define LOG(format, ...) printf(format, __VA_ARGS__)
LOG(\"%d %d\", 1, 2)
";
        assert_eq!(expand(src), "printf ( \"%d %d\" , 1 , 2 )");

        let src = "\
#define LOG(format, ...) printf(format, ## __VA_ARGS__)
LOG(\"a\") LOG(\"b\", 1)
";
        assert_eq!(expand(src), "printf ( \"a\" ) printf ( \"b\" , 1 )");

        let src = "\
#define LOG(format, ...) printf(format __VA_OPT__(,) __VA_ARGS__)
LOG(\"a\") LOG(\"b\", 1)
";
        assert_eq!(expand(src), "printf ( \"a\" ) printf ( \"b\" , 1 )");

        let src = "\
#define TRACE(args...) trace(args)
TRACE(1, 2)
";
        assert_eq!(expand(src), "trace ( 1 , 2 )");
    }

    #[test]
    fn test_argument_count_errors() {
        let (tokens, messages) = expand_tokens("#define F(a, b) a\nF(1)\n");
        assert_eq!(
            messages,
            vec!["too few arguments provided to function-like macro invocation"]
        );
        assert_eq!(tokens[0].spelling, "F");

        let (_, messages) = expand_tokens("#define F(a) a\nF(1, 2)\n");
        assert_eq!(
            messages,
            vec!["too many arguments provided to function-like macro invocation"]
        );

        let (_, messages) = expand_tokens("#define F(a) a\nF(1, 2\n");
        assert_eq!(messages, vec!["unterminated function-like macro invocation"]);
    }

    #[test]
    fn test_expanded_token_locations() {
        let (tokens, _) = expand_tokens("#define ONE 1\nint x = ONE;\n");
        let one = &tokens[3];
        assert_eq!(one.spelling, "1");
        assert!(one.expanded);
        assert!(one.leading_space);

        // the location is the one of the invocation
        assert_eq!(one.location.range.start.line, 1);
        assert_eq!(one.location.range.start.column, 8);
    }

    #[test]
    fn test_argument_nesting_limit() {
        let src = format!("#define P(x) [x]\n{}1{}\n", "P(".repeat(12), ")".repeat(12));
        let (tokens, messages) =
            expand_tokens_with_options(&src, PreprocessorOptions::new().with_max_nesting_depth(8));

        assert_eq!(
            messages,
            vec!["macro argument nesting level exceeded maximum of 8"]
        );

        // the outer invocations are expanded, the innermost ones are left as they are
        let text = tokens
            .iter()
            .map(|t| t.spelling.as_str())
            .collect::<String>();
        assert!(text.starts_with(&"[".repeat(8)));
        assert!(text.ends_with(&"]".repeat(8)));
        assert!(text.contains("P(1)"));
    }
}
