// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

use crate::{
    char_with_position::{CharWithPosition, CharsWithPositionIter},
    diagnostic::Diagnostic,
    location::Location,
    peekable_iter::PeekableIter,
    position::Position,
    range::Range,
    source_buffer::SourceBuffer,
    token::{
        CharEncoding, FloatingPointNumber, FloatingPointNumberLength, IntegerNumber,
        IntegerNumberLength, Keyword, Number, Punctuator, StringEncoding, Token,
        TokenWithLocation,
    },
};

// Longer spellings come first so that the first match is the longest one.
const PUNCTUATORS: &[(&str, Punctuator)] = &[
    ("<<=", Punctuator::ShiftLeftAssign),
    (">>=", Punctuator::ShiftRightAssign),
    ("...", Punctuator::Ellipsis),
    ("->", Punctuator::Arrow),
    ("++", Punctuator::Increase),
    ("--", Punctuator::Decrease),
    ("<<", Punctuator::ShiftLeft),
    (">>", Punctuator::ShiftRight),
    ("<=", Punctuator::LessThanOrEqual),
    (">=", Punctuator::GreaterThanOrEqual),
    ("==", Punctuator::Equal),
    ("!=", Punctuator::NotEqual),
    ("&&", Punctuator::And),
    ("||", Punctuator::Or),
    ("*=", Punctuator::MultiplyAssign),
    ("/=", Punctuator::DivideAssign),
    ("%=", Punctuator::ModulusAssign),
    ("+=", Punctuator::AddAssign),
    ("-=", Punctuator::SubtractAssign),
    ("&=", Punctuator::BitwiseAndAssign),
    ("^=", Punctuator::BitwiseXorAssign),
    ("|=", Punctuator::BitwiseOrAssign),
    ("##", Punctuator::PoundPound),
    ("[", Punctuator::BracketOpen),
    ("]", Punctuator::BracketClose),
    ("(", Punctuator::ParenthesisOpen),
    (")", Punctuator::ParenthesisClose),
    ("{", Punctuator::BraceOpen),
    ("}", Punctuator::BraceClose),
    (".", Punctuator::Dot),
    ("&", Punctuator::BitwiseAnd),
    ("*", Punctuator::Multiply),
    ("+", Punctuator::Add),
    ("-", Punctuator::Subtract),
    ("~", Punctuator::BitwiseNot),
    ("!", Punctuator::Not),
    ("/", Punctuator::Divide),
    ("%", Punctuator::Modulo),
    ("<", Punctuator::LessThan),
    (">", Punctuator::GreaterThan),
    ("^", Punctuator::BitwiseXor),
    ("|", Punctuator::BitwiseOr),
    ("?", Punctuator::QuestionMark),
    (":", Punctuator::Colon),
    (";", Punctuator::Semicolon),
    ("=", Punctuator::Assign),
    (",", Punctuator::Comma),
    ("#", Punctuator::Pound),
];

/// Lexes a whole buffer, returns the tokens (ending with `EndOfInput`)
/// and the lexical diagnostics.
#[tracing::instrument(skip_all, fields(file = %source.name()))]
pub fn lex_source(source: Arc<SourceBuffer>) -> (Vec<TokenWithLocation>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source, 0);
    let tokens = lexer.by_ref().collect::<Vec<_>>();
    (tokens, lexer.take_diagnostics())
}

/// A lazy tokenizer over one `SourceBuffer`.
///
/// Tokens are produced on demand by `next_token`. Diagnostics are buffered
/// and handed over with `take_diagnostics`, so the consumer can merge them
/// into its own sink in the order they were produced.
///
/// Comments are skipped (they only set the `leading_space` flag of the next token)
/// and line continuations are joined by the character iterator.
pub struct Lexer {
    source: Arc<SourceBuffer>,
    file_number: usize,
    upstream: PeekableIter<CharsWithPositionIter>,

    // The position of the character consumed last by `next_char()`.
    last_position: Position,

    // The byte offset just past the character consumed last.
    last_end_offset: usize,

    // Stack of positions.
    // Used to store the start positions of tokens while consuming them.
    // Use `push_peek_position_into_store` and `pop_position_from_store` to manipulate this stack.
    stored_positions: Vec<Position>,

    // No token has been produced on the current line yet.
    at_line_start: bool,

    // Whitespace or a comment was skipped since the last token.
    leading_space: bool,

    // Inside a directive line, i.e. after `DirectiveStart` and before `DirectiveEnd`.
    in_directive: bool,

    // Tokens of the current directive line, used to detect header names.
    directive_tokens: Vec<Token>,

    // Suppresses non-fatal diagnostics, used for groups skipped by conditional directives.
    skipping: bool,

    finished: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    pub fn new(source: Arc<SourceBuffer>, file_number: usize) -> Self {
        let upstream = PeekableIter::new(CharsWithPositionIter::new(Arc::clone(&source)));

        Self {
            source,
            file_number,
            upstream,
            last_position: Position::default(),
            last_end_offset: 0,
            stored_positions: vec![],
            at_line_start: true,
            leading_space: false,
            in_directive: false,
            directive_tokens: vec![],
            skipping: false,
            finished: false,
            diagnostics: vec![],
        }
    }

    /// Restarts lexing from the beginning of the buffer.
    pub fn reset(&mut self) {
        *self = Lexer::new(Arc::clone(&self.source), self.file_number);
    }

    pub fn source(&self) -> &Arc<SourceBuffer> {
        &self.source
    }

    pub fn file_number(&self) -> usize {
        self.file_number
    }

    pub fn set_skipping(&mut self, skipping: bool) {
        self.skipping = skipping;
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn next_char(&mut self) -> Option<char> {
        match self.upstream.next() {
            Some(CharWithPosition {
                character,
                position,
            }) => {
                self.last_position = position;
                self.last_end_offset = position.offset + character.len_utf8();
                Some(character)
            }
            None => None,
        }
    }

    fn peek_char(&mut self, offset: usize) -> Option<char> {
        self.upstream.peek(offset).map(|c| c.character)
    }

    fn peek_position(&mut self, offset: usize) -> Option<Position> {
        self.upstream.peek(offset).map(|c| c.position)
    }

    fn peek_char_and_equals(&mut self, offset: usize, expected_char: char) -> bool {
        self.peek_char(offset) == Some(expected_char)
    }

    /// Saves the current position (i.e., the `self.peek_position(0)`) to the stack.
    fn push_peek_position_into_store(&mut self) {
        let position = match self.peek_position(0) {
            Some(position) => position,
            None => self.end_position(),
        };
        self.stored_positions.push(position);
    }

    fn pop_position_from_store(&mut self) -> Position {
        self.stored_positions.pop().unwrap_or(self.last_position)
    }

    fn stored_position(&self) -> Position {
        self.stored_positions
            .last()
            .copied()
            .unwrap_or(self.last_position)
    }

    fn end_position(&self) -> Position {
        self.source.position_at(self.source.text().len())
    }

    fn report_error(&mut self, message: &str, position: Position) {
        let location = Location::from_position(self.file_number, &position);
        self.diagnostics.push(Diagnostic::error(message, location));
    }

    fn report_warning(&mut self, message: &str, code: &str, position: Position) {
        if self.skipping {
            return;
        }

        let location = Location::from_position(self.file_number, &position);
        self.diagnostics
            .push(Diagnostic::warning(message, location).with_code(code));
    }

    // Errors in skipped groups are not reported, except the fatal ones.
    fn report_recoverable_error(&mut self, message: &str, position: Position) {
        if !self.skipping {
            self.report_error(message, position);
        }
    }

    /// Builds the token that started at the stored position and ends at the last consumed char.
    fn finish_token(&mut self, token: Token) -> TokenWithLocation {
        let start = self.pop_position_from_store();
        let range = Range::new(&start, &self.last_position);
        let spelling = self.spelling_between(start.offset, self.last_end_offset);

        TokenWithLocation::new(token, Location::new(self.file_number, &range), &spelling)
            .with_leading_space(std::mem::take(&mut self.leading_space))
    }

    fn spelling_between(&self, start: usize, end: usize) -> String {
        let raw = self.source.text().get(start..end).unwrap_or_default();
        if raw.contains('\\') {
            remove_line_continuations(raw)
        } else {
            raw.to_owned()
        }
    }

    fn single_position_token(&mut self, token: Token, position: Position) -> TokenWithLocation {
        TokenWithLocation::new(token, Location::from_position(self.file_number, &position), "")
            .with_leading_space(std::mem::take(&mut self.leading_space))
    }
}

impl Iterator for Lexer {
    type Item = TokenWithLocation;

    /// Yields tokens up to and including `EndOfInput`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        Some(self.next_token())
    }
}

impl Lexer {
    /// Returns the next token, `EndOfInput` is returned at the end and on every call after it.
    pub fn next_token(&mut self) -> TokenWithLocation {
        loop {
            let Some(current_char) = self.peek_char(0) else {
                let end_position = self.end_position();

                if self.in_directive {
                    // the last directive line has no line break
                    self.in_directive = false;
                    self.directive_tokens.clear();
                    return self.single_position_token(Token::DirectiveEnd, end_position);
                }

                self.finished = true;
                return self.single_position_token(Token::EndOfInput, end_position);
            };

            match current_char {
                ' ' | '\t' | '\u{0b}' | '\u{0c}' | '\r' => {
                    // Skip whitespace (space, tab, vertical tab, form feed, carriage return).
                    self.next_char();
                    self.leading_space = true;
                }
                '\n' => {
                    self.next_char(); // consume '\n'

                    let newline_position = self.last_position;
                    self.at_line_start = true;

                    if self.in_directive {
                        self.in_directive = false;
                        self.directive_tokens.clear();

                        let token_with_location =
                            self.single_position_token(Token::DirectiveEnd, newline_position);

                        // a line break separates tokens like whitespace does
                        self.leading_space = true;
                        return token_with_location;
                    }

                    self.leading_space = true;
                }
                '/' if self.peek_char_and_equals(1, '/') => {
                    self.skip_line_comment();
                    self.leading_space = true;
                }
                '/' if self.peek_char_and_equals(1, '*') => {
                    self.skip_block_comment();
                    self.leading_space = true;
                }
                _ => {
                    let at_line_start = std::mem::replace(&mut self.at_line_start, false);
                    let token_with_location = self.lex_token(current_char, at_line_start);

                    if self.in_directive && token_with_location.token != Token::DirectiveStart {
                        self.directive_tokens.push(token_with_location.token.clone());
                    }

                    return token_with_location;
                }
            }
        }
    }

    fn skip_line_comment(&mut self) {
        // Consume all characters until the end of the line, the line break is kept.
        while let Some(current_char) = self.peek_char(0) {
            if current_char == '\n' {
                break;
            }
            self.next_char();
        }
    }

    fn skip_block_comment(&mut self) {
        self.push_peek_position_into_store();

        self.next_char(); // consume '/'
        self.next_char(); // consume '*'

        let mut found_closing = false;
        while let Some(current_char) = self.next_char() {
            if current_char == '*' && self.peek_char_and_equals(0, '/') {
                self.next_char(); // consume '/'
                found_closing = true;
                break;
            }
        }

        let start = self.pop_position_from_store();

        if !found_closing {
            // fatal, the rest of the file has been consumed
            self.report_error("unterminated /* comment", start);
        }
    }

    fn lex_token(&mut self, current_char: char, at_line_start: bool) -> TokenWithLocation {
        match current_char {
            '#' if at_line_start && !self.peek_char_and_equals(1, '#') => {
                // `#` at the beginning of a line
                self.push_peek_position_into_store();
                self.next_char(); // consume '#'

                self.in_directive = true;
                self.directive_tokens.clear();

                self.finish_token(Token::DirectiveStart)
            }
            '<' if self.in_directive && self.expects_header_name() => {
                match self.lex_header_name('>', true) {
                    Some(token_with_location) => token_with_location,
                    None => self.lex_punctuator(),
                }
            }
            '"' if self.in_directive && self.expects_header_name() => {
                match self.lex_header_name('"', false) {
                    Some(token_with_location) => token_with_location,
                    None => self.lex_string(StringEncoding::Default, 0),
                }
            }
            '\'' => self.lex_char(CharEncoding::Default, 0),
            '"' => self.lex_string(StringEncoding::Default, 0),
            '0'..='9' => self.lex_number(),
            '.' if matches!(self.peek_char(1), Some('0'..='9')) => {
                // a number with a leading dot, e.g., `.5`
                self.lex_number()
            }
            'L' | 'u' | 'U' if matches!(self.peek_char(1), Some('\'' | '"')) => {
                let is_char = self.peek_char_and_equals(1, '\'');

                if is_char {
                    let encoding = match current_char {
                        'L' => CharEncoding::Wide,
                        'u' => CharEncoding::UTF16,
                        _ => CharEncoding::UTF32,
                    };
                    self.lex_char(encoding, 1)
                } else {
                    let encoding = match current_char {
                        'L' => StringEncoding::Wide,
                        'u' => StringEncoding::UTF16,
                        _ => StringEncoding::UTF32,
                    };
                    self.lex_string(encoding, 1)
                }
            }
            'u' if self.peek_char_and_equals(1, '8')
                && matches!(self.peek_char(2), Some('\'' | '"')) =>
            {
                if self.peek_char_and_equals(2, '\'') {
                    self.lex_char(CharEncoding::UTF8, 2)
                } else {
                    self.lex_string(StringEncoding::UTF8, 2)
                }
            }
            c if is_identifier_start(c) => self.lex_identifier(),
            _ if PUNCTUATORS
                .iter()
                .any(|(spelling, _)| spelling.starts_with(current_char)) =>
            {
                self.lex_punctuator()
            }
            _ => {
                self.push_peek_position_into_store();
                self.next_char();

                let start = self.stored_position();
                self.report_recoverable_error(
                    &format!("unexpected character '{}'", current_char),
                    start,
                );

                self.finish_token(Token::Unknown(current_char))
            }
        }
    }

    fn lex_punctuator(&mut self) -> TokenWithLocation {
        self.push_peek_position_into_store();

        let mut matched = None;
        for (spelling, punctuator) in PUNCTUATORS {
            if spelling
                .chars()
                .enumerate()
                .all(|(offset, c)| self.peek_char_and_equals(offset, c))
            {
                matched = Some((spelling.chars().count(), *punctuator));
                break;
            }
        }

        // the caller checked that at least the single-character form matches
        let (length, punctuator) = matched.unwrap_or((1, Punctuator::Pound));
        for _ in 0..length {
            self.next_char();
        }

        self.finish_token(Token::Punctuator(punctuator))
    }

    fn lex_identifier(&mut self) -> TokenWithLocation {
        // ```diagram
        // key_nameT  //
        // ^       ^__// to here
        // |__________// current char, validated
        //
        // T = terminator chars || EOF
        // ```

        self.push_peek_position_into_store();

        let mut id_string = String::new();
        while let Some(current_char) = self.peek_char(0) {
            if is_identifier_continue(current_char) {
                id_string.push(current_char);
                self.next_char();
            } else {
                break;
            }
        }

        // unicode normalization
        let id_string_normalized: String = id_string.nfc().collect();

        let token = match Keyword::from_name(&id_string_normalized) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(id_string_normalized),
        };

        self.finish_token(token)
    }

    fn lex_number(&mut self) -> TokenWithLocation {
        // A preprocessing number: a digit (optionally preceded by '.'), followed by
        // letters, digits, underscores, periods, exponent signs (`e+`, `p-`, etc.)
        // and digit separators.
        //
        // e.g. `123`, `0x1Fu`, `1.5e-3f`, `0x1.8p+1`, `1'000'000`

        self.push_peek_position_into_store();

        let mut num_string = String::new();
        while let Some(current_char) = self.peek_char(0) {
            match current_char {
                'e' | 'E' | 'p' | 'P' if matches!(self.peek_char(1), Some('+' | '-')) => {
                    num_string.push(current_char);
                    self.next_char();
                    if let Some(sign) = self.next_char() {
                        num_string.push(sign);
                    }
                }
                '\'' if matches!(self.peek_char(1), Some(c) if c.is_ascii_alphanumeric()) => {
                    // digit separator
                    self.next_char();
                }
                c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
                    num_string.push(c);
                    self.next_char();
                }
                _ => break,
            }
        }

        let start = self.stored_position();
        let number = match parse_number(&num_string) {
            Ok(number) => number,
            Err(message) => {
                self.report_recoverable_error(&message, start);
                Number::Integer(IntegerNumber::new(
                    num_string,
                    false,
                    IntegerNumberLength::Default,
                ))
            }
        };

        self.finish_token(Token::Number(number))
    }

    fn lex_char(&mut self, encoding: CharEncoding, prefix_length: usize) -> TokenWithLocation {
        // ```diagram
        // 'a'?  //
        // ^  ^__// to here
        // |_____// current char, validated
        // ```

        self.push_peek_position_into_store();

        // consume the prefix characters, e.g. 'L', 'u', 'U', "u8"
        for _ in 0..prefix_length {
            self.next_char();
        }

        self.next_char(); // consume "'"

        let start = self.stored_position();
        let mut chars = vec![];
        let mut terminated = false;

        loop {
            match self.peek_char(0) {
                None | Some('\n') => {
                    self.report_recoverable_error("unterminated character constant", start);
                    break;
                }
                Some('\'') => {
                    self.next_char();
                    terminated = true;
                    break;
                }
                Some('\\') => {
                    self.next_char(); // consume '\'
                    chars.push(self.lex_escape_sequence());
                }
                Some(current_char) => {
                    chars.push(current_char);
                    self.next_char();
                }
            }
        }

        let character = match chars.as_slice() {
            [] => {
                if terminated {
                    self.report_recoverable_error("empty character constant", start);
                }
                '\0'
            }
            [c] => *c,
            [c, ..] => {
                self.report_warning("multi-character character constant", "-Wmultichar", start);
                *c
            }
        };

        self.finish_token(Token::Char(character, encoding))
    }

    fn lex_string(&mut self, encoding: StringEncoding, prefix_length: usize) -> TokenWithLocation {
        // ```diagram
        // "abc"?  //
        // ^    ^__// to here
        // |_______// current char, validated
        // ```

        self.push_peek_position_into_store();

        for _ in 0..prefix_length {
            self.next_char();
        }

        self.next_char(); // consume '"'

        let start = self.stored_position();
        let mut final_string = String::new();

        loop {
            match self.peek_char(0) {
                None | Some('\n') => {
                    // recover at the end of the line
                    self.report_recoverable_error("unterminated string literal", start);
                    break;
                }
                Some('"') => {
                    self.next_char();
                    break;
                }
                Some('\\') => {
                    self.next_char(); // consume '\'
                    final_string.push(self.lex_escape_sequence());
                }
                Some(current_char) => {
                    final_string.push(current_char);
                    self.next_char();
                }
            }
        }

        self.finish_token(Token::String(final_string, encoding))
    }

    // Lexes the escape sequence after a consumed backslash.
    //
    // See: https://en.wikipedia.org/wiki/Escape_sequences_in_C#Escape_sequences
    fn lex_escape_sequence(&mut self) -> char {
        let backslash_position = self.last_position;

        let Some(current_char) = self.peek_char(0) else {
            return '\\';
        };

        if current_char == '\n' {
            // let the caller report the unterminated literal
            return '\\';
        }

        self.next_char();

        match current_char {
            '\'' | '"' | '?' | '\\' => current_char,
            'a' => '\x07', // bell
            'b' => '\x08', // backspace
            'f' => '\x0c', // form feed
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\x0b', // vertical tabulation
            '0'..='7' => {
                // octal, up to 3 digits
                let mut value = current_char as u32 - '0' as u32;
                for _ in 0..2 {
                    match self.peek_char(0) {
                        Some(digit @ '0'..='7') => {
                            value = value * 8 + (digit as u32 - '0' as u32);
                            self.next_char();
                        }
                        _ => break,
                    }
                }
                self.char_from_code(value, backslash_position)
            }
            'x' => {
                let mut value: u32 = 0;
                let mut digit_count = 0;
                while let Some(digit) = self.peek_char(0).and_then(|c| c.to_digit(16)) {
                    value = value.saturating_mul(16).saturating_add(digit);
                    digit_count += 1;
                    self.next_char();
                }

                if digit_count == 0 {
                    self.report_recoverable_error(
                        "\\x used with no following hex digits",
                        backslash_position,
                    );
                    'x'
                } else {
                    self.char_from_code(value, backslash_position)
                }
            }
            'u' | 'U' => {
                // universal character name, exactly 4 or 8 hex digits
                let expected_count = if current_char == 'u' { 4 } else { 8 };
                let mut value: u32 = 0;
                for _ in 0..expected_count {
                    match self.peek_char(0).and_then(|c| c.to_digit(16)) {
                        Some(digit) => {
                            value = value * 16 + digit;
                            self.next_char();
                        }
                        None => {
                            self.report_recoverable_error(
                                "incomplete universal character name",
                                backslash_position,
                            );
                            return '\u{fffd}';
                        }
                    }
                }
                self.char_from_code(value, backslash_position)
            }
            _ => {
                self.report_warning(
                    &format!("unknown escape sequence '\\{}'", current_char),
                    "-Wunknown-escape-sequence",
                    backslash_position,
                );
                current_char
            }
        }
    }

    fn char_from_code(&mut self, value: u32, position: Position) -> char {
        match char::from_u32(value) {
            Some(c) => c,
            None => {
                self.report_recoverable_error("escape sequence out of range", position);
                '\u{fffd}'
            }
        }
    }

    fn expects_header_name(&self) -> bool {
        match self.directive_tokens.as_slice() {
            [Token::Identifier(name)] => name == "include" || name == "include_next",
            [
                ..,
                Token::Identifier(name),
                Token::Punctuator(Punctuator::ParenthesisOpen),
            ] => name == "__has_include" || name == "__has_include_next",
            _ => false,
        }
    }

    /// Lexes `<path>` or `"path"`, returns `None` (consuming nothing) when
    /// the closing character is not on the same line.
    fn lex_header_name(&mut self, closing: char, angle_bracket: bool) -> Option<TokenWithLocation> {
        let mut length = 1;
        loop {
            match self.peek_char(length) {
                Some(c) if c == closing => break,
                None | Some('\n') => return None,
                Some(_) => length += 1,
            }
        }

        self.push_peek_position_into_store();
        self.next_char(); // consume '<' or '"'

        let mut path = String::new();
        for _ in 1..length {
            if let Some(c) = self.next_char() {
                path.push(c);
            }
        }

        self.next_char(); // consume '>' or '"'

        Some(self.finish_token(Token::HeaderName(path, angle_bracket)))
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || (!c.is_ascii() && c.is_alphabetic())
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || (!c.is_ascii() && c.is_alphanumeric())
}

fn remove_line_continuations(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(index) = rest.find('\\') {
        output.push_str(&rest[..index]);
        let tail = &rest[index..];

        match CharsWithPositionIter::line_continuation_length(tail) {
            Some(length) => rest = &tail[length..],
            None => {
                output.push('\\');
                rest = &tail[1..];
            }
        }
    }

    output.push_str(rest);
    output
}

/// Converts the text of a preprocessing number into a `Number`.
///
/// Digit separators must already be removed.
pub fn parse_number(text: &str) -> Result<Number, String> {
    let prefix = text.get(..2).map(|p| p.to_ascii_lowercase());
    match prefix.as_deref() {
        Some("0x") => parse_hexadecimal_number(&text[2..]),
        Some("0b") => parse_binary_number(&text[2..]),
        _ => parse_decimal_number(text),
    }
}

fn parse_hexadecimal_number(body: &str) -> Result<Number, String> {
    // Examples:
    // - 0x1a2b
    // - 0xBEEFul
    // - 0x0.123p45
    // - 0x.8p-1f

    let mantissa_end = body
        .find(|c: char| !(c.is_ascii_hexdigit() || c == '.'))
        .unwrap_or(body.len());
    let (mantissa, rest) = body.split_at(mantissa_end);

    if mantissa.contains('.') || rest.starts_with(['p', 'P']) {
        let Some(exponent_and_suffix) = rest.strip_prefix(['p', 'P']) else {
            return Err("hexadecimal floating constant requires an exponent".to_owned());
        };

        let (exponent, suffix) = split_exponent(exponent_and_suffix)?;
        let length = floating_point_suffix(suffix)?;

        let mantissa = if mantissa.starts_with('.') {
            format!("0{}", mantissa)
        } else {
            mantissa.to_owned()
        };

        Ok(Number::FloatingPoint(FloatingPointNumber::new(
            format!("0x{}p{}", mantissa, exponent),
            length,
        )))
    } else {
        if mantissa.is_empty() {
            return Err(format!("invalid suffix 'x{}' on integer constant", rest));
        }

        let (unsigned, length) = integer_suffix(rest)?;
        Ok(Number::Integer(IntegerNumber::new(
            format!("0x{}", mantissa),
            unsigned,
            length,
        )))
    }
}

fn parse_binary_number(body: &str) -> Result<Number, String> {
    let digits_end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (digits, rest) = body.split_at(digits_end);

    if let Some(invalid) = digits.chars().find(|c| *c != '0' && *c != '1') {
        return Err(format!("invalid digit '{}' in binary constant", invalid));
    }

    if digits.is_empty() {
        return Err(format!("invalid suffix 'b{}' on integer constant", rest));
    }

    let (unsigned, length) = integer_suffix(rest)?;
    Ok(Number::Integer(IntegerNumber::new(
        format!("0b{}", digits),
        unsigned,
        length,
    )))
}

fn parse_decimal_number(text: &str) -> Result<Number, String> {
    let mantissa_end = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (mantissa, rest) = text.split_at(mantissa_end);

    if mantissa.contains('.') || rest.starts_with(['e', 'E']) {
        if mantissa.matches('.').count() > 1 {
            return Err("too many decimal points in number".to_owned());
        }

        let (exponent, suffix) = match rest.strip_prefix(['e', 'E']) {
            Some(exponent_and_suffix) => {
                let (exponent, suffix) = split_exponent(exponent_and_suffix)?;
                (format!("e{}", exponent), suffix)
            }
            None => (String::new(), rest),
        };

        let length = floating_point_suffix(suffix)?;
        Ok(Number::FloatingPoint(FloatingPointNumber::new(
            format!("{}{}", mantissa, exponent),
            length,
        )))
    } else {
        if mantissa.len() > 1 && mantissa.starts_with('0') {
            if let Some(invalid) = mantissa.chars().find(|c| *c == '8' || *c == '9') {
                return Err(format!("invalid digit '{}' in octal constant", invalid));
            }
        }

        let (unsigned, length) = integer_suffix(rest)?;
        Ok(Number::Integer(IntegerNumber::new(
            mantissa.to_owned(),
            unsigned,
            length,
        )))
    }
}

// Splits `+12f` into (`+12`, `f`).
fn split_exponent(text: &str) -> Result<(&str, &str), String> {
    let sign_length = if text.starts_with(['+', '-']) { 1 } else { 0 };
    let digits_end = text[sign_length..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|index| index + sign_length)
        .unwrap_or(text.len());

    if digits_end == sign_length {
        return Err("exponent has no digits".to_owned());
    }

    Ok(text.split_at(digits_end))
}

fn integer_suffix(suffix: &str) -> Result<(/* unsigned */ bool, IntegerNumberLength), String> {
    // integer number suffixes consist of the two groups:
    // - group 1: `u`, `U`
    // - group 2: `l`, `L`, `ll`, `LL`, `wb`, `WB`
    // Both groups are optional, and can be combined in either order.
    let result = match suffix.to_ascii_lowercase().as_str() {
        "" => (false, IntegerNumberLength::Default),
        "u" => (true, IntegerNumberLength::Default),
        "l" => (false, IntegerNumberLength::Long),
        "ul" | "lu" => (true, IntegerNumberLength::Long),
        "ll" => (false, IntegerNumberLength::LongLong),
        "ull" | "llu" => (true, IntegerNumberLength::LongLong),
        "wb" => (false, IntegerNumberLength::BitInt),
        "uwb" | "wbu" => (true, IntegerNumberLength::BitInt),
        _ => {
            return Err(format!("invalid suffix '{}' on integer constant", suffix));
        }
    };

    Ok(result)
}

fn floating_point_suffix(suffix: &str) -> Result<FloatingPointNumberLength, String> {
    match suffix {
        "" => Ok(FloatingPointNumberLength::Default),
        "f" | "F" => Ok(FloatingPointNumberLength::Float),
        "l" | "L" => Ok(FloatingPointNumberLength::LongDouble),
        _ => Err(format!(
            "invalid suffix '{}' on floating constant",
            suffix
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::{
        diagnostic::{Diagnostic, Severity},
        source_buffer::SourceBuffer,
        token::{
            CharEncoding, FloatingPointNumber, FloatingPointNumberLength, IntegerNumber,
            IntegerNumberLength, Keyword, Number, Punctuator, StringEncoding, Token,
            TokenWithLocation,
        },
    };

    use super::{Lexer, lex_source, parse_number};

    fn lex(text: &str) -> (Vec<TokenWithLocation>, Vec<Diagnostic>) {
        lex_source(Arc::new(SourceBuffer::new("t.c", text)))
    }

    fn lex_tokens(text: &str) -> Vec<Token> {
        let (tokens, diagnostics) = lex(text);
        assert_eq!(diagnostics, vec![]);
        tokens.into_iter().map(|t| t.token).collect()
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    fn id(name: &str) -> Token {
        Token::Identifier(name.to_owned())
    }

    fn int(value: &str) -> Token {
        Token::Number(Number::Integer(IntegerNumber::new(
            value.to_owned(),
            false,
            IntegerNumberLength::Default,
        )))
    }

    fn punct(punctuator: Punctuator) -> Token {
        Token::Punctuator(punctuator)
    }

    #[test]
    fn test_lex_greedy_punctuators() {
        assert_eq!(
            lex_tokens("a>>=b->c<<d...##e"),
            vec![
                id("a"),
                punct(Punctuator::ShiftRightAssign),
                id("b"),
                punct(Punctuator::Arrow),
                id("c"),
                punct(Punctuator::ShiftLeft),
                id("d"),
                punct(Punctuator::Ellipsis),
                punct(Punctuator::PoundPound),
                id("e"),
                Token::EndOfInput,
            ]
        );

        assert_eq!(
            lex_tokens("x+++y..z"),
            vec![
                id("x"),
                punct(Punctuator::Increase),
                punct(Punctuator::Add),
                id("y"),
                punct(Punctuator::Dot),
                punct(Punctuator::Dot),
                id("z"),
                Token::EndOfInput,
            ]
        );

        // nested subscripts are two brackets, not an attribute
        assert_eq!(
            lex_tokens("a[b[0]]"),
            vec![
                id("a"),
                punct(Punctuator::BracketOpen),
                id("b"),
                punct(Punctuator::BracketOpen),
                int("0"),
                punct(Punctuator::BracketClose),
                punct(Punctuator::BracketClose),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_lex_keywords_and_identifiers() {
        assert_eq!(
            lex_tokens("int main_1 _Bool 变量"),
            vec![
                Token::Keyword(Keyword::Int),
                id("main_1"),
                Token::Keyword(Keyword::UnderscoreBool),
                id("变量"),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_lex_numbers() {
        assert_eq!(
            parse_number("0x1Ful"),
            Ok(Number::Integer(IntegerNumber::new(
                "0x1F".to_owned(),
                true,
                IntegerNumberLength::Long
            )))
        );
        assert_eq!(
            parse_number("017LL"),
            Ok(Number::Integer(IntegerNumber::new(
                "017".to_owned(),
                false,
                IntegerNumberLength::LongLong
            )))
        );
        assert_eq!(
            parse_number("1.5e-3f"),
            Ok(Number::FloatingPoint(FloatingPointNumber::new(
                "1.5e-3".to_owned(),
                FloatingPointNumberLength::Float
            )))
        );
        assert_eq!(
            parse_number("0X.8P+1"),
            Ok(Number::FloatingPoint(FloatingPointNumber::new(
                "0x0.8p+1".to_owned(),
                FloatingPointNumberLength::Default
            )))
        );
        assert_eq!(
            parse_number("09"),
            Err("invalid digit '9' in octal constant".to_owned())
        );
        assert_eq!(
            parse_number("12abc"),
            Err("invalid suffix 'abc' on integer constant".to_owned())
        );
        assert_eq!(
            parse_number("0x1.2"),
            Err("hexadecimal floating constant requires an exponent".to_owned())
        );

        assert_eq!(
            lex_tokens("1'000 .5 3.f"),
            vec![
                int("1000"),
                Token::Number(Number::FloatingPoint(FloatingPointNumber::new(
                    ".5".to_owned(),
                    FloatingPointNumberLength::Default
                ))),
                Token::Number(Number::FloatingPoint(FloatingPointNumber::new(
                    "3.".to_owned(),
                    FloatingPointNumberLength::Float
                ))),
                Token::EndOfInput,
            ]
        );

        let (tokens, diagnostics) = lex("int x = 0x;");
        assert_eq!(tokens.len(), 6);
        assert_eq!(
            messages(&diagnostics),
            vec!["invalid suffix 'x' on integer constant"]
        );
    }

    #[test]
    fn test_lex_string_and_char_literals() {
        assert_eq!(
            lex_tokens(r#""a\tb\x41\101文" L"w" u8"s" 'c' '\n' U'文'"#),
            vec![
                Token::String("a\tbAA文".to_owned(), StringEncoding::Default),
                Token::String("w".to_owned(), StringEncoding::Wide),
                Token::String("s".to_owned(), StringEncoding::UTF8),
                Token::Char('c', CharEncoding::Default),
                Token::Char('\n', CharEncoding::Default),
                Token::Char('文', CharEncoding::UTF32),
                Token::EndOfInput,
            ]
        );

        let (tokens, _) = lex(r#"printf("hi\n", x);"#);
        assert_eq!(tokens[2].spelling, r#""hi\n""#);
    }

    #[test]
    fn test_lex_unterminated_string_recovers_at_end_of_line() {
        let (tokens, diagnostics) = lex("char *s = \"abc;\nint x;");

        assert_eq!(messages(&diagnostics), vec!["unterminated string literal"]);
        assert_eq!(diagnostics[0].location.range.start.column, 10);

        let tokens = tokens.into_iter().map(|t| t.token).collect::<Vec<_>>();
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Char),
                punct(Punctuator::Multiply),
                id("s"),
                punct(Punctuator::Assign),
                Token::String("abc;".to_owned(), StringEncoding::Default),
                Token::Keyword(Keyword::Int),
                id("x"),
                punct(Punctuator::Semicolon),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_lex_unterminated_block_comment_is_fatal() {
        let (tokens, diagnostics) = lex("int a; /* comment\nint b;");

        assert_eq!(messages(&diagnostics), vec!["unterminated /* comment"]);
        assert_eq!(diagnostics[0].severity, Severity::Error);

        let tokens = tokens.into_iter().map(|t| t.token).collect::<Vec<_>>();
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Int),
                id("a"),
                punct(Punctuator::Semicolon),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_lex_unknown_character() {
        let (tokens, diagnostics) = lex("a @ 🔥 b");

        assert_eq!(
            messages(&diagnostics),
            vec!["unexpected character '@'", "unexpected character '🔥'"]
        );

        let tokens = tokens.into_iter().map(|t| t.token).collect::<Vec<_>>();
        assert_eq!(
            tokens,
            vec![
                id("a"),
                Token::Unknown('@'),
                Token::Unknown('🔥'),
                id("b"),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_lex_directives() {
        assert_eq!(
            lex_tokens("  # define A 1\nA # B\n#include <stdio.h>\n#include \"a\\b.h\""),
            vec![
                Token::DirectiveStart,
                id("define"),
                id("A"),
                int("1"),
                Token::DirectiveEnd,
                id("A"),
                punct(Punctuator::Pound),
                id("B"),
                Token::DirectiveStart,
                id("include"),
                Token::HeaderName("stdio.h".to_owned(), true),
                Token::DirectiveEnd,
                Token::DirectiveStart,
                id("include"),
                Token::HeaderName("a\\b.h".to_owned(), false),
                Token::DirectiveEnd,
                Token::EndOfInput,
            ]
        );

        // a directive continued on the next line
        assert_eq!(
            lex_tokens("#define A \\\n 1 /* a\n b */ + 2\nA"),
            vec![
                Token::DirectiveStart,
                id("define"),
                id("A"),
                int("1"),
                punct(Punctuator::Add),
                int("2"),
                Token::DirectiveEnd,
                id("A"),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn test_lex_locations_and_spacing() {
        let (tokens, _) = lex("int  x;\n  y");

        let summary = tokens
            .iter()
            .map(|t| {
                (
                    t.spelling.clone(),
                    t.location.range.start.line,
                    t.location.range.start.column,
                    t.location.range.end_included.column,
                    t.leading_space,
                )
            })
            .collect::<Vec<_>>();

        assert_eq!(
            summary,
            vec![
                ("int".to_owned(), 0, 0, 2, false),
                ("x".to_owned(), 0, 5, 5, true),
                (";".to_owned(), 0, 6, 6, false),
                ("y".to_owned(), 1, 2, 2, true),
                ("".to_owned(), 1, 3, 3, false),
            ]
        );
    }

    #[test]
    fn test_lexer_is_restartable() {
        let mut lexer = Lexer::new(Arc::new(SourceBuffer::new("t.c", "a b")), 0);

        assert_eq!(lexer.next_token().token, id("a"));
        assert_eq!(lexer.next_token().token, id("b"));
        assert_eq!(lexer.next_token().token, Token::EndOfInput);
        assert_eq!(lexer.next_token().token, Token::EndOfInput);
        assert_eq!(lexer.next(), None);

        lexer.reset();
        assert_eq!(lexer.next_token().token, id("a"));
    }
}
