// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::sync::Arc;

use crate::{
    char_with_position::CharsWithPositionIter,
    diagnostic::DiagnosticSink,
    options::PreprocessorOptions,
    preprocessor::Preprocessor,
    source_buffer::{SourceBuffer, SourceMap},
    token::{Token, TokenWithLocation},
};

/// The preprocessed text of a run together with its diagnostics.
#[derive(Debug)]
pub struct PreprocessOutput {
    pub text: String,
    pub diagnostics: DiagnosticSink,
    pub source_map: SourceMap,
}

/// Preprocesses the source and renders the resulting tokens as C text,
/// e.g. the output of `cc -E -P`.
#[tracing::instrument(skip_all, fields(file = %source.name()))]
pub fn preprocess_to_text(source: Arc<SourceBuffer>, options: PreprocessorOptions) -> PreprocessOutput {
    let mut preprocessor = Preprocessor::new(source, options);
    let text = render_tokens(preprocessor.by_ref());
    let (source_map, diagnostics) = preprocessor.into_parts();

    tracing::debug!(
        errors = diagnostics.error_count(),
        warnings = diagnostics.warning_count(),
        "preprocess finished"
    );

    PreprocessOutput {
        text,
        diagnostics,
        source_map,
    }
}

/// Renders tokens as text.
///
/// Line breaks between tokens follow the source lines, and the first token
/// of a line is indented to its source column. Tokens on the same line are
/// separated by one space where the source had whitespace, or where joining
/// them would form a different token.
pub fn render_tokens(tokens: impl Iterator<Item = TokenWithLocation>) -> String {
    let mut text = String::new();
    let mut previous: Option<TokenWithLocation> = None;

    for token_with_location in tokens {
        if token_with_location.token == Token::EndOfInput {
            break;
        }

        let file_number = token_with_location.location.file_number;
        let start = token_with_location.location.start();

        let line_breaks = match &previous {
            // keep the line numbers of the main file
            None if file_number == 0 => start.line,
            None => 0,
            Some(previous) if previous.location.file_number != file_number => 1,
            Some(previous) => start.line.saturating_sub(previous.location.start().line),
        };

        if line_breaks > 0 || previous.is_none() {
            text.push_str(&"\n".repeat(line_breaks));
            text.push_str(&" ".repeat(start.column));
        } else if let Some(previous) = &previous {
            if token_with_location.leading_space
                || needs_separator(&previous.spelling, &token_with_location.spelling)
            {
                text.push(' ');
            }
        }

        text.push_str(&token_with_location.spelling);
        previous = Some(token_with_location);
    }

    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

// Whether two adjacent spellings would be lexed as a different token sequence without a space.
fn needs_separator(previous: &str, next: &str) -> bool {
    const OPERATOR_CHARS: &str = "+-*/%<>=!&|^#.:";

    let (Some(last), Some(first)) = (previous.chars().last(), next.chars().next()) else {
        return false;
    };

    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';

    (is_word_char(last) && is_word_char(first))
        || (last.is_ascii_digit() && first == '.')
        || (last == '.' && first.is_ascii_digit())
        || (OPERATOR_CHARS.contains(last) && OPERATOR_CHARS.contains(first))
}

/// Replaces each comment with one space, keeping the line breaks of block comments
/// so that the line numbers do not change. String and character literals are
/// left untouched. The result always ends with a line break.
pub fn strip_comments(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut index = 0;

    while let Some(current) = text[index..].chars().next() {
        let rest = &text[index..];

        if current == '"' || current == '\'' {
            let end = literal_end(text, index);
            output.push_str(&text[index..end]);
            index = end;
        } else if rest.starts_with("//") {
            output.push(' ');
            index += 2;

            // a line comment continues after a line continuation
            while let Some(c) = text[index..].chars().next() {
                if c == '\n' {
                    break;
                }

                if c == '\\' {
                    if let Some(length) =
                        CharsWithPositionIter::line_continuation_length(&text[index..])
                    {
                        output.push('\n');
                        index += length;
                        continue;
                    }
                }
                index += c.len_utf8();
            }
        } else if rest.starts_with("/*") {
            output.push(' ');

            let body = &rest[2..];
            let (comment, length) = match body.find("*/") {
                Some(position) => (&body[..position], position + 4),
                None => (body, rest.len()),
            };

            output.extend(comment.chars().filter(|c| *c == '\n'));
            index += length;
        } else {
            output.push(current);
            index += current.len_utf8();
        }
    }

    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}

// Returns the offset after the closing quote, or the end of the line
// for an unterminated literal.
fn literal_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let quote = bytes[start];
    let mut index = start + 1;

    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 2,
            b'\n' => return index,
            byte if byte == quote => return index + 1,
            _ => index += 1,
        }
    }

    text.len()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::{options::PreprocessorOptions, source_buffer::SourceBuffer};

    use super::{preprocess_to_text, strip_comments};

    fn to_text(src: &str) -> String {
        let output = preprocess_to_text(
            Arc::new(SourceBuffer::new("main.c", src)),
            PreprocessorOptions::new(),
        );
        assert!(output.diagnostics.is_empty());
        output.text
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("int a; // note\nint b;"), "int a;  \nint b;\n");
        assert_eq!(
            strip_comments("a/* one\ntwo */b\n"),
            "a \nb\n"
        );
        assert_eq!(
            strip_comments("s = \"// not a comment\"; c = '/';\n"),
            "s = \"// not a comment\"; c = '/';\n"
        );
        assert_eq!(strip_comments("x // a \\\n still comment\ny\n"), "x  \n\ny\n");
        assert_eq!(strip_comments(""), "\n");
    }

    #[test]
    fn test_preprocess_to_text() {
        let src = "\
#define SQUARE(x) ((x) * (x))

int main() {
    return SQUARE(2)+1;
}
";
        assert_eq!(
            to_text(src),
            "\n\nint main() {\n    return ((2) * (2))+1;\n}\n"
        );
    }

    #[test]
    fn test_render_keeps_tokens_apart() {
        assert_eq!(
            to_text("#define PLUS +\n#define ID(x) x\na = 1 PLUS+2; ID(b)ID(c)\n"),
            "\n\na = 1 + +2; b c\n"
        );
    }
}
