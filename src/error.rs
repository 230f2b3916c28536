// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::path::PathBuf;

use thiserror::Error;

use crate::{diagnostic::Diagnostic, location::Location};

/// An error raised while handling one directive or one macro invocation.
///
/// The preprocessor converts it into a `Diagnostic` and skips the rest of
/// the directive (or leaves the invocation unexpanded).
#[derive(Debug, PartialEq, Error)]
pub enum PreprocessError {
    #[error("{0}")]
    Message(String, Location),

    #[error("{message}")]
    MessageWithNote {
        message: String,
        location: Location,
        note: String,
        note_location: Location,
    },

    #[error("'{path}' file not found")]
    FileNotFound { path: String, location: Location },

    #[error("#include nested depth {depth} exceeds maximum of {max}")]
    IncludeTooDeep {
        depth: usize,
        max: usize,
        location: Location,
    },

    #[error("macro argument nesting level exceeded maximum of {max}")]
    ExpansionTooDeep { max: usize, location: Location },

    #[error("unterminated function-like macro invocation")]
    UnterminatedInvocation(Location),

    #[error("unexpected end of directive")]
    UnexpectedEndOfDirective(Location),
}

impl PreprocessError {
    pub fn message(message: &str, location: Location) -> Self {
        PreprocessError::Message(message.to_owned(), location)
    }

    pub fn location(&self) -> Location {
        match self {
            PreprocessError::Message(_, location)
            | PreprocessError::MessageWithNote { location, .. }
            | PreprocessError::FileNotFound { location, .. }
            | PreprocessError::IncludeTooDeep { location, .. }
            | PreprocessError::ExpansionTooDeep { location, .. }
            | PreprocessError::UnterminatedInvocation(location)
            | PreprocessError::UnexpectedEndOfDirective(location) => *location,
        }
    }
}

impl From<PreprocessError> for Diagnostic {
    fn from(error: PreprocessError) -> Self {
        let diagnostic = Diagnostic::error(&error.to_string(), error.location());
        match error {
            PreprocessError::MessageWithNote {
                note,
                note_location,
                ..
            } => diagnostic.with_note(&note, note_location),
            _ => diagnostic,
        }
    }
}

/// An unrecoverable syntax error at a single point,
/// the parser reports it and resynchronizes.
#[derive(Debug, PartialEq, Error)]
pub enum ParseError {
    #[error("{0}")]
    Message(String, Location),

    #[error("unexpected token '{found}', expected one of: {}", format_expected(.expected))]
    UnexpectedToken {
        found: String,
        expected: Vec<String>,
        location: Location,
    },

    #[error("expected '{expected}'{}", format_context(.context))]
    Expected {
        expected: String,
        context: Option<String>,
        location: Location,
    },

    #[error("bracket nesting level exceeded maximum of {max}")]
    NestingTooDeep { max: usize, location: Location },
}

fn format_expected(expected: &[String]) -> String {
    expected
        .iter()
        .map(|item| format!("'{}'", item))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_context(context: &Option<String>) -> String {
    match context {
        Some(context) => format!(" {}", context),
        None => String::new(),
    }
}

impl ParseError {
    pub fn message(message: &str, location: Location) -> Self {
        ParseError::Message(message.to_owned(), location)
    }

    pub fn location(&self) -> Location {
        match self {
            ParseError::Message(_, location)
            | ParseError::UnexpectedToken { location, .. }
            | ParseError::Expected { location, .. }
            | ParseError::NestingTooDeep { location, .. } => *location,
        }
    }
}

impl From<ParseError> for Diagnostic {
    fn from(error: ParseError) -> Self {
        Diagnostic::error(&error.to_string(), error.location())
    }
}

#[derive(Debug, Error)]
pub enum FileProviderError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("file is not valid UTF-8 text: {0}")]
    InvalidText(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        diagnostic::{Diagnostic, Severity},
        location::Location,
        position::Position,
    };

    use super::{ParseError, PreprocessError};

    #[test]
    fn test_error_messages() {
        let location = Location::from_position(0, &Position::new(4, 0, 4));

        assert_eq!(
            ParseError::UnexpectedToken {
                found: "bar".to_owned(),
                expected: vec![";".to_owned(), "=".to_owned()],
                location,
            }
            .to_string(),
            "unexpected token 'bar', expected one of: ';', '='"
        );

        assert_eq!(
            ParseError::Expected {
                expected: ";".to_owned(),
                context: Some("after struct".to_owned()),
                location,
            }
            .to_string(),
            "expected ';' after struct"
        );

        assert_eq!(
            PreprocessError::FileNotFound {
                path: "stdio.h".to_owned(),
                location,
            }
            .to_string(),
            "'stdio.h' file not found"
        );
    }

    #[test]
    fn test_convert_to_diagnostic() {
        let location = Location::from_position(0, &Position::new(8, 1, 0));
        let previous = Location::from_position(0, &Position::new(0, 0, 0));

        let diagnostic: Diagnostic = PreprocessError::MessageWithNote {
            message: "'A' macro redefined".to_owned(),
            location,
            note: "previous definition is here".to_owned(),
            note_location: previous,
        }
        .into();

        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.message, "'A' macro redefined");
        assert_eq!(diagnostic.location, location);
        assert_eq!(diagnostic.notes.len(), 1);
        assert_eq!(diagnostic.notes[0].location, previous);
    }
}
