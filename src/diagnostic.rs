// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::fmt::Display;

use crate::{diagnostic_printer::print_diagnostic, location::Location, source_buffer::SourceMap};

#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// A secondary message attached to a diagnostic, e.g. "previous definition is here".
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Note {
    pub message: String,
    pub location: Location,
}

/// A message produced by the lexer, the preprocessor or the parser.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    pub notes: Vec<Note>,

    // A flag-style code such as `-Wimplicit-int`, rendered as a bracketed suffix.
    pub code: Option<String>,

    /// Text suggested for insertion at the location, e.g. `int ` for a missing type specifier.
    pub fix_it: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: &str, location: Location) -> Self {
        Self {
            severity,
            message: message.to_owned(),
            location,
            notes: vec![],
            code: None,
            fix_it: None,
        }
    }

    pub fn error(message: &str, location: Location) -> Self {
        Self::new(Severity::Error, message, location)
    }

    pub fn warning(message: &str, location: Location) -> Self {
        Self::new(Severity::Warning, message, location)
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_owned());
        self
    }

    pub fn with_fix_it(mut self, text: &str) -> Self {
        self.fix_it = Some(text.to_owned());
        self
    }

    pub fn with_note(mut self, message: &str, location: Location) -> Self {
        self.notes.push(Note {
            message: message.to_owned(),
            location,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Collects the diagnostics of one run in the order they are produced.
///
/// Diagnostics are never removed or rewritten once added.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(severity = %diagnostic.severity, message = %diagnostic.message, "diagnostic");
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn error(&mut self, message: &str, location: Location) {
        self.push(Diagnostic::error(message, location));
    }

    pub fn warning(&mut self, message: &str, location: Location) {
        self.push(Diagnostic::warning(message, location));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Renders every diagnostic, one after another.
    ///
    /// With `with_source` each message is followed by the source line and a caret line.
    pub fn render(&self, source_map: &SourceMap, with_source: bool) -> String {
        self.diagnostics
            .iter()
            .map(|diagnostic| print_diagnostic(source_map, diagnostic, with_source))
            .collect()
    }
}

impl IntoIterator for DiagnosticSink {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}
