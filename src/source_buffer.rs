// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::sync::Arc;

use crate::position::Position;

/// The immutable text of one source file.
///
/// The buffer records the byte offset of every line start when it is created,
/// so translating an offset into a line and column is a binary search.
/// A `SourceBuffer` never changes after construction and may be shared
/// between concurrent runs through `Arc`.
#[derive(Debug, PartialEq, Eq)]
pub struct SourceBuffer {
    name: String,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    pub fn new(name: &str, text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, byte)| *byte == b'\n')
                .map(|(index, _)| index + 1),
        );

        Self {
            name: name.to_owned(),
            text: text.to_owned(),
            line_starts,
        }
    }

    /// The file name used in diagnostics and `__FILE__`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Maps a byte offset to a position.
    ///
    /// Offsets past the end of the text are clamped to the end.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|start| *start <= offset) - 1;
        let line_start = self.line_starts[line];

        // columns are counted in characters, the offset may be in the middle
        // of a multi-byte character only if the caller passed a bad offset.
        let column = match self.text.get(line_start..offset) {
            Some(prefix) => prefix.chars().count(),
            None => offset - line_start,
        };

        Position::new(offset, line, column)
    }

    /// Returns the text of the given (0-based) line without its line terminator.
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line)?;
        let end = match self.line_starts.get(line + 1) {
            Some(next) => *next - 1,
            None => self.text.len(),
        };

        let content = &self.text[start..end];
        Some(content.strip_suffix('\r').unwrap_or(content))
    }
}

/// All source files of one run, indexed by file number.
///
/// The main file is registered first, included headers follow in the order
/// they are loaded.
#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    files: Vec<Arc<SourceBuffer>>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a buffer and returns its file number.
    pub fn add(&mut self, buffer: Arc<SourceBuffer>) -> usize {
        self.files.push(buffer);
        self.files.len() - 1
    }

    pub fn get(&self, file_number: usize) -> Option<&Arc<SourceBuffer>> {
        self.files.get(file_number)
    }

    pub fn file_name(&self, file_number: usize) -> &str {
        match self.files.get(file_number) {
            Some(buffer) => buffer.name(),
            None => "<unknown>",
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
