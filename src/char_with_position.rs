// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::sync::Arc;

use crate::{position::Position, source_buffer::SourceBuffer};

/// Represents a character along with its position in the source text.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct CharWithPosition {
    pub character: char,
    pub position: Position,
}

impl CharWithPosition {
    pub fn new(character: char, position: Position) -> Self {
        Self {
            character,
            position,
        }
    }
}

/// An iterator that yields each character of a `SourceBuffer` along with its position.
///
/// Lines ending with a backslash are joined with the following line on the fly:
/// the backslash, any spaces or tabs after it and the line break are skipped,
/// so the characters that follow keep their real positions.
pub struct CharsWithPositionIter {
    source: Arc<SourceBuffer>,
    current_position: Position,
}

impl CharsWithPositionIter {
    pub fn new(source: Arc<SourceBuffer>) -> Self {
        Self {
            source,
            current_position: Position::default(),
        }
    }

    /// Returns the byte length of the line continuation starting at `rest`,
    /// where `rest` begins with a backslash.
    pub(crate) fn line_continuation_length(rest: &str) -> Option<usize> {
        let after_backslash = &rest[1..];
        let spaces = after_backslash
            .bytes()
            .take_while(|byte| *byte == b' ' || *byte == b'\t')
            .count();
        let after_spaces = &after_backslash[spaces..];

        if after_spaces.starts_with("\r\n") {
            Some(1 + spaces + 2)
        } else if after_spaces.starts_with('\n') {
            Some(1 + spaces + 1)
        } else {
            None
        }
    }
}

impl Iterator for CharsWithPositionIter {
    type Item = CharWithPosition;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = self.source.text().get(self.current_position.offset..)?;
            let character = rest.chars().next()?;

            if character == '\\' {
                if let Some(length) = Self::line_continuation_length(rest) {
                    self.current_position.offset += length;
                    self.current_position.line += 1;
                    self.current_position.column = 0;
                    continue;
                }
            }

            // Save the current position to associate with the character being returned.
            let last_position = self.current_position;

            self.current_position.offset += character.len_utf8();

            if character == '\n' {
                self.current_position.line += 1;
                self.current_position.column = 0;
            } else {
                self.current_position.column += 1;
            }

            return Some(CharWithPosition::new(character, last_position));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::{
        char_with_position::{CharWithPosition, CharsWithPositionIter},
        position::Position,
        source_buffer::SourceBuffer,
    };

    fn chars_of(text: &str) -> Vec<CharWithPosition> {
        CharsWithPositionIter::new(Arc::new(SourceBuffer::new("t.c", text))).collect()
    }

    #[test]
    fn test_chars_with_position() {
        assert_eq!(
            chars_of("a\n文b"),
            vec![
                CharWithPosition::new('a', Position::new(0, 0, 0)),
                CharWithPosition::new('\n', Position::new(1, 0, 1)),
                CharWithPosition::new('文', Position::new(2, 1, 0)),
                CharWithPosition::new('b', Position::new(5, 1, 1)),
            ]
        );
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(
            chars_of("a\\\nb\\  \r\nc\\d"),
            vec![
                CharWithPosition::new('a', Position::new(0, 0, 0)),
                CharWithPosition::new('b', Position::new(3, 1, 0)),
                CharWithPosition::new('c', Position::new(9, 2, 0)),
                CharWithPosition::new('\\', Position::new(10, 2, 1)),
                CharWithPosition::new('d', Position::new(11, 2, 2)),
            ]
        );
    }
}
