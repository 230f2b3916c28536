// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use crate::{position::Position, range::Range};

/// A range within one registered source file.
///
/// `file_number` is the index of the file in the `SourceMap` of the run.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct Location {
    pub file_number: usize,
    pub range: Range,
}

impl Location {
    pub fn new(file_number: usize, range: &Range) -> Self {
        Self {
            file_number,
            range: *range,
        }
    }

    pub fn from_position(file_number: usize, position: &Position) -> Self {
        Self {
            file_number,
            range: Range::from_single_position(position),
        }
    }

    pub fn start(&self) -> &Position {
        &self.range.start
    }

    /// Joins two locations of the same file, e.g. the first and last token of a node.
    pub fn to(&self, end: &Location) -> Location {
        if self.file_number != end.file_number || end.range.end_included < self.range.start {
            return *self;
        }

        Location::new(self.file_number, &Range::merge(&self.range, &end.range))
    }
}
