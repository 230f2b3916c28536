// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::collections::VecDeque;

/// `PeekableIter` extends the functionality of `std::iter::Peekable` by allowing
/// peeking at elements at any specified offset, not just the next one.
///
/// Elements are pulled from the upstream iterator only when a peek or `next`
/// needs them, so wrapping a lazy iterator keeps it lazy.
pub struct PeekableIter<I>
where
    I: Iterator,
{
    upstream: I,
    buffer: VecDeque<I::Item>,
}

impl<I> PeekableIter<I>
where
    I: Iterator,
{
    pub fn new(upstream: I) -> Self {
        Self {
            upstream,
            buffer: VecDeque::new(),
        }
    }

    /// Returns a reference to the element at the specified offset,
    /// or None if the upstream iterator ends before that offset.
    pub fn peek(&mut self, offset: usize) -> Option<&I::Item> {
        while self.buffer.len() <= offset {
            let value = self.upstream.next()?;
            self.buffer.push_back(value);
        }

        self.buffer.get(offset)
    }

    /// Gives access to the upstream iterator, e.g. to drain side channels.
    ///
    /// Elements that were already peeked stay buffered.
    pub fn upstream_mut(&mut self) -> &mut I {
        &mut self.upstream
    }

    pub fn upstream(&self) -> &I {
        &self.upstream
    }

    /// Consumes the iterator, buffered elements are dropped.
    pub fn into_upstream(self) -> I {
        self.upstream
    }
}

impl<I> Iterator for PeekableIter<I>
where
    I: Iterator,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        match self.buffer.pop_front() {
            Some(value) => Some(value),
            None => self.upstream.next(),
        }
    }
}
