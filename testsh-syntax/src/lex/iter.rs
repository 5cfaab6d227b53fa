// This file is part of testsh, a POSIX-style job-controlling shell.
// Copyright (C) 2025 testsh developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Token source over a pre-materialized token vector

use super::core::TokenSource;
use super::token::Token;

/// Token source iterating over an already-scanned token slice
///
/// This source is used where a token stream has been materialized up
/// front, such as when re-parsing a processed token sequence. Cloning is a
/// pointer-and-index copy, so cursor snapshots are free.
#[derive(Clone, Copy, Debug)]
pub struct TokenIter<'a> {
    tokens: &'a [Token],
    index: usize,
}

impl<'a> TokenIter<'a> {
    /// Creates an iterator over the given tokens.
    pub fn new(tokens: &'a [Token]) -> Self {
        TokenIter { tokens, index: 0 }
    }
}

impl TokenSource for TokenIter<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.index).cloned()
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.index += 1;
        Some(token)
    }

    fn next_is_eof(&self) -> bool {
        self.index >= self.tokens.len()
    }
}
