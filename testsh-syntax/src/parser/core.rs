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

//! Fundamentals for implementing the parser
//!
//! This module defines the [`Parser`] itself, the cursor snapshot
//! mechanism, and the separator productions shared by several grammar
//! rules.

use crate::lex::{Token, TokenId, TokenSource};

/// The shell syntax parser
///
/// A `Parser` owns a token cursor and exposes one method per grammar
/// production. Productions snapshot the cursor on entry and restore the
/// snapshot before returning `None`, so a failed production is invisible
/// to its caller.
#[derive(Clone, Debug)]
pub struct Parser<T: TokenSource> {
    tokens: T,
}

impl<T: TokenSource> Parser<T> {
    /// Creates a parser reading from the given token source.
    pub fn new(tokens: T) -> Self {
        Parser { tokens }
    }

    /// Returns the next token without consuming it.
    pub(super) fn peek(&self) -> Option<Token> {
        self.tokens.peek()
    }

    /// Consumes the next token if it has the given kind.
    pub(super) fn take(&mut self, id: TokenId) -> Option<Token> {
        if self.tokens.peek()?.id != id {
            return None;
        }
        self.tokens.next_token()
    }

    /// Captures the cursor for later [`restore`](Self::restore).
    pub(super) fn snapshot(&self) -> T {
        self.tokens.clone()
    }

    /// Rewinds the cursor to a previously captured snapshot.
    pub(super) fn restore(&mut self, snapshot: T) {
        self.tokens = snapshot;
    }

    /// Whether the token source is exhausted.
    pub fn at_eof(&self) -> bool {
        self.tokens.next_is_eof()
    }

    /// Parses `newline_list := NEWLINE+`.
    ///
    /// Returns whether at least one newline was consumed.
    pub fn newline_list(&mut self) -> bool {
        if self.take(TokenId::Newline).is_none() {
            return false;
        }
        while self.take(TokenId::Newline).is_some() {}
        true
    }

    /// Parses `linebreak := newline_list?`.
    pub fn linebreak(&mut self) {
        self.newline_list();
    }

    /// Parses `separator_op := '&' | ';'`.
    pub fn separator_op(&mut self) -> Option<Token> {
        self.take(TokenId::Ampersand)
            .or_else(|| self.take(TokenId::Semicolon))
    }

    /// Parses `separator := separator_op linebreak | newline_list`.
    ///
    /// Returns the kind of the separator: [`Ampersand`](TokenId::Ampersand),
    /// [`Semicolon`](TokenId::Semicolon) or [`Newline`](TokenId::Newline).
    pub fn separator(&mut self) -> Option<TokenId> {
        if let Some(operator) = self.separator_op() {
            self.linebreak();
            return Some(operator.id);
        }
        if self.newline_list() {
            return Some(TokenId::Newline);
        }
        None
    }
}
