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

//! Syntax parser for and-or chains, lists and whole programs

use super::core::Parser;
use crate::lex::{TokenId, TokenSource};
use crate::syntax::{
    AndList, AsyncList, List, OpList, OrList, Program, SequentialList,
};

impl<T: TokenSource> Parser<T> {
    /// Parses `and_or := pipeline ((AND_AND | OR_OR) linebreak pipeline)*`.
    ///
    /// The chain is built left-associatively.
    pub fn and_or(&mut self) -> Option<OpList> {
        let first = self.pipeline()?;
        let mut chain = OpList::Pipeline(first);
        loop {
            let snapshot = self.snapshot();
            let Some(operator) = self
                .take(TokenId::AndAnd)
                .or_else(|| self.take(TokenId::OrOr))
            else {
                break;
            };
            self.linebreak();
            let Some(next) = self.pipeline() else {
                self.restore(snapshot);
                break;
            };
            let left = Box::new(chain);
            let right = Box::new(OpList::Pipeline(next));
            chain = if operator.id == TokenId::AndAnd {
                OpList::And(AndList { left, right })
            } else {
                OpList::Or(OrList { left, right })
            };
        }
        Some(chain)
    }

    /// Parses `list := and_or (separator_op and_or)*`.
    ///
    /// An `&` separator converts the list accumulated so far into the
    /// asynchronous left spine of the next element.
    pub fn list(&mut self) -> Option<SequentialList> {
        let first = self.and_or()?;
        let mut list = SequentialList {
            left: None,
            right: Box::new(first),
        };
        loop {
            let snapshot = self.snapshot();
            let Some(separator) = self.separator_op() else {
                break;
            };
            let Some(next) = self.and_or() else {
                self.restore(snapshot);
                break;
            };
            let left = if separator.id == TokenId::Ampersand {
                List::Async(AsyncList::from_seq(list))
            } else {
                List::Sequential(list)
            };
            list = SequentialList {
                left: Some(Box::new(left)),
                right: Box::new(next),
            };
        }
        Some(list)
    }

    /// Parses `term := and_or (separator and_or)*`.
    ///
    /// Same shape as [`list`](Self::list), but newlines also separate
    /// elements. Used inside subshells and command substitutions.
    pub fn term(&mut self) -> Option<SequentialList> {
        let first = self.and_or()?;
        let mut list = SequentialList {
            left: None,
            right: Box::new(first),
        };
        loop {
            let snapshot = self.snapshot();
            let Some(separator) = self.separator() else {
                break;
            };
            let Some(next) = self.and_or() else {
                self.restore(snapshot);
                break;
            };
            let left = if separator == TokenId::Ampersand {
                List::Async(AsyncList::from_seq(list))
            } else {
                List::Sequential(list)
            };
            list = SequentialList {
                left: Some(Box::new(left)),
                right: Box::new(next),
            };
        }
        Some(list)
    }

    /// Parses `compound_list := linebreak term separator?`.
    pub fn compound_list(&mut self) -> Option<List> {
        let snapshot = self.snapshot();
        self.linebreak();
        let Some(term) = self.term() else {
            self.restore(snapshot);
            return None;
        };
        if self.separator() == Some(TokenId::Ampersand) {
            return Some(List::Async(AsyncList::from_seq(term)));
        }
        Some(List::Sequential(term))
    }

    /// Parses `complete_command := list separator_op?`.
    ///
    /// A trailing `&` wraps the entire preceding list as asynchronous.
    pub fn complete_command(&mut self) -> Option<List> {
        let list = self.list()?;
        if let Some(separator) = self.separator_op() {
            if separator.id == TokenId::Ampersand {
                return Some(List::Async(AsyncList::from_seq(list)));
            }
        }
        Some(List::Sequential(list))
    }

    /// Parses `complete_commands := complete_command (newline_list
    /// complete_command)*`.
    pub fn complete_commands(&mut self) -> Vec<List> {
        let mut commands = Vec::new();
        loop {
            let Some(command) = self.complete_command() else {
                break;
            };
            commands.push(command);
            if !self.newline_list() {
                break;
            }
        }
        commands
    }

    /// Parses `program := linebreak complete_commands? linebreak`.
    ///
    /// The whole input must be consumed; leftover tokens fail the parse.
    pub fn program(&mut self) -> Option<Program> {
        let snapshot = self.snapshot();
        self.linebreak();
        if self.at_eof() {
            return Some(Program { commands: vec![] });
        }
        let commands = self.complete_commands();
        if commands.is_empty() {
            self.restore(snapshot);
            return None;
        }
        self.linebreak();
        if !self.at_eof() {
            self.restore(snapshot);
            return None;
        }
        Some(Program { commands })
    }
}
