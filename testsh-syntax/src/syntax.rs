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

//! Shell command language syntax
//!
//! This module contains types that represent abstract syntax trees (ASTs)
//! of the supported shell language subset.
//!
//! The AST type for a whole input unit is [`Program`], a vector of
//! [`List`]s. A `List` is either a [`SequentialList`] or an [`AsyncList`];
//! both are left-leaning spines whose optional `left` models "there is an
//! earlier list in the chain" without requiring cycles. The right-hand
//! side of a list is an [`OpList`]: an and-or chain bottoming out in a
//! [`Pipeline`], which owns a non-empty vector of [`Command`]s.
//!
//! Ownership is strictly tree-shaped. Every child link is an owning
//! `Box`/`Vec`; there are no cross-links and no back-pointers, so a tree
//! can be dropped or moved without bookkeeping.
//!
//! All types implement [`Display`](std::fmt::Display) (see the
//! `impl_display` submodule), reserializing a tree to source text that
//! parses back to an equivalent tree.

use crate::lex::Token;
#[cfg(unix)]
use std::os::unix::io::RawFd;

#[cfg(not(unix))]
type RawFd = i32;

mod impl_display;

/// How the file of a [`FileRedirect`] is opened
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OpenKind {
    /// `<` (open for reading)
    Read,
    /// `>` (create or truncate, open for writing)
    Replace,
    /// `>>` (create if needed, open for appending)
    Append,
    /// `<>` (create if needed, open for reading and writing)
    ReadWrite,
}

/// Redirection that opens a file
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileRedirect {
    /// File descriptor modified by this redirection
    pub fd: RawFd,
    /// Open mode
    pub kind: OpenKind,
    /// Name of the file to open
    pub filename: String,
}

/// Redirection that duplicates an existing file descriptor (`<&n`, `>&n`)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FdRedirect {
    /// File descriptor modified by this redirection
    pub fd: RawFd,
    /// File descriptor to duplicate from
    pub source: RawFd,
}

/// Redirection that closes a file descriptor (`<&-`, `>&-`)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CloseFd {
    /// File descriptor to close
    pub fd: RawFd,
}

/// `<&`/`>&` redirection whose operand is neither numeric nor `-`
///
/// The parse succeeds; applying the redirection fails the command with
/// exit status 1 so that the enclosing list continues.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BadFdRedirect {
    /// File descriptor the redirection would have modified
    pub fd: RawFd,
    /// Operand as written
    pub operand: String,
}

/// Redirection
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Redirect {
    /// Open a file
    File(FileRedirect),
    /// Duplicate a file descriptor
    Fd(FdRedirect),
    /// Close a file descriptor
    Close(CloseFd),
    /// Malformed duplication operand, rejected when applied
    BadFd(BadFdRedirect),
}

impl Redirect {
    /// Replaces the target file descriptor.
    ///
    /// A leading IO number token overrides the default descriptor of the
    /// redirection operator that follows it.
    pub fn set_fd(&mut self, fd: RawFd) {
        match self {
            Redirect::File(file) => file.fd = fd,
            Redirect::Fd(dup) => dup.fd = fd,
            Redirect::Close(close) => close.fd = fd,
            Redirect::BadFd(bad) => bad.fd = fd,
        }
    }

    /// Returns the target file descriptor.
    pub fn fd(&self) -> RawFd {
        match self {
            Redirect::File(file) => file.fd,
            Redirect::Fd(dup) => dup.fd,
            Redirect::Close(close) => close.fd,
            Redirect::BadFd(bad) => bad.fd,
        }
    }
}

/// Word of the form `name=value`
///
/// The name is non-empty and contains no `=`; the value may be empty. The
/// whole token is kept so that the exact `name=value` text can be passed
/// to a child environment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssignmentWord {
    /// The entire token the assignment was parsed from
    pub whole: Token,
    /// Variable name (the part before the first `=`)
    pub name: String,
    /// Assigned value (the part after the first `=`)
    pub value: String,
}

/// Command substitution: `$( list )`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CmdSub {
    /// The substituted list
    pub body: Box<List>,
}

/// Word appearing in a simple command
///
/// A word is either a plain token or a command substitution whose output
/// replaces the word when the command is executed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Word {
    /// Plain token (`Word`, `QuotedWord` or `Number`)
    Plain(Token),
    /// `$( list )`
    CmdSub(CmdSub),
}

/// Simple command that may still contain command substitutions
///
/// The program word and the argument words are substituted into plain
/// strings immediately before execution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnsubCommand {
    /// Word naming the program to run
    pub program: Word,
    /// Argument words
    pub arguments: Vec<Word>,
    /// Redirections, in parse order
    pub redirections: Vec<Redirect>,
    /// Prefix assignments forming the command environment
    pub assignments: Vec<AssignmentWord>,
}

/// Assignments and redirections without a program word
///
/// Executing a simple assignment mutates the shell variables in place.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SimpleAssignment {
    /// Redirections, in parse order
    pub redirections: Vec<Redirect>,
    /// Assignments applied to the shell variables
    pub assignments: Vec<AssignmentWord>,
}

/// `( list )` with optional trailing redirections
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subshell {
    /// The list evaluated in the child shell
    pub body: Box<List>,
    /// Redirections applied to the child
    pub redirections: Vec<Redirect>,
}

/// Element of a pipeline
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Simple command
    Simple(UnsubCommand),
    /// Variable assignment without a program
    Assignment(SimpleAssignment),
    /// Subshell
    Subshell(Subshell),
}

/// Commands separated by `|`, optionally negated by a leading `!`
///
/// A pipeline always contains at least one command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pipeline {
    /// Commands, in pipe order
    pub commands: Vec<Command>,
    /// Whether the exit status is inverted
    pub negated: bool,
}

/// `&&` chain node
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AndList {
    /// Left operand, run first
    pub left: Box<OpList>,
    /// Right operand, run when the left succeeds
    pub right: Box<OpList>,
}

/// `||` chain node
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrList {
    /// Left operand, run first
    pub left: Box<OpList>,
    /// Right operand, run when the left fails
    pub right: Box<OpList>,
}

/// And-or chain bottoming out in a pipeline
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OpList {
    /// `left && right`
    And(AndList),
    /// `left || right`
    Or(OrList),
    /// Plain pipeline
    Pipeline(Pipeline),
}

/// List whose right-hand side runs synchronously
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SequentialList {
    /// Earlier lists in the chain, if any
    pub left: Option<Box<List>>,
    /// The chain element this node adds
    pub right: Box<OpList>,
}

/// List whose right-hand side runs in the background
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AsyncList {
    /// Earlier lists in the chain, if any
    pub left: Option<Box<List>>,
    /// The chain element run asynchronously
    pub right: Box<OpList>,
}

/// Sequential or asynchronous list
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum List {
    /// Children separated by `;` or newline
    Sequential(SequentialList),
    /// Left spine run in the background via `&`
    Async(AsyncList),
}

/// Whole parsed input unit: the complete commands of one buffered input
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Program {
    /// Complete commands, in input order
    pub commands: Vec<List>,
}

impl SequentialList {
    /// Converts an asynchronous list into a sequential one, preserving the
    /// spine.
    pub fn from_async(list: AsyncList) -> Self {
        SequentialList {
            left: list.left,
            right: list.right,
        }
    }
}

impl AsyncList {
    /// Converts a sequential list into an asynchronous one, preserving the
    /// spine.
    ///
    /// This is the `&` rewrite: a `&` separator turns the sequential list
    /// accumulated so far into an asynchronous list.
    pub fn from_seq(list: SequentialList) -> Self {
        AsyncList {
            left: list.left,
            right: list.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::TokenId;

    fn plain_word(value: &str) -> Word {
        Word::Plain(Token {
            id: TokenId::Word,
            value: value.to_string(),
            start: 0,
            end: value.len(),
        })
    }

    fn pipeline_of(program: &str) -> OpList {
        OpList::Pipeline(Pipeline {
            commands: vec![Command::Simple(UnsubCommand {
                program: plain_word(program),
                arguments: vec![],
                redirections: vec![],
                assignments: vec![],
            })],
            negated: false,
        })
    }

    #[test]
    fn async_list_from_seq_preserves_spine() {
        let seq = SequentialList {
            left: Some(Box::new(List::Sequential(SequentialList {
                left: None,
                right: Box::new(pipeline_of("a")),
            }))),
            right: Box::new(pipeline_of("b")),
        };
        let left = seq.left.clone();
        let list = AsyncList::from_seq(seq);
        assert_eq!(list.left, left);
        assert_eq!(*list.right, pipeline_of("b"));

        let back = SequentialList::from_async(list);
        assert_eq!(back.left, left);
        assert_eq!(*back.right, pipeline_of("b"));
    }

    #[test]
    fn redirect_set_fd_overrides_target() {
        let mut redirect = Redirect::File(FileRedirect {
            fd: 1,
            kind: OpenKind::Replace,
            filename: "out".to_string(),
        });
        redirect.set_fd(2);
        assert_eq!(redirect.fd(), 2);

        let mut redirect = Redirect::Close(CloseFd { fd: 0 });
        redirect.set_fd(5);
        assert_eq!(redirect.fd(), 5);
    }
}
