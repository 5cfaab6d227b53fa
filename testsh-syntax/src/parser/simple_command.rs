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

//! Syntax parser for simple commands

use super::core::Parser;
use crate::lex::{TokenId, TokenSource};
use crate::syntax::{
    AssignmentWord, Command, Redirect, SimpleAssignment, UnsubCommand, Word,
};

/// Element of a command prefix
enum PrefixItem {
    Assignment(AssignmentWord),
    Redirect(Redirect),
}

/// Element of a command suffix
enum SuffixItem {
    Word(Word),
    Redirect(Redirect),
}

impl<T: TokenSource> Parser<T> {
    /// Parses `word := WORD | QUOTED_WORD | cmdsub`.
    pub fn word(&mut self) -> Option<Word> {
        if let Some(token) = self
            .take(TokenId::Word)
            .or_else(|| self.take(TokenId::QuotedWord))
            .or_else(|| self.take(TokenId::Number))
        {
            return Some(Word::Plain(token));
        }
        self.cmdsub().map(Word::CmdSub)
    }

    /// Parses an assignment word: a word token containing `=` not at
    /// position 0.
    ///
    /// A word whose value starts with `=` is never an assignment; it
    /// becomes an ordinary word (usually the program name).
    pub fn assignment_word(&mut self) -> Option<AssignmentWord> {
        let snapshot = self.snapshot();
        let token = self.take(TokenId::Word)?;
        match token.value.find('=') {
            None | Some(0) => {
                self.restore(snapshot);
                None
            }
            Some(position) => {
                let name = token.value[..position].to_string();
                let value = token.value[position + 1..].to_string();
                Some(AssignmentWord {
                    whole: token,
                    name,
                    value,
                })
            }
        }
    }

    /// Parses `cmd_prefix := (io_redirect | assignment_word)+`.
    ///
    /// The result may be empty; a prefix never fails.
    fn cmd_prefix(&mut self) -> Vec<PrefixItem> {
        let mut items = Vec::new();
        loop {
            if let Some(assignment) = self.assignment_word() {
                items.push(PrefixItem::Assignment(assignment));
            } else if let Some(redirect) = self.io_redirect() {
                items.push(PrefixItem::Redirect(redirect));
            } else {
                break;
            }
        }
        items
    }

    /// Parses `cmd_suffix := (io_redirect | word)+`.
    fn cmd_suffix(&mut self) -> Vec<SuffixItem> {
        let mut items = Vec::new();
        loop {
            if let Some(word) = self.word() {
                items.push(SuffixItem::Word(word));
            } else if let Some(redirect) = self.io_redirect() {
                items.push(SuffixItem::Redirect(redirect));
            } else {
                break;
            }
        }
        items
    }

    fn cmd_name(&mut self) -> Option<Word> {
        self.word()
    }

    fn cmd_word(&mut self) -> Option<Word> {
        self.word()
    }

    /// Parses a simple command.
    ///
    /// ```text
    /// simple_command := cmd_prefix cmd_word cmd_suffix
    ///                 | cmd_prefix cmd_word
    ///                 | cmd_prefix
    ///                 | cmd_name cmd_suffix
    ///                 | cmd_name
    /// ```
    ///
    /// A prefix without a command word yields a [`SimpleAssignment`];
    /// otherwise the result is an [`UnsubCommand`].
    pub fn simple_command(&mut self) -> Option<Command> {
        let prefix = self.cmd_prefix();
        if !prefix.is_empty() {
            let program = self.cmd_word();
            let suffix = self.cmd_suffix();

            let mut arguments = Vec::new();
            let mut redirections = Vec::new();
            let mut assignments = Vec::new();
            for item in prefix {
                match item {
                    PrefixItem::Assignment(assignment) => assignments.push(assignment),
                    PrefixItem::Redirect(redirect) => redirections.push(redirect),
                }
            }
            for item in suffix {
                match item {
                    SuffixItem::Word(word) => arguments.push(word),
                    SuffixItem::Redirect(redirect) => redirections.push(redirect),
                }
            }

            return Some(match program {
                None => Command::Assignment(SimpleAssignment {
                    redirections,
                    assignments,
                }),
                Some(program) => Command::Simple(UnsubCommand {
                    program,
                    arguments,
                    redirections,
                    assignments,
                }),
            });
        }

        let program = self.cmd_name()?;
        let suffix = self.cmd_suffix();
        let mut arguments = Vec::new();
        let mut redirections = Vec::new();
        for item in suffix {
            match item {
                SuffixItem::Word(word) => arguments.push(word),
                SuffixItem::Redirect(redirect) => redirections.push(redirect),
            }
        }
        Some(Command::Simple(UnsubCommand {
            program,
            arguments,
            redirections,
            assignments: vec![],
        }))
    }
}
