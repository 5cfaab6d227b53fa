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

//! Syntax parser for commands, subshells and command substitutions

use super::core::Parser;
use crate::lex::{TokenId, TokenSource};
use crate::syntax::{CmdSub, Command, Subshell};

impl<T: TokenSource> Parser<T> {
    /// Parses `command := simple_command | compound_command redirect_list?`.
    pub fn command(&mut self) -> Option<Command> {
        if let Some(command) = self.simple_command() {
            return Some(command);
        }
        let mut subshell = self.compound_command()?;
        if let Some(redirections) = self.redirect_list() {
            subshell.redirections = redirections;
        }
        Some(Command::Subshell(subshell))
    }

    /// Parses a compound command.
    ///
    /// The subshell is the only compound command of the language subset.
    pub fn compound_command(&mut self) -> Option<Subshell> {
        self.subshell()
    }

    /// Parses `subshell := '(' compound_list ')'`.
    pub fn subshell(&mut self) -> Option<Subshell> {
        let snapshot = self.snapshot();
        self.take(TokenId::OpenParen)?;
        let Some(body) = self.compound_list() else {
            self.restore(snapshot);
            return None;
        };
        if self.take(TokenId::CloseParen).is_none() {
            self.restore(snapshot);
            return None;
        }
        Some(Subshell {
            body: Box::new(body),
            redirections: vec![],
        })
    }

    /// Parses `cmdsub := '$(' compound_list ')'`.
    pub fn cmdsub(&mut self) -> Option<CmdSub> {
        let snapshot = self.snapshot();
        self.take(TokenId::DollarParen)?;
        let Some(body) = self.compound_list() else {
            self.restore(snapshot);
            return None;
        };
        if self.take(TokenId::CloseParen).is_none() {
            self.restore(snapshot);
            return None;
        }
        Some(CmdSub {
            body: Box::new(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Tokenizer;
    use crate::syntax::List;
    use assert_matches::assert_matches;

    fn lines(source: &str) -> Vec<String> {
        vec![format!("{source}\n")]
    }

    #[test]
    fn parser_subshell() {
        let lines = lines("(a; b)");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let subshell = parser.subshell().unwrap();
        assert_eq!(subshell.body.to_string(), "a; b");
        assert!(subshell.redirections.is_empty());
    }

    #[test]
    fn parser_subshell_multiline_body() {
        let lines = vec!["(\n".to_string(), "a\n".to_string(), "b)\n".to_string()];
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let subshell = parser.subshell().unwrap();
        assert_eq!(subshell.body.to_string(), "a; b");
    }

    #[test]
    fn parser_subshell_async_body() {
        let lines = lines("(a &)");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let subshell = parser.subshell().unwrap();
        assert_matches!(*subshell.body, List::Async(_));
    }

    #[test]
    fn parser_subshell_unclosed_backtracks() {
        let lines = lines("(a; b");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        assert_eq!(parser.subshell(), None);
        assert!(parser.take(TokenId::OpenParen).is_some());
    }

    #[test]
    fn parser_command_subshell_with_redirections() {
        let lines = lines("(a) >out 2>&1");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let command = parser.command().unwrap();
        assert_matches!(command, Command::Subshell(subshell) => {
            assert_eq!(subshell.redirections.len(), 2);
        });
    }

    #[test]
    fn parser_command_prefers_simple_command() {
        let lines = lines("echo (not a subshell)");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let command = parser.command().unwrap();
        assert_matches!(command, Command::Simple(_));
    }

    #[test]
    fn parser_cmdsub() {
        let lines = lines("$(echo inner)");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let cmdsub = parser.cmdsub().unwrap();
        assert_eq!(cmdsub.body.to_string(), "echo inner");
    }

    #[test]
    fn parser_cmdsub_nested() {
        let lines = lines("$(echo $(echo deep))");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let cmdsub = parser.cmdsub().unwrap();
        assert_eq!(cmdsub.body.to_string(), "echo $(echo deep)");
    }

    #[test]
    fn parser_cmdsub_requires_dollar_paren() {
        let lines = lines("(echo inner)");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        assert_eq!(parser.cmdsub(), None);
    }
}
