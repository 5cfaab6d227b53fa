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

//! Syntax parser for pipelines

use super::core::Parser;
use crate::lex::{TokenId, TokenSource};
use crate::syntax::Pipeline;

impl<T: TokenSource> Parser<T> {
    /// Parses `pipeline := '!'? pipe_sequence`.
    pub fn pipeline(&mut self) -> Option<Pipeline> {
        let snapshot = self.snapshot();
        let negated = self.take(TokenId::Bang).is_some();
        let Some(mut pipeline) = self.pipe_sequence() else {
            self.restore(snapshot);
            return None;
        };
        pipeline.negated = negated;
        Some(pipeline)
    }

    /// Parses `pipe_sequence := command ('|' linebreak command)*`.
    fn pipe_sequence(&mut self) -> Option<Pipeline> {
        let first = self.command()?;
        let mut commands = vec![first];
        loop {
            let snapshot = self.snapshot();
            if self.take(TokenId::Bar).is_none() {
                break;
            }
            self.linebreak();
            let Some(next) = self.command() else {
                self.restore(snapshot);
                break;
            };
            commands.push(next);
        }
        Some(Pipeline {
            commands,
            negated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Tokenizer;

    fn lines(source: &str) -> Vec<String> {
        vec![format!("{source}\n")]
    }

    #[test]
    fn parser_pipeline_one() {
        let lines = lines("foo");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let pipeline = parser.pipeline().unwrap();
        assert!(!pipeline.negated);
        assert_eq!(pipeline.commands.len(), 1);
        assert_eq!(pipeline.commands[0].to_string(), "foo");
    }

    #[test]
    fn parser_pipeline_many() {
        let lines = vec!["one | two | \n".to_string(), " three\n".to_string()];
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let pipeline = parser.pipeline().unwrap();
        assert!(!pipeline.negated);
        assert_eq!(pipeline.commands.len(), 3);
        assert_eq!(pipeline.commands[0].to_string(), "one");
        assert_eq!(pipeline.commands[1].to_string(), "two");
        assert_eq!(pipeline.commands[2].to_string(), "three");
    }

    #[test]
    fn parser_pipeline_negated() {
        let lines = lines("! foo");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let pipeline = parser.pipeline().unwrap();
        assert!(pipeline.negated);
        assert_eq!(pipeline.commands.len(), 1);
    }

    #[test]
    fn parser_pipeline_bang_without_command_backtracks() {
        let lines = lines("! ;");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        assert_eq!(parser.pipeline(), None);
        assert!(parser.take(TokenId::Bang).is_some());
    }

    #[test]
    fn parser_pipeline_trailing_bar_not_consumed() {
        let lines = lines("foo | ;");
        let mut parser = Parser::new(Tokenizer::new(&lines));
        let pipeline = parser.pipeline().unwrap();
        assert_eq!(pipeline.commands.len(), 1);
        assert!(parser.take(TokenId::Bar).is_some());
    }

    #[test]
    fn parser_pipeline_none_at_eof() {
        let lines = vec!["\n".to_string()];
        let mut parser = Parser::new(Tokenizer::new(&lines));
        assert_eq!(parser.pipeline(), None);
    }
}
