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

//! Token source interface and the line-buffer scanner

use super::token::{Token, TokenId};

/// Interface between a token producer and the parser
///
/// A token source yields a lazy sequence of [`Token`]s. `peek` is
/// idempotent; `next_token` advances past the peeked token. A `None`
/// result from `next_token` at a position where [`next_is_eof`] is false
/// indicates a scan error, which the parser surfaces as a parse failure.
///
/// Implementations must be cheap to clone so that the parser can snapshot
/// the cursor before a speculative production and restore it on failure.
///
/// [`next_is_eof`]: TokenSource::next_is_eof
pub trait TokenSource: Clone {
    /// Returns the next token without consuming it.
    fn peek(&self) -> Option<Token>;

    /// Returns the next token and advances past it.
    fn next_token(&mut self) -> Option<Token>;

    /// Whether the input is exhausted.
    fn next_is_eof(&self) -> bool;
}

/// Token source scanning a slice of buffered input lines
///
/// The scanner works over the lines as one logical input; token offsets
/// are global byte offsets so that they remain meaningful across lines.
/// Tokens never span a line boundary because every line carries its
/// terminating newline as content.
#[derive(Clone, Copy, Debug)]
pub struct Tokenizer<'a> {
    lines: &'a [String],
    line: usize,
    column: usize,
    offset: usize,
}

impl<'a> Tokenizer<'a> {
    /// Creates a scanner over the given lines.
    pub fn new(lines: &'a [String]) -> Self {
        Tokenizer {
            lines,
            line: 0,
            column: 0,
            offset: 0,
        }
    }

    /// Returns the character `skip` characters ahead of the cursor.
    fn peek_at(&self, skip: usize) -> Option<char> {
        let mut line = self.line;
        let mut column = self.column;
        let mut remaining = skip;
        while line < self.lines.len() {
            for c in self.lines[line][column..].chars() {
                if remaining == 0 {
                    return Some(c);
                }
                remaining -= 1;
            }
            line += 1;
            column = 0;
        }
        None
    }

    fn peek_char(&self) -> Option<char> {
        self.peek_at(0)
    }

    /// Consumes one character, stepping over line boundaries.
    fn advance(&mut self) -> Option<char> {
        while self.line < self.lines.len() && self.column >= self.lines[self.line].len() {
            self.line += 1;
            self.column = 0;
        }
        let c = self.lines.get(self.line)?[self.column..].chars().next()?;
        self.column += c.len_utf8();
        self.offset += c.len_utf8();
        Some(c)
    }

    fn skip_blanks(&mut self) {
        while let Some(' ' | '\t') = self.peek_char() {
            self.advance();
        }
    }

    fn operator(&mut self, id: TokenId, len: usize, start: usize) -> Option<Token> {
        let mut value = String::new();
        for _ in 0..len {
            value.push(self.advance()?);
        }
        Some(Token {
            id,
            value,
            start,
            end: self.offset,
        })
    }

    /// Scans a single-quoted word. The raw value keeps the quotes.
    ///
    /// A quote that is not closed before the end of the line is a scan
    /// error.
    fn quoted_word(&mut self, start: usize) -> Option<Token> {
        let mut value = String::new();
        value.push(self.advance()?);
        loop {
            let c = self.peek_char()?;
            if c == '\n' {
                return None;
            }
            self.advance();
            value.push(c);
            if c == '\'' {
                break;
            }
        }
        Some(Token {
            id: TokenId::QuotedWord,
            value,
            start,
            end: self.offset,
        })
    }

    /// Scans a digit run, deciding between an IO number, a plain number,
    /// and the start of an ordinary word.
    fn number_or_word(&mut self, start: usize) -> Option<Token> {
        let mut probe = *self;
        let mut value = String::new();
        while let Some(c @ '0'..='9') = probe.peek_char() {
            probe.advance();
            value.push(c);
        }
        let id = match probe.peek_char() {
            Some('<' | '>') => TokenId::IoNumber,
            None | Some(' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')' | '\'') => TokenId::Number,
            _ => return self.word(start),
        };
        *self = probe;
        Some(Token {
            id,
            value,
            start,
            end: self.offset,
        })
    }

    fn word(&mut self, start: usize) -> Option<Token> {
        let mut value = String::new();
        while let Some(c) = self.peek_char() {
            match c {
                ' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')' | '<' | '>' | '\'' => break,
                '\\' => match self.peek_at(1) {
                    Some('\n') | None => break,
                    Some(escaped) => {
                        self.advance();
                        self.advance();
                        value.push('\\');
                        value.push(escaped);
                    }
                },
                '$' if self.peek_at(1) == Some('(') => break,
                _ => {
                    self.advance();
                    value.push(c);
                }
            }
        }
        if value.is_empty() {
            return None;
        }
        Some(Token {
            id: TokenId::Word,
            value,
            start,
            end: self.offset,
        })
    }
}

impl TokenSource for Tokenizer<'_> {
    fn peek(&self) -> Option<Token> {
        let mut probe = *self;
        probe.next_token()
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_blanks();
        let start = self.offset;
        let c = self.peek_char()?;
        match c {
            '\n' => self.operator(TokenId::Newline, 1, start),
            ';' => self.operator(TokenId::Semicolon, 1, start),
            '(' => self.operator(TokenId::OpenParen, 1, start),
            ')' => self.operator(TokenId::CloseParen, 1, start),
            '&' => match self.peek_at(1) {
                Some('&') => self.operator(TokenId::AndAnd, 2, start),
                _ => self.operator(TokenId::Ampersand, 1, start),
            },
            '|' => match self.peek_at(1) {
                Some('|') => self.operator(TokenId::OrOr, 2, start),
                _ => self.operator(TokenId::Bar, 1, start),
            },
            '<' => match self.peek_at(1) {
                Some('&') => self.operator(TokenId::LessAnd, 2, start),
                Some('>') => self.operator(TokenId::LessGreat, 2, start),
                _ => self.operator(TokenId::Less, 1, start),
            },
            '>' => match self.peek_at(1) {
                Some('&') => self.operator(TokenId::GreatAnd, 2, start),
                Some('>') => self.operator(TokenId::DGreat, 2, start),
                _ => self.operator(TokenId::Great, 1, start),
            },
            '$' if self.peek_at(1) == Some('(') => self.operator(TokenId::DollarParen, 2, start),
            '\\' if self.peek_at(1) == Some('\n') => {
                self.operator(TokenId::LineContinuation, 2, start)
            }
            '!' if matches!(self.peek_at(1), None | Some(' ' | '\t' | '\n')) => {
                self.operator(TokenId::Bang, 1, start)
            }
            '\'' => self.quoted_word(start),
            '0'..='9' => self.number_or_word(start),
            _ => self.word(start),
        }
    }

    fn next_is_eof(&self) -> bool {
        let mut probe = *self;
        probe.skip_blanks();
        probe.peek_char().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &[&str]) -> Vec<Token> {
        let lines: Vec<String> = source.iter().map(|s| s.to_string()).collect();
        let mut tokenizer = Tokenizer::new(&lines);
        let mut tokens = Vec::new();
        while let Some(token) = tokenizer.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn ids(source: &str) -> Vec<TokenId> {
        scan(&[source]).iter().map(|t| t.id).collect()
    }

    #[test]
    fn tokenizer_empty_input() {
        let lines: Vec<String> = vec![];
        let tokenizer = Tokenizer::new(&lines);
        assert!(tokenizer.next_is_eof());
        assert_eq!(tokenizer.peek(), None);
    }

    #[test]
    fn tokenizer_words_and_blanks() {
        let tokens = scan(&["echo  hello\tworld\n"]);
        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, ["echo", "hello", "world", "\n"]);
        use TokenId::*;
        assert_eq!(
            tokens.iter().map(|t| t.id).collect::<Vec<_>>(),
            [Word, Word, Word, Newline]
        );
    }

    #[test]
    fn tokenizer_operators() {
        use TokenId::*;
        assert_eq!(ids("a && b"), [Word, AndAnd, Word]);
        assert_eq!(ids("a || b"), [Word, OrOr, Word]);
        assert_eq!(ids("a | b"), [Word, Bar, Word]);
        assert_eq!(ids("a & b"), [Word, Ampersand, Word]);
        assert_eq!(ids("a ; b"), [Word, Semicolon, Word]);
        assert_eq!(ids("(a)"), [OpenParen, Word, CloseParen]);
    }

    #[test]
    fn tokenizer_redirect_operators() {
        use TokenId::*;
        assert_eq!(ids("< f"), [Less, Word]);
        assert_eq!(ids("> f"), [Great, Word]);
        assert_eq!(ids(">> f"), [DGreat, Word]);
        assert_eq!(ids("<> f"), [LessGreat, Word]);
        assert_eq!(ids("<& 1"), [LessAnd, Number]);
        assert_eq!(ids(">& -"), [GreatAnd, Word]);
    }

    #[test]
    fn tokenizer_io_number_fuses_with_operator() {
        use TokenId::*;
        assert_eq!(ids("2>f"), [IoNumber, Great, Word]);
        assert_eq!(ids("2 >f"), [Number, Great, Word]);
        assert_eq!(ids("echo 22"), [Word, Number]);
        assert_eq!(ids("22nd"), [Word]);
    }

    #[test]
    fn tokenizer_bang_requires_delimiter() {
        use TokenId::*;
        assert_eq!(ids("! a"), [Bang, Word]);
        assert_eq!(ids("!a"), [Word]);
        assert_eq!(scan(&["!a\n"])[0].value, "!a");
    }

    #[test]
    fn tokenizer_quoted_word_keeps_quotes_raw() {
        let tokens = scan(&["'a  b'\n"]);
        assert_eq!(tokens[0].id, TokenId::QuotedWord);
        assert_eq!(tokens[0].value, "'a  b'");
        assert_eq!(tokens[0].text(), "a  b");
    }

    #[test]
    fn tokenizer_unclosed_quote_is_scan_error() {
        let lines = vec!["'oops\n".to_string()];
        let mut tokenizer = Tokenizer::new(&lines);
        assert!(!tokenizer.next_is_eof());
        assert_eq!(tokenizer.next_token(), None);
    }

    #[test]
    fn tokenizer_dollar_paren() {
        use TokenId::*;
        assert_eq!(ids("a $(b)"), [Word, DollarParen, Word, CloseParen]);
        // A dollar sign not opening a substitution is an ordinary word
        // character.
        assert_eq!(ids("$HOME"), [Word]);
    }

    #[test]
    fn tokenizer_line_continuation() {
        use TokenId::*;
        assert_eq!(ids("a \\\n"), [Word, LineContinuation]);
        // A backslash inside a word escapes the next character instead.
        let tokens = scan(&["a\\ b\n"]);
        assert_eq!(tokens[0].value, "a\\ b");
        assert_eq!(tokens[0].text(), "a b");
    }

    #[test]
    fn tokenizer_offsets_span_lines() {
        let tokens = scan(&["ab\n", "cd\n"]);
        assert_eq!(tokens[0].start..tokens[0].end, 0..2);
        assert_eq!(tokens[1].start..tokens[1].end, 2..3);
        assert_eq!(tokens[2].start..tokens[2].end, 3..5);
        assert_eq!(tokens[3].start..tokens[3].end, 5..6);
    }

    #[test]
    fn tokenizer_peek_is_idempotent() {
        let lines = vec!["one two\n".to_string()];
        let mut tokenizer = Tokenizer::new(&lines);
        let first = tokenizer.peek();
        assert_eq!(tokenizer.peek(), first);
        assert_eq!(tokenizer.next_token(), first);
        assert_eq!(tokenizer.peek().map(|t| t.value), Some("two".to_string()));
    }

    #[test]
    fn tokenizer_snapshot_restores_position() {
        let lines = vec!["a b c\n".to_string()];
        let mut tokenizer = Tokenizer::new(&lines);
        tokenizer.next_token();
        let snapshot = tokenizer;
        tokenizer.next_token();
        tokenizer.next_token();
        let mut restored = snapshot;
        assert_eq!(restored.next_token().map(|t| t.value), Some("b".to_string()));
    }
}
