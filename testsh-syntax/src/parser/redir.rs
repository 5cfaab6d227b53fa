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

//! Syntax parser for redirections

use super::core::Parser;
use crate::lex::{TokenId, TokenSource};
use crate::syntax::{
    BadFdRedirect, CloseFd, FdRedirect, FileRedirect, OpenKind, Redirect,
};
#[cfg(unix)]
use std::os::unix::io::RawFd;

#[cfg(not(unix))]
type RawFd = i32;

/// Classifies the operand of a `<&`/`>&` redirection.
///
/// A numeric operand duplicates that descriptor, `-` closes the target
/// descriptor, and anything else is kept as written so that the command
/// can be failed when the redirection is applied.
fn dup_redirect(fd: RawFd, operand: String) -> Redirect {
    if let Ok(source) = operand.parse() {
        Redirect::Fd(FdRedirect { fd, source })
    } else if operand == "-" {
        Redirect::Close(CloseFd { fd })
    } else {
        Redirect::BadFd(BadFdRedirect { fd, operand })
    }
}

impl<T: TokenSource> Parser<T> {
    /// Parses `redirect_list := io_redirect+`.
    pub fn redirect_list(&mut self) -> Option<Vec<Redirect>> {
        let first = self.io_redirect()?;
        let mut redirections = vec![first];
        while let Some(next) = self.io_redirect() {
            redirections.push(next);
        }
        Some(redirections)
    }

    /// Parses `io_redirect := IO_NUMBER? io_file`.
    ///
    /// A leading IO number replaces the default target descriptor of the
    /// following redirection.
    pub fn io_redirect(&mut self) -> Option<Redirect> {
        let snapshot = self.snapshot();
        let io_number = self.take(TokenId::IoNumber);
        let Some(mut redirect) = self.io_file() else {
            self.restore(snapshot);
            return None;
        };
        if let Some(number) = io_number {
            match number.value.parse() {
                Ok(fd) => redirect.set_fd(fd),
                Err(_) => {
                    self.restore(snapshot);
                    return None;
                }
            }
        }
        Some(redirect)
    }

    /// Parses `io_file := ('<'|'>'|'>>'|'<>'|'<&'|'>&') filename`.
    fn io_file(&mut self) -> Option<Redirect> {
        use TokenId::*;
        let snapshot = self.snapshot();
        let operator = self.peek()?;
        let (fd, kind) = match operator.id {
            Less => (0, Some(OpenKind::Read)),
            Great => (1, Some(OpenKind::Replace)),
            DGreat => (1, Some(OpenKind::Append)),
            LessGreat => (0, Some(OpenKind::ReadWrite)),
            LessAnd => (0, None),
            GreatAnd => (1, None),
            _ => return None,
        };
        self.take(operator.id);
        let Some(filename) = self.filename() else {
            self.restore(snapshot);
            return None;
        };
        Some(match kind {
            Some(kind) => Redirect::File(FileRedirect { fd, kind, filename }),
            None => dup_redirect(fd, filename),
        })
    }

    /// Parses `filename := WORD`, yielding its textual value.
    fn filename(&mut self) -> Option<String> {
        let token = self
            .take(TokenId::Word)
            .or_else(|| self.take(TokenId::QuotedWord))
            .or_else(|| self.take(TokenId::Number))?;
        Some(token.text())
    }
}
