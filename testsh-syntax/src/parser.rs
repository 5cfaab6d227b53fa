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

//! Syntax parser
//!
//! The parser is recursive-descent with single-token lookahead. Each
//! grammar production is a method on [`Parser`] that returns
//! `Option<Node>`; when a production fails, it restores the token cursor
//! to where it started, so callers can try the next alternative without
//! any bookkeeping. Backtracking is bounded: every production tries at
//! most a constant number of alternatives.
//!
//! The entry point for a whole buffered input is [`Parser::program`]. A
//! `None` result from it means the input is not a program of the
//! supported language; the caller reports the failure and discards the
//! input. The parser itself never touches any state outside the cursor.

mod command;
mod core;
mod list;
mod pipeline;
mod redir;
mod simple_command;

pub use self::core::Parser;
