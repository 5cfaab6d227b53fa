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

//! This crate defines the command language syntax used by testsh.
//!
//! The [`lex`] module provides the token model and two token sources that
//! yield tokens over buffered input. The [`syntax`] module contains types
//! that represent abstract syntax trees (ASTs) of the supported language
//! subset: sequential and asynchronous lists, and-or lists, pipelines,
//! simple commands, subshells, redirections, assignment words, and command
//! substitutions. The [`parser`] module implements a recursive-descent
//! parser with single-token lookahead that builds such trees from a token
//! source.
//!
//! Most AST types support the [`Display`](std::fmt::Display) trait, which
//! reserializes a tree to source code that parses back to an equivalent
//! tree.

pub mod lex;
pub mod parser;
pub mod syntax;
