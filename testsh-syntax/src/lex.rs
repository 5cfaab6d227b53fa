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

//! Lexical analysis
//!
//! This module defines the token model ([`Token`], [`TokenId`]) and the
//! [`TokenSource`] interface the parser consumes tokens through. Two
//! concrete sources are provided: [`Tokenizer`], which scans a slice of
//! buffered input lines, and [`TokenIter`], which iterates a
//! pre-materialized token vector.
//!
//! A token source must be cheaply cloneable: the parser snapshots the
//! cursor before a speculative production and restores the snapshot when
//! the production fails.

mod core;
mod iter;
mod token;

pub use self::core::{TokenSource, Tokenizer};
pub use self::iter::TokenIter;
pub use self::token::{Token, TokenId};
