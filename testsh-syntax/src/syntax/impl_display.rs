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

//! Reserialization of syntax trees to source text
//!
//! The produced text is canonical rather than byte-identical to the
//! original input: default file descriptors are omitted, duplication
//! redirects choose their operator by target descriptor, and list
//! separators are rendered as `;` and `&`. Parsing the output yields a
//! tree equivalent to the one it was produced from.

use super::*;
use itertools::Itertools as _;
use std::fmt;

impl fmt::Display for OpenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use OpenKind::*;
        f.write_str(match self {
            Read => "<",
            Replace => ">",
            Append => ">>",
            ReadWrite => "<>",
        })
    }
}

impl OpenKind {
    /// The descriptor the operator redirects when no IO number precedes
    /// it.
    pub fn default_fd(self) -> RawFd {
        use OpenKind::*;
        match self {
            Read | ReadWrite => 0,
            Replace | Append => 1,
        }
    }
}

impl fmt::Display for FileRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fd != self.kind.default_fd() {
            write!(f, "{}", self.fd)?;
        }
        write!(f, "{}{}", self.kind, self.filename)
    }
}

/// Writes the `fd`-and-operator prefix of a duplication redirect.
///
/// The descriptor selects the canonical operator: `<&` for standard
/// input, `>&` otherwise, with an explicit IO number for descriptors
/// other than 0 and 1.
fn write_dup_prefix(f: &mut fmt::Formatter<'_>, fd: RawFd) -> fmt::Result {
    match fd {
        0 => f.write_str("<&"),
        1 => f.write_str(">&"),
        _ => write!(f, "{fd}>&"),
    }
}

impl fmt::Display for FdRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_dup_prefix(f, self.fd)?;
        write!(f, "{}", self.source)
    }
}

impl fmt::Display for CloseFd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_dup_prefix(f, self.fd)?;
        f.write_str("-")
    }
}

impl fmt::Display for BadFdRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_dup_prefix(f, self.fd)?;
        f.write_str(&self.operand)
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Redirect::File(file) => file.fmt(f),
            Redirect::Fd(dup) => dup.fmt(f),
            Redirect::Close(close) => close.fmt(f),
            Redirect::BadFd(bad) => bad.fmt(f),
        }
    }
}

impl fmt::Display for AssignmentWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.whole.value)
    }
}

impl fmt::Display for CmdSub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$({})", self.body)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Plain(token) => f.write_str(&token.value),
            Word::CmdSub(sub) => sub.fmt(f),
        }
    }
}

impl fmt::Display for UnsubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assignments = self.assignments.iter().map(|a| a as &dyn fmt::Display);
        let program = std::iter::once(&self.program as &dyn fmt::Display);
        let arguments = self.arguments.iter().map(|w| w as &dyn fmt::Display);
        let redirections = self.redirections.iter().map(|r| r as &dyn fmt::Display);
        write!(
            f,
            "{}",
            assignments
                .chain(program)
                .chain(arguments)
                .chain(redirections)
                .format(" ")
        )
    }
}

impl fmt::Display for SimpleAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assignments = self.assignments.iter().map(|a| a as &dyn fmt::Display);
        let redirections = self.redirections.iter().map(|r| r as &dyn fmt::Display);
        write!(f, "{}", assignments.chain(redirections).format(" "))
    }
}

impl fmt::Display for Subshell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.body)?;
        self.redirections
            .iter()
            .try_for_each(|redirect| write!(f, " {redirect}"))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Simple(command) => command.fmt(f),
            Command::Assignment(assignment) => assignment.fmt(f),
            Command::Subshell(subshell) => subshell.fmt(f),
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("! ")?;
        }
        write!(f, "{}", self.commands.iter().format(" | "))
    }
}

impl fmt::Display for AndList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} && {}", self.left, self.right)
    }
}

impl fmt::Display for OrList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} || {}", self.left, self.right)
    }
}

impl fmt::Display for OpList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpList::And(list) => list.fmt(f),
            OpList::Or(list) => list.fmt(f),
            OpList::Pipeline(pipeline) => pipeline.fmt(f),
        }
    }
}

/// Writes the left spine of a list followed by the separator that joins
/// it to the right-hand side.
///
/// An asynchronous left spine already ends with `&`, which is itself a
/// separator, so no `;` is added after it.
fn write_left_spine(f: &mut fmt::Formatter<'_>, left: &Option<Box<List>>) -> fmt::Result {
    match left.as_deref() {
        None => Ok(()),
        Some(list @ List::Sequential(_)) => write!(f, "{list}; "),
        Some(list @ List::Async(_)) => write!(f, "{list} "),
    }
}

impl fmt::Display for SequentialList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_left_spine(f, &self.left)?;
        self.right.fmt(f)
    }
}

impl fmt::Display for AsyncList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_left_spine(f, &self.left)?;
        write!(f, "{} &", self.right)
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            List::Sequential(list) => list.fmt(f),
            List::Async(list) => list.fmt(f),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.commands.iter().format("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::{TokenSource, Tokenizer};
    use crate::parser::Parser;

    fn parse(source: &str) -> Program {
        let lines = vec![format!("{source}\n")];
        let mut parser = Parser::new(Tokenizer::new(&lines));
        parser.program().expect("source should parse")
    }

    fn round_trips(source: &str) {
        let program = parse(source);
        let serialized = program.to_string();
        assert_eq!(parse(&serialized), program, "serialized as {serialized:?}");
    }

    #[test]
    fn file_redirect_display_omits_default_fd() {
        let redirect = FileRedirect {
            fd: 1,
            kind: OpenKind::Replace,
            filename: "out".to_string(),
        };
        assert_eq!(redirect.to_string(), ">out");

        let redirect = FileRedirect {
            fd: 2,
            kind: OpenKind::Append,
            filename: "log".to_string(),
        };
        assert_eq!(redirect.to_string(), "2>>log");

        let redirect = FileRedirect {
            fd: 0,
            kind: OpenKind::ReadWrite,
            filename: "io".to_string(),
        };
        assert_eq!(redirect.to_string(), "<>io");
    }

    #[test]
    fn dup_redirect_display_chooses_operator_by_fd() {
        assert_eq!(FdRedirect { fd: 0, source: 3 }.to_string(), "<&3");
        assert_eq!(FdRedirect { fd: 1, source: 2 }.to_string(), ">&2");
        assert_eq!(FdRedirect { fd: 2, source: 1 }.to_string(), "2>&1");
        assert_eq!(CloseFd { fd: 0 }.to_string(), "<&-");
        assert_eq!(CloseFd { fd: 1 }.to_string(), ">&-");
        assert_eq!(CloseFd { fd: 5 }.to_string(), "5>&-");
    }

    #[test]
    fn simple_command_display() {
        let program = parse("V=1 env x >out");
        assert_eq!(program.to_string(), "V=1 env x >out");
    }

    #[test]
    fn pipeline_display() {
        assert_eq!(parse("a | b | c").to_string(), "a | b | c");
        assert_eq!(parse("! a | b").to_string(), "! a | b");
    }

    #[test]
    fn list_display_separators() {
        assert_eq!(parse("a; b; c").to_string(), "a; b; c");
        assert_eq!(parse("a & b").to_string(), "a & b");
        assert_eq!(parse("a & b &").to_string(), "a & b &");
        assert_eq!(parse("a && b || c").to_string(), "a && b || c");
    }

    #[test]
    fn subshell_display() {
        assert_eq!(parse("(a; b) >out").to_string(), "(a; b) >out");
    }

    #[test]
    fn cmdsub_display() {
        assert_eq!(parse("echo $(echo a)").to_string(), "echo $(echo a)");
    }

    #[test]
    fn display_output_reparses_to_equivalent_tree() {
        round_trips("echo hello world");
        round_trips("'a b' c\\ d");
        round_trips("false && echo x; echo y");
        round_trips("a | b || c && d");
        round_trips("! true");
        round_trips("cmd <in >out 2>>log 2>&1 <&- 3<>both");
        round_trips("V=1 W=2 env >out");
        round_trips("V=1");
        round_trips("(a | b; c) >out");
        round_trips("sleep 10 &");
        round_trips("a & b & c");
        round_trips("echo $(echo nested; echo more)");
        round_trips("echo $(a | b) tail");
    }

    #[test]
    fn tokenizing_display_output_succeeds() {
        let program = parse("a && b; c | d &");
        let lines = vec![format!("{program}\n")];
        let mut tokenizer = Tokenizer::new(&lines);
        while !tokenizer.next_is_eof() {
            assert!(tokenizer.next_token().is_some());
        }
    }
}
