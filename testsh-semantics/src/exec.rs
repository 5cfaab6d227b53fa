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

//! Building argv/envp and replacing the child image
//!
//! [`SimpleCommand`] is the fully substituted form of a simple command:
//! every command substitution has been expanded, so program and arguments
//! are plain strings. [`Exec`] turns such a command into the
//! nul-terminated argv and envp vectors passed to `execvpe`.

use nix::errno::Errno;
use nix::unistd::execvpe;
use std::collections::HashSet;
use std::ffi::{CString, NulError};
use testsh_env::Shell;
use testsh_syntax::syntax::{AssignmentWord, Redirect};

/// Simple command with all substitutions expanded
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SimpleCommand {
    /// Program name
    pub program: String,
    /// Arguments, not including the program name
    pub arguments: Vec<String>,
    /// Redirections, in parse order
    pub redirections: Vec<Redirect>,
    /// Prefix assignments forming the command environment
    pub assignments: Vec<AssignmentWord>,
}

impl SimpleCommand {
    /// Single-line rendering of program and arguments, for diagnostics.
    pub fn text(&self) -> String {
        let mut text = self.program.clone();
        for argument in &self.arguments {
            text.push(' ');
            text.push_str(argument);
        }
        text
    }
}

/// Prepared argv and envp vectors for one command
#[derive(Debug)]
pub struct Exec {
    argv: Vec<CString>,
    envp: Vec<CString>,
}

impl Exec {
    /// Builds the vectors for the given command.
    ///
    /// The environment starts from every external shell variable whose
    /// name is not overridden by a prefix assignment; the prefix
    /// assignments are then appended in reverse order, skipping names
    /// already emitted, so that the last occurrence of a duplicated name
    /// wins.
    pub fn new(command: &SimpleCommand, shell: &Shell) -> Result<Self, NulError> {
        let mut argv = Vec::with_capacity(command.arguments.len() + 1);
        argv.push(CString::new(command.program.as_str())?);
        for argument in &command.arguments {
            argv.push(CString::new(argument.as_str())?);
        }

        let mut overridden: HashSet<&str> = command
            .assignments
            .iter()
            .map(|assignment| assignment.name.as_str())
            .collect();

        let mut envp = Vec::new();
        for variable in shell.vars.iter() {
            if !variable.external {
                continue;
            }
            if overridden.contains(variable.name()) {
                continue;
            }
            envp.push(CString::new(variable.raw())?);
        }
        for assignment in command.assignments.iter().rev() {
            if !overridden.remove(assignment.name.as_str()) {
                continue;
            }
            envp.push(CString::new(assignment.whole.text())?);
        }

        Ok(Exec { argv, envp })
    }

    /// The prepared argument vector, program name first.
    pub fn argv(&self) -> &[CString] {
        &self.argv
    }

    /// The prepared environment vector.
    pub fn envp(&self) -> &[CString] {
        &self.envp
    }

    /// Replaces the process image, searching `PATH` for the program.
    ///
    /// Only returns on failure.
    pub fn exec(&self) -> Errno {
        match execvpe(&self.argv[0], &self.argv, &self.envp) {
            Err(errno) => errno,
            Ok(infallible) => match infallible {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testsh_env::variable::VariableSet;
    use testsh_syntax::lex::{Token, TokenId};

    fn assignment(raw: &str) -> AssignmentWord {
        let eq = raw.find('=').unwrap();
        AssignmentWord {
            whole: Token {
                id: TokenId::Word,
                value: raw.to_string(),
                start: 0,
                end: raw.len(),
            },
            name: raw[..eq].to_string(),
            value: raw[eq + 1..].to_string(),
        }
    }

    fn shell_with_vars(entries: &[(&str, bool)]) -> Shell {
        let mut vars = VariableSet::default();
        for (raw, external) in entries {
            vars.upsert(raw.to_string(), Some(*external));
        }
        let mut shell = Shell::new();
        shell.is_interactive = false;
        shell.vars = vars;
        shell
    }

    fn command(program: &str, assignments: Vec<AssignmentWord>) -> SimpleCommand {
        SimpleCommand {
            program: program.to_string(),
            arguments: vec!["arg".to_string()],
            redirections: vec![],
            assignments,
        }
    }

    fn envp_strings(exec: &Exec) -> Vec<String> {
        exec.envp()
            .iter()
            .map(|entry| entry.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn exec_argv_is_program_then_arguments() {
        let shell = shell_with_vars(&[]);
        let exec = Exec::new(&command("prog", vec![]), &shell).unwrap();
        let argv: Vec<&str> = exec.argv().iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(argv, ["prog", "arg"]);
    }

    #[test]
    fn exec_envp_only_external_variables() {
        let shell = shell_with_vars(&[("EXT=1", true), ("LOCAL=2", false)]);
        let exec = Exec::new(&command("prog", vec![]), &shell).unwrap();
        assert_eq!(envp_strings(&exec), ["EXT=1"]);
    }

    #[test]
    fn exec_envp_prefix_assignment_overrides_external() {
        let shell = shell_with_vars(&[("V=old", true), ("KEEP=1", true)]);
        let exec = Exec::new(&command("prog", vec![assignment("V=new")]), &shell).unwrap();
        let mut envp = envp_strings(&exec);
        envp.sort();
        assert_eq!(envp, ["KEEP=1", "V=new"]);
    }

    #[test]
    fn exec_envp_last_duplicate_assignment_wins() {
        let shell = shell_with_vars(&[]);
        let assignments = vec![assignment("V=first"), assignment("V=second")];
        let exec = Exec::new(&command("prog", assignments), &shell).unwrap();
        assert_eq!(envp_strings(&exec), ["V=second"]);
    }

    #[test]
    fn exec_rejects_interior_nul() {
        let shell = shell_with_vars(&[]);
        let command = SimpleCommand {
            program: "pr\0og".to_string(),
            arguments: vec![],
            redirections: vec![],
            assignments: vec![],
        };
        assert!(Exec::new(&command, &shell).is_err());
    }

    #[test]
    fn simple_command_text_joins_words() {
        let command = command("echo", vec![]);
        assert_eq!(command.text(), "echo arg");
    }
}
