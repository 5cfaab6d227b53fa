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

//! The syntax tree walker
//!
//! The [`Executor`] owns the [`Shell`] and the background-job list and
//! has one method per syntax-node kind. Each method takes the node plus a
//! [`CommandState`] and returns either an [`ExecStats`] or a richer
//! [`ListStats`].
//!
//! Ordering follows the tree: within an and-or chain, the right side is
//! never started before the left has reported its final status; within a
//! sequential list, the next child is spawned strictly after the previous
//! one was waited for (or recorded, for asynchronous lists). Pipeline
//! children all join the process group reported by the first spawn.

use crate::builtin;
use crate::exec::{Exec, SimpleCommand};
use crate::redir::RedirGuard;
use crate::spawn::{SpawnKind, Spawner};
use crate::wait::Waiter;
use crate::{Error, Result};
use nix::errno::Errno;
use nix::unistd::{close, dup2, getpid, getpgrp, pipe, read, Pid};
use std::os::unix::io::RawFd;
use testsh_env::job::{ExecStats, Job, Signal};
use testsh_env::Shell;
use testsh_syntax::lex::{TokenSource, Tokenizer};
use testsh_syntax::parser::Parser;
use testsh_syntax::syntax::{
    AndList, AsyncList, CmdSub, Command, List, OpList, OrList, Pipeline, Program,
    SequentialList, SimpleAssignment, Subshell, UnsubCommand, Word,
};

/// State propagated down the tree to each command
///
/// It carries the inherited pipe wiring, the parent-side close list, and
/// the pipeline process group the next spawn should join (-1 when no
/// pipeline group exists yet).
#[derive(Clone, Debug)]
pub struct CommandState {
    /// Inherited (target, source) descriptor pairs, typically pipe ends
    pub redirects: Vec<(RawFd, RawFd)>,
    /// Descriptors the child must close before running
    pub fds_to_close: Vec<RawFd>,
    /// Whether the command may own the terminal
    pub is_foreground: bool,
    /// Whether the command is an interior member of a pipeline
    pub inside_pipeline: bool,
    /// Process group of the enclosing pipeline, or -1
    pub pipeline_pgid: Pid,
}

impl Default for CommandState {
    fn default() -> Self {
        CommandState {
            redirects: Vec::new(),
            fds_to_close: Vec::new(),
            is_foreground: true,
            inside_pipeline: false,
            pipeline_pgid: Pid::from_raw(-1),
        }
    }
}

/// Result of evaluating a list node
#[derive(Debug)]
pub struct ListStats {
    /// Outcome of the last element of the list
    pub last_stats: ExecStats,
    /// Jobs the list put into the background
    pub bg_jobs: Vec<Job>,
}

impl ListStats {
    fn new() -> Self {
        ListStats {
            last_stats: ExecStats::shallow(getpid()),
            bg_jobs: Vec::new(),
        }
    }
}

/// Tree-walking realization of parsed programs as processes
#[derive(Debug)]
pub struct Executor {
    /// Process-wide shell state
    pub shell: Shell,
    /// Background jobs, mutated only by the shell's main task
    pub bg_jobs: Vec<Job>,
}

impl Executor {
    /// Creates an executor around the given shell state.
    pub fn new(shell: Shell) -> Self {
        Executor {
            shell,
            bg_jobs: Vec::new(),
        }
    }

    /// Tokenizes, parses and runs one buffered input.
    ///
    /// Empty input yields a successful no-op outcome. A parse failure is
    /// reported as [`Error::ParseFailed`] without touching any state.
    pub fn execute(&mut self, lines: &[String]) -> Result<ExecStats> {
        let tokens = Tokenizer::new(lines);
        if tokens.next_is_eof() {
            return Ok(ExecStats::shallow(getpid()));
        }
        let mut parser = Parser::new(tokens);
        let Some(program) = parser.program() else {
            return Err(Error::ParseFailed);
        };
        self.run_program(&program)
    }

    /// Runs every complete command of a program.
    ///
    /// The returned stats are always those of the last list run.
    pub fn run_program(&mut self, program: &Program) -> Result<ExecStats> {
        let mut last_stats = ExecStats::shallow(getpid());
        for list in &program.commands {
            let stats = self.list(list, &CommandState::default())?;
            self.bg_jobs.extend(stats.bg_jobs);
            last_stats = stats.last_stats;
        }
        Ok(last_stats)
    }

    /// Evaluates a list node.
    pub fn list(&mut self, list: &List, state: &CommandState) -> Result<ListStats> {
        match list {
            List::Sequential(list) => self.sequential_list(list, state),
            List::Async(list) => self.async_list(list, state),
        }
    }

    /// Evaluates the left spine, then the right element synchronously.
    fn sequential_list(
        &mut self,
        list: &SequentialList,
        state: &CommandState,
    ) -> Result<ListStats> {
        let mut stats = match &list.left {
            Some(left) => self.list(left, state)?,
            None => ListStats::new(),
        };
        stats.last_stats = self.op_list(&list.right, state)?;
        Ok(stats)
    }

    /// Evaluates the left spine synchronously, then forks a child that
    /// runs the right element in the background.
    ///
    /// The child gets its own command state with `pipeline_pgid` set to
    /// its own process group and `is_foreground` cleared. It clears the
    /// background-job list inherited from the parent (its copy lives in
    /// its own address space) and drains its own background jobs before
    /// exiting, so that a stopped child cannot outlive the asynchronous
    /// scope unobserved.
    fn async_list(&mut self, list: &AsyncList, state: &CommandState) -> Result<ListStats> {
        let mut stats = match &list.left {
            Some(left) => self.list(left, state)?,
            None => ListStats::new(),
        };

        let spawner = Spawner::new(&self.shell, state, SpawnKind::AsyncList);
        let mut async_stats = spawner.spawn(|| {
            let mut async_state = state.clone();
            async_state.pipeline_pgid = getpgrp();
            async_state.is_foreground = false;

            self.bg_jobs.clear();

            let exit_code = match self.op_list(&list.right, &async_state) {
                Ok(stats) => stats.exit_code,
                Err(error) => {
                    eprintln!("testsh: {error}");
                    1
                }
            };

            // Wait for any background job before terminating, e.g. a
            // `cat &` stopped by SIGTTIN while reading from the terminal.
            while !self.bg_jobs.is_empty() {
                let waiter = Waiter::new(&self.shell);
                for job in &mut self.bg_jobs {
                    if let Err(error) = waiter.wait_inside_async(job) {
                        eprintln!("testsh: {error}");
                        return 1;
                    }
                }
                self.bg_jobs.retain(|job| !job.completed());
            }

            exit_code
        });

        async_stats.in_background = true;
        eprintln!("{}: Background {async_stats:?}", async_stats.pid);

        let mut job = Job::new();
        job.add(async_stats);
        stats.last_stats = job.exec_stats();
        stats.bg_jobs.push(job);
        Ok(stats)
    }

    /// Evaluates an and-or chain element.
    pub fn op_list(&mut self, list: &OpList, state: &CommandState) -> Result<ExecStats> {
        match list {
            OpList::And(list) => self.and_list(list, state),
            OpList::Or(list) => self.or_list(list, state),
            OpList::Pipeline(pipeline) => self.wait_pipeline(pipeline, state),
        }
    }

    fn and_list(&mut self, list: &AndList, state: &CommandState) -> Result<ExecStats> {
        let left = self.op_list(&list.left, state)?;
        // A left side terminated by SIGINT aborts the whole chain.
        if left.signaled == Some(Signal::SIGINT) {
            return Ok(left);
        }
        if left.exit_code != 0 {
            return Ok(left);
        }
        self.op_list(&list.right, state)
    }

    fn or_list(&mut self, list: &OrList, state: &CommandState) -> Result<ExecStats> {
        let left = self.op_list(&list.left, state)?;
        if left.signaled == Some(Signal::SIGINT) {
            return Ok(left);
        }
        if left.exit_code == 0 {
            return Ok(left);
        }
        self.op_list(&list.right, state)
    }

    /// Spawns every command of a pipeline, wiring N-1 pipes.
    ///
    /// Interior commands write into their pipe and read the previous one;
    /// the last command only reads. All children join the process group
    /// reported by the first spawn. The parent-side pipe ends are closed
    /// by each command's redirect guard as soon as the command has been
    /// spawned.
    fn pipeline(&mut self, pipeline: &Pipeline, state: &CommandState) -> Result<Job> {
        debug_assert!(!pipeline.commands.is_empty());

        let mut job = Job::new();
        let mut pipeline_pgid = state.pipeline_pgid;
        let mut prev_reader: Option<RawFd> = None;

        let interior = pipeline.commands.len() - 1;
        for command in &pipeline.commands[..interior] {
            let (reader, writer) = pipe().map_err(Error::Pipe)?;

            let mut redirects = Vec::new();
            if let Some(prev) = prev_reader {
                redirects.push((0, prev));
            }
            redirects.push((1, writer));

            let stats = self.command(
                command,
                &CommandState {
                    redirects,
                    fds_to_close: vec![reader],
                    is_foreground: state.is_foreground,
                    inside_pipeline: true,
                    pipeline_pgid,
                },
            )?;
            pipeline_pgid = stats.pgid;
            job.add(stats);
            prev_reader = Some(reader);
        }

        let mut redirects = Vec::new();
        if let Some(prev) = prev_reader {
            redirects.push((0, prev));
        }
        let stats = self.command(
            &pipeline.commands[interior],
            &CommandState {
                redirects,
                fds_to_close: Vec::new(),
                is_foreground: state.is_foreground,
                inside_pipeline: false,
                pipeline_pgid,
            },
        )?;
        job.add(stats);

        Ok(job)
    }

    /// Runs a pipeline and waits for its job.
    ///
    /// A job stopped while waiting moves into the background-job list.
    /// The aggregate exit code is the last command's, inverted when the
    /// pipeline is negated.
    fn wait_pipeline(&mut self, pipeline: &Pipeline, state: &CommandState) -> Result<ExecStats> {
        let mut job = self.pipeline(pipeline, state)?;
        Waiter::new(&self.shell).wait(&mut job)?;

        let stopped = job.stopped() && !job.completed();
        let mut stats = job.exec_stats();
        if stopped {
            self.bg_jobs.push(job);
        }

        if pipeline.negated {
            stats.exit_code = if stats.exit_code != 0 { 0 } else { 1 };
        }
        Ok(stats)
    }

    /// Evaluates a command node.
    pub fn command(&mut self, command: &Command, state: &CommandState) -> Result<ExecStats> {
        match command {
            Command::Simple(command) => self.unsub_command(command, state),
            Command::Assignment(assignment) => self.simple_assignment(assignment, state),
            Command::Subshell(subshell) => self.subshell(subshell, state),
        }
    }

    /// Substitutes a word into its plain textual value.
    fn word_text(&mut self, word: &Word, state: &CommandState) -> Result<String> {
        match word {
            Word::Plain(token) => Ok(token.text()),
            Word::CmdSub(sub) => self.cmdsub(sub, state),
        }
    }

    /// Expands the command substitutions of a simple command, then runs
    /// the expanded form.
    fn unsub_command(&mut self, command: &UnsubCommand, state: &CommandState) -> Result<ExecStats> {
        let program = self.word_text(&command.program, state)?;
        let arguments = command
            .arguments
            .iter()
            .map(|word| self.word_text(word, state))
            .collect::<Result<Vec<_>>>()?;

        let expanded = SimpleCommand {
            program,
            arguments,
            redirections: command.redirections.clone(),
            assignments: command.assignments.clone(),
        };
        self.simple_command(&expanded, state)
    }

    /// Runs a fully substituted simple command.
    ///
    /// A builtin runs synchronously in the shell process unless the
    /// command sits inside a pipeline, in which case it is forked so the
    /// pipe wiring still applies. Anything else is forked and exec'd.
    fn simple_command(&mut self, command: &SimpleCommand, state: &CommandState) -> Result<ExecStats> {
        // The guard closes the parent-side pipe ends when it goes out of
        // scope; the opened descriptors only matter to the child.
        let mut redirect = RedirGuard::new(state);
        let spawner = Spawner::new(&self.shell, state, SpawnKind::Command);

        if !redirect.add_redirects(&command.redirections) {
            return Ok(ExecStats::error());
        }

        if builtin::is_builtin(command) {
            if state.inside_pipeline {
                return Ok(spawner.spawn(|| {
                    if !redirect.apply_redirections() {
                        return 1;
                    }
                    match self.builtin(command) {
                        Ok(Some(stats)) => stats.exit_code,
                        Ok(None) => 1,
                        Err(error) => {
                            eprintln!("testsh: {error}");
                            1
                        }
                    }
                }));
            }
            let stats = self.builtin(command)?;
            return Ok(stats.unwrap_or_else(ExecStats::error));
        }

        let shell = &self.shell;
        Ok(spawner.spawn(|| {
            if !redirect.apply_redirections() {
                return 1;
            }
            let exec = match Exec::new(command, shell) {
                Ok(exec) => exec,
                Err(_) => {
                    eprintln!("testsh: {}: invalid argument", command.program);
                    return 1;
                }
            };
            let errno = exec.exec();
            eprintln!("testsh: {}: {}", command.program, errno.desc());
            1
        }))
    }

    /// Dispatches a builtin, or returns `None` for other programs.
    fn builtin(&mut self, command: &SimpleCommand) -> Result<Option<ExecStats>> {
        let exit_code = match command.program.as_str() {
            "bg" => {
                let waiter = Waiter::new(&self.shell);
                builtin::bg(command, &mut self.bg_jobs, &waiter)
            }
            "cd" => builtin::cd(command),
            "exec" => builtin::exec(command),
            "exit" => builtin::exit(command),
            "fg" => {
                let waiter = Waiter::new(&self.shell);
                builtin::fg(command, &mut self.bg_jobs, &waiter)?
            }
            "jobs" => builtin::jobs(command, &self.bg_jobs),
            _ => return Ok(None),
        };

        let mut stats = ExecStats::shallow(getpid());
        stats.exit_code = exit_code;
        Ok(Some(stats))
    }

    /// Applies the assignments of a prefix-only command.
    ///
    /// Inside a pipeline the assignment runs in a child, where it cannot
    /// affect the parent shell. Otherwise it updates the shell variables
    /// in place.
    fn simple_assignment(
        &mut self,
        assignment: &SimpleAssignment,
        state: &CommandState,
    ) -> Result<ExecStats> {
        let mut redirect = RedirGuard::new(state);
        let spawner = Spawner::new(&self.shell, state, SpawnKind::Command);

        if !redirect.add_redirects(&assignment.redirections) {
            return Ok(ExecStats::error());
        }

        if state.inside_pipeline {
            return Ok(spawner.spawn(|| {
                for word in &assignment.assignments {
                    self.shell.vars.upsert(word.whole.text(), None);
                }
                0
            }));
        }

        for word in &assignment.assignments {
            self.shell.vars.upsert(word.whole.text(), None);
        }
        Ok(ExecStats::shallow(getpid()))
    }

    /// Runs a subshell node in a forked child.
    fn subshell(&mut self, subshell: &Subshell, state: &CommandState) -> Result<ExecStats> {
        let mut redirect = RedirGuard::new(state);
        let spawner = Spawner::new(&self.shell, state, SpawnKind::Subshell);

        if !redirect.add_redirects(&subshell.redirections) {
            return Ok(ExecStats::error());
        }

        Ok(spawner.spawn(|| {
            if !redirect.apply_redirections() {
                return 1;
            }
            let inner = CommandState {
                is_foreground: state.is_foreground,
                pipeline_pgid: state.pipeline_pgid,
                ..CommandState::default()
            };
            match self.list(&subshell.body, &inner) {
                Ok(stats) => stats.last_stats.exit_code,
                Err(error) => {
                    eprintln!("testsh: {error}");
                    1
                }
            }
        }))
    }

    /// Captures the output of a command substitution.
    ///
    /// A subshell-kind child evaluates the inner list with its standard
    /// output redirected into a pipe; the parent closes the write end,
    /// reads everything, strips exactly one trailing newline, and reaps
    /// the child.
    fn cmdsub(&mut self, sub: &CmdSub, state: &CommandState) -> Result<String> {
        let spawner = Spawner::new(&self.shell, state, SpawnKind::Subshell);
        let (reader, writer) = pipe().map_err(Error::Pipe)?;

        let child_stats = spawner.spawn(|| {
            let _ = close(reader);
            let _ = dup2(writer, 1);
            let _ = close(writer);
            match self.list(&sub.body, state) {
                Ok(stats) => stats.last_stats.exit_code,
                Err(error) => {
                    eprintln!("testsh: {error}");
                    1
                }
            }
        });

        let _ = close(writer);

        let mut output = Vec::new();
        let mut buffer = [0u8; 4096];
        loop {
            match read(reader, &mut buffer) {
                Ok(0) => break,
                Ok(count) => output.extend_from_slice(&buffer[..count]),
                Err(Errno::EINTR) => continue,
                Err(_) => break,
            }
        }
        let _ = close(reader);

        let mut output = String::from_utf8_lossy(&output).into_owned();
        if output.ends_with('\n') {
            output.pop();
        }

        // The child has usually terminated already; collect it so no
        // zombie is left behind.
        let mut job = Job::new();
        job.add(child_stats);
        Waiter::new(&self.shell).wait(&mut job)?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(source: &str) -> Vec<String> {
        vec![format!("{source}\n")]
    }

    fn executor() -> Executor {
        let mut shell = Shell::new();
        shell.is_interactive = false;
        Executor::new(shell)
    }

    #[test]
    fn execute_empty_input_is_success() {
        let mut executor = executor();
        let stats = executor.execute(&lines("")).unwrap();
        assert_eq!(stats.exit_code, 0);
        assert!(stats.completed);
    }

    #[test]
    fn execute_reports_parse_failure() {
        let mut executor = executor();
        assert_eq!(executor.execute(&lines("echo )")), Err(Error::ParseFailed));
        assert_eq!(
            executor.execute(&lines("echo )")).unwrap_err().to_string(),
            "Parsing failed!"
        );
    }

    #[test]
    fn top_level_assignment_updates_shell_vars() {
        let mut executor = executor();
        let stats = executor.execute(&lines("GREETING=hello")).unwrap();
        assert_eq!(stats.exit_code, 0);
        assert!(stats.completed);
        let variable = executor.shell.vars.get("GREETING").unwrap();
        assert_eq!(variable.value(), "hello");
        assert!(!variable.external);
    }

    #[test]
    fn later_assignment_overwrites_earlier() {
        let mut executor = executor();
        executor.execute(&lines("A=1; A=2")).unwrap();
        assert_eq!(executor.shell.vars.get("A").unwrap().value(), "2");
    }

    #[test]
    fn assignment_word_value_unescaped() {
        let mut executor = executor();
        executor.execute(&lines(r"A=a\ b")).unwrap();
        assert_eq!(executor.shell.vars.get("A").unwrap().value(), "a b");
    }
}
