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

//! This crate implements the execution semantics of testsh.
//!
//! The [`Executor`](executor::Executor) walks a syntax tree produced by
//! `testsh-syntax` and realizes it as a graph of processes, pipes and
//! file descriptors. It composes three smaller pieces:
//!
//! * the [redirect controller](redir::RedirGuard), which acquires file
//!   descriptors for a command's redirections and owns their lifetime,
//! * the [spawner](spawn::Spawner), which forks a child, sets up its
//!   process group, terminal foreground and signal dispositions,
//! * the [waiter](wait::Waiter), which reconciles child status changes
//!   via `waitpid` and manages the terminal hand-off.
//!
//! The [`builtin`] module provides the job-control builtins (`bg`, `cd`,
//! `exec`, `exit`, `fg`, `jobs`), and [`exec`] builds the argv/envp
//! vectors handed to `execvpe`.

pub mod builtin;
pub mod exec;
pub mod executor;
pub mod redir;
pub mod spawn;
pub mod wait;

use nix::errno::Errno;
use testsh_env::job::Pid;

/// Result of an execution-layer operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors of the execution layer
///
/// Apart from [`ParseFailed`](Error::ParseFailed), which is recoverable
/// at the input boundary, these errors are fatal: the shell reports them
/// and aborts without attempting to recover its state.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The input could not be parsed as a program.
    #[error("Parsing failed!")]
    ParseFailed,
    /// `waitpid` failed for a job's process group.
    #[error("waitpid({pgid}): {}", errno.desc())]
    Wait {
        /// Process group that was being waited for
        pgid: Pid,
        /// Error reported by the system
        errno: Errno,
    },
    /// `waitpid` reported a process that is not part of the awaited job.
    #[error("pid={pid} is not part of pgid={pgid}")]
    UnknownChild {
        /// Process the status was reported for
        pid: Pid,
        /// Process group that was being waited for
        pgid: Pid,
    },
    /// A pipe could not be created.
    #[error("pipe: {}", .0.desc())]
    Pipe(Errno),
}
