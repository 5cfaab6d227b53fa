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

//! Forking children with process-group and signal setup
//!
//! The [`Spawner`] copies the few shell and command-state fields it needs
//! up front, so that the child closure is free to borrow the executor.
//! Process-group assignment and terminal hand-off are performed on both
//! sides of the fork: either side may win the race, and both operations
//! are idempotent.

use nix::sys::signal::{signal, SigHandler, Signal};
use nix::unistd::{fork, getpid, getpgrp, setpgid, tcsetpgrp, ForkResult, Pid};
use std::os::unix::io::RawFd;
use testsh_env::job::ExecStats;
use testsh_env::Shell;

use crate::executor::CommandState;

/// What kind of child is being spawned
///
/// The kind selects the signal dispositions installed in the child.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpawnKind {
    /// An external command or a builtin running inside a pipeline
    Command,
    /// A subshell, including command substitution children
    Subshell,
    /// The child evaluating the right side of an asynchronous list
    AsyncList,
}

/// One-shot child process launcher
#[derive(Clone, Copy, Debug)]
pub struct Spawner {
    pgid: Pid,
    is_foreground: bool,
    is_interactive: bool,
    terminal: RawFd,
    kind: SpawnKind,
}

impl Spawner {
    /// Prepares a spawner for the given shell, command state and kind.
    pub fn new(shell: &Shell, state: &CommandState, kind: SpawnKind) -> Self {
        Spawner {
            pgid: state.pipeline_pgid,
            is_foreground: state.is_foreground,
            is_interactive: shell.is_interactive,
            terminal: shell.terminal,
            kind,
        }
    }

    /// Installs the signal dispositions of this spawn kind.
    fn set_signals(&self) {
        use SigHandler::{SigDfl, SigIgn};
        use Signal::*;
        let dispositions: [(Signal, SigHandler); 6] = match self.kind {
            SpawnKind::Command => [
                (SIGINT, SigDfl),
                (SIGQUIT, SigDfl),
                (SIGTSTP, SigDfl),
                (SIGTTIN, SigDfl),
                (SIGTTOU, SigDfl),
                (SIGCHLD, SigDfl),
            ],
            // A subshell must not be stopped by terminal signals.
            SpawnKind::Subshell => [
                (SIGINT, SigDfl),
                (SIGQUIT, SigDfl),
                (SIGTSTP, SigIgn),
                (SIGTTIN, SigIgn),
                (SIGTTOU, SigIgn),
                (SIGCHLD, SigDfl),
            ],
            // A backgrounded list ignores keyboard interrupts.
            SpawnKind::AsyncList => [
                (SIGINT, SigIgn),
                (SIGQUIT, SigDfl),
                (SIGTSTP, SigDfl),
                (SIGTTIN, SigIgn),
                (SIGTTOU, SigIgn),
                (SIGCHLD, SigDfl),
            ],
        };
        for (sig, handler) in dispositions {
            unsafe {
                let _ = signal(sig, handler);
            }
        }
    }

    /// Forks a child running `child_fn` and returns without waiting.
    ///
    /// The child exits with the closure's return value; the closure
    /// normally replaces the process image or exits itself. The returned
    /// stats carry the child's pid and the process group it joined, with
    /// `completed` still false.
    pub fn spawn(&self, child_fn: impl FnOnce() -> i32) -> ExecStats {
        let inherited_pgid = self.pgid;

        let fork_result = unsafe { fork() };
        let child = match fork_result {
            Err(errno) => {
                eprintln!("fork: {}", errno.desc());
                std::process::exit(1);
            }
            Ok(ForkResult::Child) => {
                if self.is_interactive {
                    // Put the process into its group and give the group
                    // the terminal. The parent does the same after the
                    // fork; duplicating the calls closes the race window.
                    let pid = getpid();
                    let pgid = if inherited_pgid.as_raw() != -1 {
                        inherited_pgid
                    } else {
                        pid
                    };
                    let _ = setpgid(pid, pgid);
                    // An asynchronous list cannot take the terminal.
                    if self.is_foreground && self.kind != SpawnKind::AsyncList {
                        let _ = tcsetpgrp(self.terminal, pgid);
                    }
                    self.set_signals();
                }
                std::process::exit(child_fn());
            }
            Ok(ForkResult::Parent { child }) => child,
        };

        let pgid;
        if self.is_interactive {
            pgid = if inherited_pgid.as_raw() != -1 {
                inherited_pgid
            } else {
                child
            };
            if let Err(errno) = setpgid(child, pgid) {
                eprintln!("setpgid({child}, {pgid}): {}", errno.desc());
            }
            if self.is_foreground && self.kind != SpawnKind::AsyncList {
                if let Err(errno) = tcsetpgrp(self.terminal, pgid) {
                    eprintln!("tcsetpgrp({}, {pgid}): {}", self.terminal, errno.desc());
                }
            }
        } else {
            pgid = getpgrp();
        }

        ExecStats::spawned(child, pgid)
    }
}
