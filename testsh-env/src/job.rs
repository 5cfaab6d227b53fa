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

//! Type definitions for job management
//!
//! A [`Job`] is the set of processes spawned for one pipeline or
//! asynchronous list, sharing one process group. The outcome of each
//! process is tracked as an [`ExecStats`].

#[doc(no_inline)]
pub use nix::sys::signal::Signal;
#[doc(no_inline)]
pub use nix::unistd::Pid;
use nix::sys::termios::{tcgetattr, tcsetattr, SetArg, Termios};
use std::collections::HashMap;
use std::os::unix::io::RawFd;

/// Outcome of launching one command
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExecStats {
    /// Exit status of the command
    pub exit_code: i32,
    /// Process ID of the child, or -1 if no child was forked
    pub pid: Pid,
    /// Process group of the pipeline the command joined, or -1
    pub pgid: Pid,
    /// Whether the process has terminated
    pub completed: bool,
    /// Whether the process is stopped by a signal
    pub stopped: bool,
    /// Whether the process runs in the background
    pub in_background: bool,
    /// Signal that terminated the process, if any
    pub signaled: Option<Signal>,
}

impl ExecStats {
    /// Outcome of a command that failed before it could be started.
    ///
    /// Downstream evaluation treats this identically to a normally-exited
    /// failing command.
    pub fn error() -> Self {
        ExecStats {
            exit_code: 1,
            pid: Pid::from_raw(-1),
            pgid: Pid::from_raw(-1),
            completed: true,
            stopped: false,
            in_background: false,
            signaled: None,
        }
    }

    /// Outcome of an operation that ran inside the shell process itself,
    /// such as a builtin or a variable assignment.
    pub fn shallow(pid: Pid) -> Self {
        ExecStats {
            exit_code: 0,
            pid,
            pgid: Pid::from_raw(-1),
            completed: true,
            stopped: false,
            in_background: false,
            signaled: None,
        }
    }

    /// Outcome of a fork that has not been waited yet.
    pub fn spawned(pid: Pid, pgid: Pid) -> Self {
        ExecStats {
            exit_code: 0,
            pid,
            pgid,
            completed: false,
            stopped: false,
            in_background: false,
            signaled: None,
        }
    }
}

/// Set of processes sharing one process group
///
/// The job remembers which process was added last (the *job master*); the
/// master's outcome is the outcome of the whole job, which for a pipeline
/// is the last command. A job also carries the terminal modes saved when
/// it was moved to the background, so they can be restored when it comes
/// back to the foreground.
#[derive(Clone, Debug)]
pub struct Job {
    /// Process group all members share; 0 until the first forked member
    /// is added
    pub pgid: Pid,
    processes: HashMap<Pid, ExecStats>,
    master: Pid,
    /// Terminal modes saved on the foreground-to-background transition
    pub tmodes: Option<Termios>,
}

impl Default for Job {
    fn default() -> Self {
        Job::new()
    }
}

impl Job {
    /// Creates an empty job.
    pub fn new() -> Self {
        Job {
            pgid: Pid::from_raw(0),
            processes: HashMap::new(),
            master: Pid::from_raw(-1),
            tmodes: None,
        }
    }

    /// Adds a process outcome to the job, making it the job master.
    ///
    /// The first member with a real process group defines the group of
    /// the whole job.
    pub fn add(&mut self, stats: ExecStats) {
        // A member without a process group never forked, so it must
        // already be complete.
        debug_assert!(stats.pgid.as_raw() != -1 || stats.completed);
        if self.pgid.as_raw() == 0 && stats.pgid.as_raw() != -1 {
            self.pgid = stats.pgid;
        }
        self.master = stats.pid;
        self.processes.insert(stats.pid, stats);
    }

    /// Whether every member has terminated.
    pub fn completed(&self) -> bool {
        self.processes.values().all(|stats| stats.completed)
    }

    /// Whether every member has terminated or stopped.
    pub fn stopped(&self) -> bool {
        self.processes
            .values()
            .all(|stats| stats.completed || stats.stopped)
    }

    /// Clears the stopped flag of every member.
    pub fn mark_running(&mut self) {
        for stats in self.processes.values_mut() {
            stats.stopped = false;
        }
    }

    /// Process ID of the job master.
    pub fn master(&self) -> Pid {
        self.master
    }

    /// Outcome of the job master, standing for the whole job.
    pub fn exec_stats(&self) -> ExecStats {
        self.processes
            .get(&self.master)
            .copied()
            .unwrap_or_else(ExecStats::error)
    }

    /// Mutable access to the outcome of one member.
    pub fn stats_mut(&mut self, pid: Pid) -> Option<&mut ExecStats> {
        self.processes.get_mut(&pid)
    }

    /// Saves the current terminal modes into the job.
    pub fn save_modes(&mut self, terminal: RawFd) {
        self.tmodes = tcgetattr(terminal).ok();
    }

    /// Restores the job's saved terminal modes, if any.
    pub fn restore_modes(&self, terminal: RawFd) {
        if let Some(tmodes) = &self.tmodes {
            let _ = tcsetattr(terminal, SetArg::TCSADRAIN, tmodes);
        }
    }
}
