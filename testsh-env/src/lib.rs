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

//! This crate defines the process-wide execution environment of testsh.
//!
//! The central type is [`Shell`], which records whether the shell is
//! interactive, which process group and terminal it owns, the terminal
//! modes saved at startup, and the shell [variables](variable). The
//! [`job`] module provides the process and job model used by the
//! execution layer: the outcome of launching one command
//! ([`ExecStats`](job::ExecStats)) and a set of processes sharing a
//! process group ([`Job`](job::Job)).

pub mod job;
pub mod variable;

use nix::sys::signal::{kill, signal, SigHandler, Signal};
use nix::sys::termios::{tcgetattr, Termios};
use nix::unistd::{getpid, getpgrp, isatty, setpgid, tcgetpgrp, tcsetpgrp, Pid};
use std::os::unix::io::RawFd;
use variable::VariableSet;

/// Process-wide shell state
///
/// A `Shell` is constructed once at startup with [`Shell::new`] and then
/// shared by the execution layer. In an interactive shell, construction
/// has side effects: the shell waits until it is the foreground process
/// group, puts itself into its own process group, grabs the terminal and
/// saves its modes.
#[derive(Clone, Debug)]
pub struct Shell {
    /// Process group the shell runs in
    pub pgid: Pid,
    /// Terminal modes saved at startup, restored after foreground jobs
    pub tmodes: Option<Termios>,
    /// File descriptor of the controlling terminal
    pub terminal: RawFd,
    /// Whether standard input is a terminal
    pub is_interactive: bool,
    /// Shell variables
    pub vars: VariableSet,
}

impl Shell {
    /// Initializes the shell state, making sure an interactive shell runs
    /// in the foreground before proceeding.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let terminal: RawFd = 0;
        let is_interactive = isatty(terminal).unwrap_or(false);
        let mut pgid = getpgrp();
        let mut tmodes = None;

        if is_interactive {
            // Loop until we are in the foreground.
            loop {
                pgid = getpgrp();
                if tcgetpgrp(terminal) == Ok(pgid) {
                    break;
                }
                let _ = kill(Pid::from_raw(-pgid.as_raw()), Signal::SIGTTIN);
            }

            // Ignore interactive and job-control signals.
            for sig in [
                Signal::SIGINT,
                Signal::SIGQUIT,
                Signal::SIGTSTP,
                Signal::SIGTTIN,
                Signal::SIGTTOU,
            ] {
                unsafe {
                    let _ = signal(sig, SigHandler::SigIgn);
                }
            }

            // Put ourselves in our own process group.
            pgid = getpid();
            if setpgid(pgid, pgid).is_err() {
                eprintln!("Couldn't put the shell in its own process group");
                std::process::exit(1);
            }

            // Grab control of the terminal and save its modes.
            let _ = tcsetpgrp(terminal, pgid);
            tmodes = tcgetattr(terminal).ok();

            eprintln!("testsh pid: {pgid}");
        }

        let mut vars = VariableSet::default();
        for (name, value) in std::env::vars() {
            vars.upsert(format!("{name}={value}"), Some(true));
        }

        Shell {
            pgid,
            tmodes,
            terminal,
            is_interactive,
            vars,
        }
    }
}
