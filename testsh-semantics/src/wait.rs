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

//! Status reconciliation for jobs
//!
//! All waits target `-pgid` so that every process of a job is observed.
//! `waitpid` failures other than `ECHILD` are fatal and propagate as
//! [`Error::Wait`].

use crate::{Error, Result};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::tcsetpgrp;
use testsh_env::job::{Job, Pid};
use testsh_env::Shell;

/// Prints a signal name in the `NAME(number)` diagnostic form.
fn signal_name(signal: Signal) -> &'static str {
    signal.as_str().trim_start_matches("SIG")
}

/// Reconciler of child status changes for one shell
#[derive(Clone, Copy, Debug)]
pub struct Waiter<'a> {
    shell: &'a Shell,
}

impl<'a> Waiter<'a> {
    /// Creates a waiter operating on behalf of the given shell.
    pub fn new(shell: &'a Shell) -> Self {
        Waiter { shell }
    }

    /// Applies one `waitpid` result to the member it belongs to.
    fn process_status(job: &mut Job, status: WaitStatus) -> Result<()> {
        let pgid = job.pgid;
        let Some(pid) = status.pid() else {
            return Ok(());
        };
        let Some(stats) = job.stats_mut(pid) else {
            return Err(Error::UnknownChild { pid, pgid });
        };

        match status {
            WaitStatus::Stopped(_, signal) => {
                stats.stopped = true;
                eprintln!("{pid}: stopped by {}({})", signal_name(signal), signal as i32);
            }
            WaitStatus::Exited(_, exit_code) => {
                stats.completed = true;
                stats.exit_code = exit_code;
            }
            WaitStatus::Signaled(_, signal, _) => {
                stats.completed = true;
                stats.exit_code = 1;
                stats.signaled = Some(signal);
                eprintln!(
                    "{pid}: Terminated by signal {}({})",
                    signal_name(signal),
                    signal as i32
                );
            }
            _ => {}
        }
        Ok(())
    }

    /// Blocks until the job is completed or stopped.
    pub fn wait_job(&self, job: &mut Job) -> Result<()> {
        let pgid = job.pgid;
        debug_assert!(pgid.as_raw() != 0 || job.completed());

        while !job.completed() && !job.stopped() {
            let target = Pid::from_raw(-pgid.as_raw());
            match waitpid(target, Some(WaitPidFlag::WUNTRACED)) {
                Ok(status) => Self::process_status(job, status)?,
                Err(Errno::ECHILD) => break,
                Err(errno) => return Err(Error::Wait { pgid, errno }),
            }
        }
        Ok(())
    }

    /// Non-blocking poll used between prompts to surface background
    /// transitions.
    pub fn update_status(&self, job: &mut Job) -> Result<()> {
        let pgid = job.pgid;
        debug_assert!(pgid.as_raw() != 0 || job.completed());

        loop {
            let target = Pid::from_raw(-pgid.as_raw());
            match waitpid(target, Some(WaitPidFlag::WUNTRACED | WaitPidFlag::WNOHANG)) {
                // No process ready to report.
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => return Ok(()),
                Ok(status) => Self::process_status(job, status)?,
                Err(errno) => return Err(Error::Wait { pgid, errno }),
            }
        }
    }

    /// Synchronous foreground wait.
    ///
    /// After the job reports, an interactive shell takes the terminal
    /// back, saves the job's terminal modes, and restores its own.
    pub fn wait(&self, job: &mut Job) -> Result<()> {
        self.wait_job(job)?;
        if self.shell.is_interactive {
            if let Err(errno) = tcsetpgrp(self.shell.terminal, self.shell.pgid) {
                eprintln!(
                    "tcsetpgrp({}, {}): {}",
                    self.shell.terminal,
                    self.shell.pgid,
                    errno.desc()
                );
            }
            job.save_modes(self.shell.terminal);
            if let Some(tmodes) = &self.shell.tmodes {
                let _ = nix::sys::termios::tcsetattr(
                    self.shell.terminal,
                    nix::sys::termios::SetArg::TCSADRAIN,
                    tmodes,
                );
            }
        }
        Ok(())
    }

    /// Blocks until the job is completed, ignoring stops.
    ///
    /// An asynchronous scope must drain all of its children even if some
    /// were stopped by the terminal, so that its own exit is
    /// well-defined.
    pub fn wait_inside_async(&self, job: &mut Job) -> Result<()> {
        let pgid = job.pgid;
        while !job.completed() {
            let target = Pid::from_raw(-pgid.as_raw());
            match waitpid(target, Some(WaitPidFlag::WUNTRACED)) {
                Ok(status) => Self::process_status(job, status)?,
                Err(Errno::ECHILD) => break,
                Err(errno) => return Err(Error::Wait { pgid, errno }),
            }
        }
        Ok(())
    }

    /// Continues a stopped job in the background.
    pub fn bg(&self, job: &mut Job) {
        let target = Pid::from_raw(-job.pgid.as_raw());
        if let Err(errno) = kill(target, Signal::SIGCONT) {
            eprintln!("kill({target}, SIGCONT): {}", errno.desc());
        }
        job.mark_running();
    }

    /// Brings a job to the foreground, continues it, and waits for it.
    pub fn fg(&self, job: &mut Job) -> Result<()> {
        let _ = tcsetpgrp(self.shell.terminal, job.pgid);
        // Restore the job's terminal modes before waking it.
        job.restore_modes(self.shell.terminal);

        let target = Pid::from_raw(-job.pgid.as_raw());
        if let Err(errno) = kill(target, Signal::SIGCONT) {
            eprintln!("kill({target}, SIGCONT): {}", errno.desc());
        }
        job.mark_running();

        self.wait(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testsh_env::job::ExecStats;

    #[test]
    fn process_status_exit_updates_member() {
        let mut job = Job::new();
        job.add(ExecStats::spawned(Pid::from_raw(10), Pid::from_raw(10)));
        let status = WaitStatus::Exited(Pid::from_raw(10), 3);
        Waiter::process_status(&mut job, status).unwrap();
        let stats = job.exec_stats();
        assert!(stats.completed);
        assert_eq!(stats.exit_code, 3);
        assert_eq!(stats.signaled, None);
    }

    #[test]
    fn process_status_signal_sets_exit_code_one() {
        let mut job = Job::new();
        job.add(ExecStats::spawned(Pid::from_raw(10), Pid::from_raw(10)));
        let status = WaitStatus::Signaled(Pid::from_raw(10), Signal::SIGTERM, false);
        Waiter::process_status(&mut job, status).unwrap();
        let stats = job.exec_stats();
        assert!(stats.completed);
        assert_eq!(stats.exit_code, 1);
        assert_eq!(stats.signaled, Some(Signal::SIGTERM));
    }

    #[test]
    fn process_status_stop_does_not_complete() {
        let mut job = Job::new();
        job.add(ExecStats::spawned(Pid::from_raw(10), Pid::from_raw(10)));
        let status = WaitStatus::Stopped(Pid::from_raw(10), Signal::SIGTSTP);
        Waiter::process_status(&mut job, status).unwrap();
        let stats = job.exec_stats();
        assert!(stats.stopped);
        assert!(!stats.completed);
        assert!(job.stopped());
        assert!(!job.completed());
    }

    #[test]
    fn process_status_unknown_pid_is_error() {
        let mut job = Job::new();
        job.add(ExecStats::spawned(Pid::from_raw(10), Pid::from_raw(10)));
        let status = WaitStatus::Exited(Pid::from_raw(99), 0);
        let error = Waiter::process_status(&mut job, status).unwrap_err();
        assert_eq!(
            error,
            Error::UnknownChild {
                pid: Pid::from_raw(99),
                pgid: Pid::from_raw(10)
            }
        );
    }

    #[test]
    fn signal_name_drops_prefix() {
        assert_eq!(signal_name(Signal::SIGTERM), "TERM");
        assert_eq!(signal_name(Signal::SIGINT), "INT");
    }
}
