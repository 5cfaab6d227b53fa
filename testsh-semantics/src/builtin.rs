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

//! Job-control builtins
//!
//! Only the small job-control set is built in: `bg`, `cd`, `exec`,
//! `exit`, `fg` and `jobs`. Outside a pipeline these run synchronously in
//! the shell process; inside a pipeline the executor forks them into a
//! child so the pipe wiring still applies.

use crate::exec::SimpleCommand;
use crate::wait::Waiter;
use crate::Result;
use nix::unistd::execvp;
use std::ffi::CString;
use std::path::PathBuf;
use testsh_env::job::Job;

/// Whether the command names a builtin.
pub fn is_builtin(command: &SimpleCommand) -> bool {
    matches!(
        command.program.as_str(),
        "bg" | "cd" | "exec" | "exit" | "fg" | "jobs"
    )
}

/// Integer prefix value of a string, with `atoi` semantics.
///
/// Leading whitespace and an optional sign are accepted; parsing stops at
/// the first non-digit. A string without a leading number yields 0.
fn atoi(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let mut value: i32 = 0;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(10) else {
            break;
        };
        value = value.wrapping_mul(10).wrapping_add(digit as i32);
    }
    if negative {
        -value
    } else {
        value
    }
}

/// Resolves a `%n` job specification to an index into the job list.
///
/// Without a specification the most recent background job is selected.
fn find_job(spec: Option<&str>, jobs: &[Job]) -> Option<usize> {
    match spec {
        None => jobs.len().checked_sub(1),
        Some(spec) => {
            let number: usize = spec.strip_prefix('%').unwrap_or(spec).parse().ok()?;
            (number >= 1 && number <= jobs.len()).then(|| number - 1)
        }
    }
}

/// The `cd` builtin.
///
/// Without an argument, or with a bare `~`, changes to `$HOME`.
pub fn cd(command: &SimpleCommand) -> i32 {
    let target = if command.arguments.is_empty() || command.arguments[0] == "~" {
        match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home),
            Err(_) => {
                eprintln!("cd: $HOME not set");
                return 1;
            }
        }
    } else if command.arguments.len() == 1 {
        PathBuf::from(&command.arguments[0])
    } else {
        eprintln!("cd: too many arguments");
        return 1;
    };

    match std::env::set_current_dir(&target) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("cd: {}: {}", target.display(), error);
            1
        }
    }
}

/// The `exec` builtin: replaces the shell with the given program.
///
/// Without arguments this is a no-op. Only returns on failure.
pub fn exec(command: &SimpleCommand) -> i32 {
    if command.arguments.is_empty() {
        return 0;
    }

    let argv: Vec<CString> = match command
        .arguments
        .iter()
        .map(|argument| CString::new(argument.as_str()))
        .collect()
    {
        Ok(argv) => argv,
        Err(_) => {
            eprintln!("exec: {}: invalid argument", command.arguments[0]);
            return 1;
        }
    };

    let errno = match execvp(&argv[0], &argv) {
        Err(errno) => errno,
        Ok(infallible) => match infallible {},
    };
    eprintln!("exec: {}: {}", command.arguments[0], errno.desc());
    errno as i32
}

/// The `exit` builtin.
///
/// Exits with the integer prefix value of its argument, or with 1 when no
/// argument is given.
pub fn exit(command: &SimpleCommand) -> i32 {
    if command.arguments.len() > 1 {
        eprintln!("exit: too many arguments");
        return 1;
    }
    let exit_code = command.arguments.first().map(|a| atoi(a)).unwrap_or(1);
    std::process::exit(exit_code)
}

/// The `bg` builtin: continues a stopped job in the background.
pub fn bg(command: &SimpleCommand, jobs: &mut [Job], waiter: &Waiter) -> i32 {
    let spec = command.arguments.first().map(String::as_str);
    let Some(index) = find_job(spec, jobs) else {
        eprintln!("bg: {}: no such job", spec.unwrap_or("current"));
        return 1;
    };
    waiter.bg(&mut jobs[index]);
    0
}

/// The `fg` builtin: brings a job to the foreground and waits for it.
///
/// A job that completes leaves the background list; a job stopped again
/// stays on it.
pub fn fg(command: &SimpleCommand, jobs: &mut Vec<Job>, waiter: &Waiter) -> Result<i32> {
    let spec = command.arguments.first().map(String::as_str);
    let Some(index) = find_job(spec, jobs) else {
        eprintln!("fg: {}: no such job", spec.unwrap_or("current"));
        return Ok(1);
    };
    let mut job = jobs.remove(index);
    waiter.fg(&mut job)?;
    if !job.completed() {
        jobs.push(job);
    }
    Ok(0)
}

/// The `jobs` builtin: lists the background jobs.
pub fn jobs(_command: &SimpleCommand, jobs: &[Job]) -> i32 {
    for (index, job) in jobs.iter().enumerate() {
        let state = if job.completed() {
            "Done"
        } else if job.stopped() {
            "Stopped"
        } else {
            "Running"
        };
        println!("[{}] {} {}", index + 1, job.pgid, state);
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use testsh_env::job::{ExecStats, Pid};

    #[test]
    fn atoi_parses_integer_prefix() {
        assert_eq!(atoi("42"), 42);
        assert_eq!(atoi("-7"), -7);
        assert_eq!(atoi("  10"), 10);
        assert_eq!(atoi("12abc"), 12);
        assert_eq!(atoi("abc"), 0);
        assert_eq!(atoi(""), 0);
    }

    #[test]
    fn find_job_resolves_specs() {
        let mut jobs = Vec::new();
        for pid in [10, 20] {
            let mut job = Job::new();
            job.add(ExecStats::spawned(Pid::from_raw(pid), Pid::from_raw(pid)));
            jobs.push(job);
        }
        assert_eq!(find_job(None, &jobs), Some(1));
        assert_eq!(find_job(Some("%1"), &jobs), Some(0));
        assert_eq!(find_job(Some("2"), &jobs), Some(1));
        assert_eq!(find_job(Some("%3"), &jobs), None);
        assert_eq!(find_job(Some("%0"), &jobs), None);
        assert_eq!(find_job(Some("%x"), &jobs), None);
        assert_eq!(find_job(None, &[]), None);
    }

    #[test]
    fn is_builtin_matches_the_job_control_set() {
        for name in ["bg", "cd", "exec", "exit", "fg", "jobs"] {
            let command = SimpleCommand {
                program: name.to_string(),
                arguments: vec![],
                redirections: vec![],
                assignments: vec![],
            };
            assert!(is_builtin(&command), "{name}");
        }
        let command = SimpleCommand {
            program: "echo".to_string(),
            arguments: vec![],
            redirections: vec![],
            assignments: vec![],
        };
        assert!(!is_builtin(&command));
    }
}
