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

//! Scoped acquisition of file descriptors for redirections
//!
//! A [`RedirGuard`] is created per command from the inherited command
//! state (pipe ends and parent-side close list), then filled from the
//! command's parsed redirections. Descriptors opened for file
//! redirections are owned by the guard: when it goes out of scope in the
//! parent, they are closed. Duplication pairs are not closed on drop;
//! they reference descriptors that remain valid in the parent.

use crate::executor::CommandState;
use nix::errno::Errno;
use nix::fcntl::{fcntl, open, FcntlArg, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};
use std::os::unix::io::RawFd;
use testsh_syntax::syntax::{OpenKind, Redirect};

/// Whether a file descriptor refers to an open description.
fn fd_is_valid(fd: RawFd) -> bool {
    match fcntl(fd, FcntlArg::F_GETFD) {
        Ok(_) => true,
        Err(errno) => errno != Errno::EBADF,
    }
}

/// Owner of the file descriptors a command's redirections resolve to
///
/// The guard is deliberately neither clonable nor copyable: its drop
/// closes the file-opened descriptors exactly once.
#[derive(Debug)]
pub struct RedirGuard {
    /// Pairs of (descriptor to replace, open descriptor), from files and
    /// inherited pipe ends
    file_redirects: Vec<(RawFd, RawFd)>,
    /// Pairs of (descriptor to replace, descriptor to duplicate)
    duplications: Vec<(RawFd, RawFd)>,
    /// Descriptors the child must close before running
    fds_to_close: Vec<RawFd>,
}

impl RedirGuard {
    /// Creates a guard over the pipe wiring of the given command state.
    pub fn new(state: &CommandState) -> Self {
        RedirGuard {
            file_redirects: state.redirects.clone(),
            duplications: Vec::new(),
            fds_to_close: state.fds_to_close.clone(),
        }
    }

    /// Resolves parsed redirections in parse order.
    ///
    /// Returns false as soon as one redirection cannot be resolved, with
    /// a diagnostic on stderr; the command must then fail with exit
    /// status 1 and nothing is applied.
    pub fn add_redirects(&mut self, redirections: &[Redirect]) -> bool {
        for redirect in redirections {
            match redirect {
                Redirect::File(file) => {
                    let flags = match file.kind {
                        OpenKind::Read => OFlag::O_RDONLY,
                        OpenKind::Replace => OFlag::O_CREAT | OFlag::O_TRUNC | OFlag::O_WRONLY,
                        OpenKind::Append => OFlag::O_CREAT | OFlag::O_APPEND | OFlag::O_WRONLY,
                        OpenKind::ReadWrite => OFlag::O_CREAT | OFlag::O_RDWR,
                    };
                    let mode = Mode::S_IRUSR
                        | Mode::S_IWUSR
                        | Mode::S_IRGRP
                        | Mode::S_IWGRP
                        | Mode::S_IROTH;
                    match open(file.filename.as_str(), flags, mode) {
                        Ok(fd) => self.file_redirects.push((file.fd, fd)),
                        Err(errno) => {
                            eprintln!("open: {}", errno.desc());
                            return false;
                        }
                    }
                }
                Redirect::Fd(dup) => {
                    if !fd_is_valid(dup.source) {
                        eprintln!("testsh: file descriptor {} does not exist", dup.source);
                        return false;
                    }
                    self.duplications.push((dup.fd, dup.source));
                }
                Redirect::Close(close_fd) => self.fds_to_close.push(close_fd.fd),
                Redirect::BadFd(bad) => {
                    eprintln!("testsh: {}: bad file descriptor", bad.operand);
                    return false;
                }
            }
        }
        true
    }

    /// Applies the collected redirections in the child process.
    ///
    /// Closes the queued descriptors, then renames the file-opened and
    /// duplicated descriptors into place with `dup2`. On failure the
    /// child must exit with status 1.
    pub fn apply_redirections(&self) -> bool {
        for fd in &self.fds_to_close {
            let _ = close(*fd);
        }
        for (target, source) in self.file_redirects.iter().chain(&self.duplications) {
            if let Err(errno) = dup2(*source, *target) {
                eprintln!("dup2: {}", errno.desc());
                return false;
            }
        }
        true
    }
}

impl Drop for RedirGuard {
    /// Closes the file-opened descriptors.
    ///
    /// Only the parent-side copies are affected; duplication pairs stay
    /// untouched because the parent still owns those descriptors.
    fn drop(&mut self) {
        for (_, opened) in &self.file_redirects {
            let _ = close(*opened);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testsh_syntax::syntax::{BadFdRedirect, CloseFd, FdRedirect, FileRedirect};

    #[test]
    fn guard_rejects_missing_input_file() {
        let mut guard = RedirGuard::new(&CommandState::default());
        let missing = Redirect::File(FileRedirect {
            fd: 0,
            kind: OpenKind::Read,
            filename: "/nonexistent/definitely/missing".to_string(),
        });
        assert!(!guard.add_redirects(&[missing]));
    }

    #[test]
    fn guard_rejects_invalid_source_fd() {
        let mut guard = RedirGuard::new(&CommandState::default());
        let dup = Redirect::Fd(FdRedirect { fd: 1, source: 713 });
        assert!(!guard.add_redirects(&[dup]));
    }

    #[test]
    fn guard_accepts_valid_source_fd() {
        let mut guard = RedirGuard::new(&CommandState::default());
        let dup = Redirect::Fd(FdRedirect { fd: 2, source: 1 });
        assert!(guard.add_redirects(&[dup]));
    }

    #[test]
    fn guard_rejects_bad_dup_operand() {
        let mut guard = RedirGuard::new(&CommandState::default());
        let bad = Redirect::BadFd(BadFdRedirect {
            fd: 1,
            operand: "oops".to_string(),
        });
        assert!(!guard.add_redirects(&[bad]));
    }

    #[test]
    fn guard_queues_close_without_closing_in_parent() {
        let mut guard = RedirGuard::new(&CommandState::default());
        assert!(guard.add_redirects(&[Redirect::Close(CloseFd { fd: 1 })]));
        drop(guard);
        // Standard output must still be usable in the parent.
        assert!(fd_is_valid(1));
    }
}
