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

//! The prompt cycle
//!
//! Each cycle drains completed background jobs, prints the prompt (red
//! when the last exit status was non-zero), reads one line, and decides
//! whether more input is needed before the buffer can be tokenized,
//! parsed and executed.

use std::io::{self, BufRead, Write};
use testsh_semantics::executor::Executor;
use testsh_semantics::wait::Waiter;
use testsh_semantics::Error;
use testsh_syntax::lex::{TokenId, TokenSource, Tokenizer};

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Whether the line's last token before its newline requests more input.
///
/// `&&`, `||`, `|` and an explicit backslash-newline continue onto the
/// next line. A trailing `&` does not.
fn line_has_continuation(line: &str) -> bool {
    let lines = [line.to_string()];
    let mut tokenizer = Tokenizer::new(&lines);
    let mut last = None;
    while let Some(token) = tokenizer.next_token() {
        if token.id == TokenId::Newline {
            break;
        }
        last = Some(token.id);
    }
    matches!(
        last,
        Some(TokenId::LineContinuation | TokenId::AndAnd | TokenId::OrOr | TokenId::Bar)
    )
}

/// Splices backslash-newline continuations across buffered lines.
///
/// A line ending in `\`-newline is joined with the following physical
/// line before the buffer is re-tokenized.
fn splice_continuations(buffer: &[String]) -> Vec<String> {
    let mut spliced: Vec<String> = Vec::new();
    for line in buffer {
        match spliced.last_mut() {
            Some(last) if last.ends_with("\\\n") => {
                last.truncate(last.len() - 2);
                last.push_str(line);
            }
            _ => spliced.push(line.clone()),
        }
    }
    spliced
}

/// Polls the background jobs, reports the completed ones and drops them.
fn drain_background_jobs(executor: &mut Executor) -> Result<(), Error> {
    let waiter = Waiter::new(&executor.shell);
    for job in &mut executor.bg_jobs {
        waiter.update_status(job)?;
        if job.completed() {
            eprintln!("{}: Completed {:?}", job.master(), job.exec_stats());
        }
    }
    executor.bg_jobs.retain(|job| !job.completed());
    Ok(())
}

/// Runs the shell until end of input, returning the shell's exit status.
///
/// The exit status is that of the last executed list.
pub fn run(mut executor: Executor) -> i32 {
    let stdin = io::stdin();
    let mut input_buffer: Vec<String> = Vec::new();
    let mut last_exit = 0;
    let mut needs_more = false;

    loop {
        if executor.shell.is_interactive {
            if !needs_more {
                if let Err(error) = drain_background_jobs(&mut executor) {
                    eprintln!("testsh: {error}");
                    return 1;
                }
            }
            let prompt = if needs_more { "> " } else { "$ " };
            if last_exit != 0 {
                print!("{RED}{prompt}{RESET}");
            } else {
                print!("{prompt}");
            }
            let _ = io::stdout().flush();
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if !line.ends_with('\n') {
            line.push('\n');
        }

        let continues = line_has_continuation(&line);
        input_buffer.push(line);
        if continues {
            needs_more = true;
            continue;
        }
        needs_more = false;

        let spliced = splice_continuations(&input_buffer);
        match executor.execute(&spliced) {
            Ok(stats) => last_exit = stats.exit_code,
            Err(error @ Error::ParseFailed) => eprintln!("{error}"),
            Err(error) => {
                eprintln!("testsh: {error}");
                return 1;
            }
        }
        input_buffer.clear();
    }

    last_exit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_after_operators() {
        assert!(line_has_continuation("echo a &&\n"));
        assert!(line_has_continuation("echo a ||\n"));
        assert!(line_has_continuation("echo a |\n"));
        assert!(line_has_continuation("echo a \\\n"));
    }

    #[test]
    fn no_continuation_after_complete_line() {
        assert!(!line_has_continuation("echo a\n"));
        assert!(!line_has_continuation("echo a;\n"));
        // A trailing `&` completes the list instead of continuing it.
        assert!(!line_has_continuation("sleep 10 &\n"));
        assert!(!line_has_continuation("\n"));
    }

    #[test]
    fn backslash_inside_word_is_not_a_continuation() {
        assert!(!line_has_continuation("echo a\\ b\n"));
    }

    #[test]
    fn splice_joins_continued_lines() {
        let buffer = vec![
            "echo a \\\n".to_string(),
            "b\n".to_string(),
            "echo c\n".to_string(),
        ];
        assert_eq!(splice_continuations(&buffer), ["echo a b\n", "echo c\n"]);
    }

    #[test]
    fn splice_joins_chains_of_continuations() {
        let buffer = vec![
            "a \\\n".to_string(),
            "b \\\n".to_string(),
            "c\n".to_string(),
        ];
        assert_eq!(splice_continuations(&buffer), ["a b c\n"]);
    }

    #[test]
    fn splice_keeps_plain_lines() {
        let buffer = vec!["a\n".to_string(), "b\n".to_string()];
        assert_eq!(splice_continuations(&buffer), ["a\n", "b\n"]);
    }
}
