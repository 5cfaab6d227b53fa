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

//! The testsh binary: shell startup and the read-eval loop.

mod repl;

use testsh_env::Shell;
use testsh_semantics::executor::Executor;

fn main() {
    let shell = Shell::new();
    let executor = Executor::new(shell);
    let exit_code = repl::run(executor);
    std::process::exit(exit_code);
}
