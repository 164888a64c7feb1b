// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Command;

use pebble::environment;

pub fn command() -> Command {
    Command::new("version").about("Display version number")
}

/// Print program version
pub fn print() {
    println!("{} {}", environment::NAME, environment::VERSION);
}
