// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io::{self, Read};

use clap::{arg, Arg, ArgAction, ArgMatches, Command};
use fs_err as fs;
use thiserror::Error;

use pebble::{client, config, Client};

pub fn command() -> Command {
    Command::new("install")
        .about("Install archives")
        .long_about(
            "Install one or more .deb archives from local disk, pulling missing \
             dependencies from sibling archives in the same directory",
        )
        .arg(arg!(<PATH> ... "archive path or glob; - reads a list from stdin, @file reads a list file"))
        .arg(
            Arg::new("force")
                .short('f')
                .long("force")
                .action(ArgAction::SetTrue)
                .help("Reinstall or upgrade installed packages and skip unsatisfied dependencies"),
        )
}

/// Handle execution of `pebble install`
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let inputs = expand_inputs(args.get_many::<String>("PATH").into_iter().flatten())?;
    let force = args.get_flag("force");

    let mut client = Client::open(config::load())?;
    client.install(&inputs, force)?;

    Ok(())
}

/// `-` and `@file` arguments expand to newline-separated path lists
fn expand_inputs<'a>(raw: impl Iterator<Item = &'a String>) -> Result<Vec<String>, Error> {
    let mut inputs = vec![];

    for arg in raw {
        if arg == "-" {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            inputs.extend(lines(&text));
        } else if let Some(path) = arg.strip_prefix('@') {
            inputs.extend(lines(&fs::read_to_string(path)?));
        } else {
            inputs.push(arg.clone());
        }
    }

    Ok(inputs)
}

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("client")]
    Client(#[from] client::Error),

    #[error("install")]
    Install(#[from] client::install::Error),

    #[error("io")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Install(error) => error.exit_code(),
            Error::Client(_) => 2,
            Error::Io(_) => 1,
        }
    }
}
