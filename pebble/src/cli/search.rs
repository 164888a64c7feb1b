// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{arg, ArgMatches, Command};
use itertools::Itertools;
use thiserror::Error;

use pebble::{client, config, Client};

pub fn command() -> Command {
    Command::new("search")
        .about("Find installed packages owning a path")
        .arg(arg!(<TEXT> "substring matched against payload paths"))
}

/// Handle execution of `pebble search`
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let text = args.get_one::<String>("TEXT").unwrap();

    let client = Client::open(config::load())?;

    let packages = client.installed.iter().sorted_by(|a, b| a.name().cmp(b.name()));

    for package in packages {
        for file in package.files.iter().filter(|file| file.contains(text.as_str())) {
            println!("{}: {file}", package.name());
        }
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("client")]
    Client(#[from] client::Error),
}
