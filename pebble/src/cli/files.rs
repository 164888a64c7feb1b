// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{arg, ArgMatches, Command};
use thiserror::Error;

use pebble::{client, config, Client};

pub fn command() -> Command {
    Command::new("files")
        .about("List the payload of an installed package")
        .arg(arg!(<NAME> "package name"))
}

/// Handle execution of `pebble files`
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let name = args.get_one::<String>("NAME").unwrap();

    let client = Client::open(config::load())?;

    let Some(package) = client.installed.get(name) else {
        println!("Package {name} is not installed.");
        return Ok(());
    };

    for file in &package.files {
        println!("{file}");
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("client")]
    Client(#[from] client::Error),
}
