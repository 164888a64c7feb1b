// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{arg, ArgMatches, Command};
use thiserror::Error;

use pebble::{client, config, Client};

pub fn command() -> Command {
    Command::new("remove")
        .about("Remove a package")
        .long_about("Forget an installed package; its materialized files stay on disk")
        .arg(arg!(<NAME> "package to remove"))
}

/// Handle execution of `pebble remove`
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let name = args.get_one::<String>("NAME").unwrap();

    let mut client = Client::open(config::load())?;
    client.remove(name)?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("client")]
    Client(#[from] client::Error),

    #[error("remove")]
    Remove(#[from] client::remove::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Remove(error) => error.exit_code(),
            Error::Client(_) => 2,
        }
    }
}
