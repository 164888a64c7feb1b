// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{arg, value_parser, ArgMatches, Command};
use thiserror::Error;

use pebble::{client, config, Client};

pub fn command() -> Command {
    Command::new("inspect")
        .about("Show an archive without installing it")
        .arg(arg!(<PATH> "archive to inspect").value_parser(value_parser!(PathBuf)))
}

/// Handle execution of `pebble inspect`
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let path = args.get_one::<PathBuf>("PATH").unwrap();

    let client = Client::open(config::load())?;
    let package = client.inspect(path)?;

    print!("{}", package.meta.to_paragraph());
    println!("Payload-Entries: {}", package.files.len());
    for file in &package.files {
        println!("  {file}");
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("client")]
    Client(#[from] client::Error),

    #[error("inspect")]
    Inspect(#[from] client::install::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Inspect(error) => error.exit_code(),
            Error::Client(_) => 2,
        }
    }
}
