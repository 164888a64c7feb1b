// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{arg, ArgMatches, Command};
use itertools::Itertools;
use thiserror::Error;

use pebble::{client, config, Client};

pub fn command() -> Command {
    Command::new("list")
        .about("List installed packages")
        .arg(arg!([PATTERN] "glob pattern applied to package names"))
}

/// Handle execution of `pebble list`
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let pattern = args
        .get_one::<String>("PATTERN")
        .map(|pattern| glob::Pattern::new(pattern))
        .transpose()?;

    let client = Client::open(config::load())?;

    let listed = client
        .installed
        .iter()
        .filter(|package| {
            pattern
                .as_ref()
                .map_or(true, |pattern| pattern.matches(package.name().as_str()))
        })
        .sorted_by(|a, b| a.name().cmp(b.name()));

    for package in listed {
        let summary = package
            .meta
            .description
            .as_deref()
            .and_then(|description| description.lines().next())
            .unwrap_or("");
        println!("{} {} {summary}", package.name(), package.version());
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("client")]
    Client(#[from] client::Error),

    #[error("bad glob pattern")]
    Pattern(#[from] glob::PatternError),
}
