// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use pebble::{config, store, Config, Installation};

pub fn command() -> Command {
    Command::new("config")
        .about("Show the effective configuration")
        .arg(
            Arg::new("path")
                .long("path")
                .action(ArgAction::SetTrue)
                .help("Print the configuration file cascade, system file first"),
        )
        .arg(
            Arg::new("autocomplete")
                .long("autocomplete-path")
                .action(ArgAction::SetTrue)
                .help("Print the autocomplete index path"),
        )
}

/// Handle execution of `pebble config`
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    if args.get_flag("path") {
        for path in config::files() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let installation = Installation::open(&config::load());

    if args.get_flag("autocomplete") {
        println!("{}", store::autocomplete_path(&installation.store_root).display());
        return Ok(());
    }

    let resolved = Config {
        store_root: Some(installation.store_root),
        staging_root: Some(installation.staging_root),
        install_root: Some(installation.install_root),
    };
    print!("{}", serde_yaml::to_string(&resolved)?);

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("serialize")]
    Yaml(#[from] serde_yaml::Error),
}
