// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{Arg, ArgAction, Command};
use log::LevelFilter;
use thiserror::Error;

use pebble::environment;

mod config;
mod files;
mod info;
mod inspect;
mod install;
mod list;
mod remove;
mod search;
mod version;

/// Generate the CLI command structure
fn command() -> Command {
    Command::new(environment::NAME)
        .about("Low-level Debian package installer")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .help("Increase diagnostic output; twice for trace detail")
                .action(ArgAction::Count),
        )
        .arg(Arg::new("version").long("version").action(ArgAction::SetTrue))
        .arg_required_else_help(true)
        .subcommand(config::command())
        .subcommand(files::command())
        .subcommand(info::command())
        .subcommand(inspect::command())
        .subcommand(install::command())
        .subcommand(list::command())
        .subcommand(remove::command())
        .subcommand(search::command())
        .subcommand(version::command())
}

/// Process all CLI arguments
pub fn process() -> Result<(), Error> {
    let matches = command().get_matches();

    let level = match matches.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    if matches.get_flag("version") {
        version::print();
        return Ok(());
    }

    match matches.subcommand() {
        Some(("config", args)) => config::handle(args).map_err(Error::Config),
        Some(("files", args)) => files::handle(args).map_err(Error::Files),
        Some(("info", args)) => info::handle(args).map_err(Error::Info),
        Some(("inspect", args)) => inspect::handle(args).map_err(Error::Inspect),
        Some(("install", args)) => install::handle(args).map_err(Error::Install),
        Some(("list", args)) => list::handle(args).map_err(Error::List),
        Some(("remove", args)) => remove::handle(args).map_err(Error::Remove),
        Some(("search", args)) => search::handle(args).map_err(Error::Search),
        Some(("version", _)) => {
            version::print();
            Ok(())
        }
        Some((other, _)) => unreachable!("unhandled subcommand {other}"),
        None => {
            let _ = command().print_help();
            Ok(())
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("error handling config: {0}")]
    Config(#[source] config::Error),

    #[error("error handling files: {0}")]
    Files(#[source] files::Error),

    #[error("error handling info: {0}")]
    Info(#[source] info::Error),

    #[error("error handling inspect: {0}")]
    Inspect(#[source] inspect::Error),

    #[error("error handling install: {0}")]
    Install(#[source] install::Error),

    #[error("error handling list: {0}")]
    List(#[source] list::Error),

    #[error("error handling remove: {0}")]
    Remove(#[source] remove::Error),

    #[error("error handling search: {0}")]
    Search(#[source] search::Error),
}

impl Error {
    /// Exit codes are stable per failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Install(error) => error.exit_code(),
            Error::Remove(error) => error.exit_code(),
            Error::Inspect(error) => error.exit_code(),
            Error::Config(_) => 4,
            Error::Files(_) | Error::Info(_) | Error::List(_) | Error::Search(_) => 1,
        }
    }
}
