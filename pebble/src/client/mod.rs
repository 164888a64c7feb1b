// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use log::trace;
use thiserror::Error;

use crate::package::Package;
use crate::registry::Registry;
use crate::store::{self, Store};
use crate::{Config, Installation};

pub mod install;
pub mod materialize;
pub mod remove;
mod sibling;

/// A Client drives the package management engine against one set of
/// configured roots.
///
/// Two registries of the same shape with disjoint purpose: `installed`
/// mirrors the persistent store, `in_flight` marks names whose
/// install call is currently on the stack. A name never sits in both.
pub struct Client {
    pub installation: Installation,
    pub store: Store,
    pub installed: Registry,
    pub in_flight: Registry,
}

impl Client {
    /// Open a client, rebuilding the installed registry from the
    /// persistent store.
    pub fn open(config: Config) -> Result<Client, Error> {
        let installation = Installation::open(&config);
        let store = Store::open(&installation.store_root)?;

        let mut installed = Registry::new();
        for package in store.load_all()? {
            installed.insert(package);
        }
        trace!("loaded {} installed package(s)", installed.len());

        Ok(Client {
            installation,
            store,
            installed,
            in_flight: Registry::new(),
        })
    }

    /// Install archives; see [`install`](install::install).
    pub fn install(&mut self, inputs: &[String], force: bool) -> Result<(), install::Error> {
        install::install(self, inputs, force)
    }

    /// Remove one installed package by name.
    pub fn remove(&mut self, name: &str) -> Result<(), remove::Error> {
        remove::remove(self, name)
    }

    /// Parse an archive without installing it.
    pub fn inspect(&self, path: &Path) -> Result<Package, install::Error> {
        install::inspect(self, path)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("store")]
    Store(#[from] store::Error),
}
