// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Removal of installed packages.
//!
//! Drops the store entry and the registry record and rebuilds the
//! autocomplete index. Materialized payload files stay on disk;
//! reversal would need per-file ownership tracking across packages
//! that share directories, which this tool does not record.

use thiserror::Error;

use crate::client::Client;
use crate::package::Package;
use crate::store;

pub(super) fn remove(client: &mut Client, name: &str) -> Result<(), Error> {
    if client.installation.read_only() {
        return Err(Error::ReadOnly);
    }

    let Some(package) = client.installed.get(name) else {
        println!("Package {name} is not installed.");
        return Ok(());
    };
    let version = package.version().to_owned();

    // Store first; the registry record only goes once disk agrees
    client.store.remove(name, &version)?;
    client.installed.remove(name);
    client.store.rebuild_autocomplete(client.installed.iter().map(Package::name))?;

    println!("Removed {name} ({version}).");

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("system is read-only")]
    ReadOnly,

    #[error("store")]
    Store(#[from] store::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ReadOnly | Error::Store(store::Error::Io(_)) => 1,
            Error::Store(_) => 2,
        }
    }
}
