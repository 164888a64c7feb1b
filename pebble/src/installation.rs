// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};
use std::{env, fmt, fs};

use log::trace;
use nix::unistd::{access, AccessFlags, Uid};

use crate::{config::Config, environment};

const DEFAULT_STORE_ROOT: &str = "/var/lib/pebble";
const DEFAULT_STAGING_ROOT: &str = "/var/cache/pebble/staging";
const DEFAULT_INSTALL_ROOT: &str = "/";

/// System mutability - do we have readwrite?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// We only have readonly access
    ReadOnly,
    /// We have read-write access
    ReadWrite,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutability::ReadOnly => "read-only".fmt(f),
            Mutability::ReadWrite => "read-write".fmt(f),
        }
    }
}

/// The filesystem roots one process run operates on, resolved from
/// configuration plus the install-root environment override.
#[derive(Debug, Clone)]
pub struct Installation {
    pub store_root: PathBuf,
    pub staging_root: PathBuf,
    pub install_root: PathBuf,
    pub mutability: Mutability,
}

impl Installation {
    pub fn open(config: &Config) -> Self {
        let store_root = config.store_root.clone().unwrap_or_else(|| DEFAULT_STORE_ROOT.into());
        let staging_root = config.staging_root.clone().unwrap_or_else(|| DEFAULT_STAGING_ROOT.into());
        let mut install_root = config.install_root.clone().unwrap_or_else(|| DEFAULT_INSTALL_ROOT.into());

        if let Some(root) = env::var_os(environment::INSTALL_ROOT_ENV).filter(|root| !root.is_empty()) {
            install_root = root.into();
        }

        ensure_dirs_exist(&store_root, &staging_root, &install_root);

        let mutability = if Uid::effective().is_root() {
            Mutability::ReadWrite
        } else if access(&install_root, AccessFlags::W_OK).is_ok() {
            Mutability::ReadWrite
        } else {
            Mutability::ReadOnly
        };

        trace!("Mutability: {mutability}");
        trace!("Store root: {store_root:?}");
        trace!("Staging root: {staging_root:?}");
        trace!("Install root: {install_root:?}");

        Self {
            store_root,
            staging_root,
            install_root,
            mutability,
        }
    }

    pub fn read_only(&self) -> bool {
        matches!(self.mutability, Mutability::ReadOnly)
    }

    /// Per-package scratch area
    pub fn staging_dir(&self, base: &str) -> PathBuf {
        self.staging_root.join(base)
    }
}

fn ensure_dirs_exist(store_root: &Path, staging_root: &Path, install_root: &Path) {
    for path in [store_root, staging_root, install_root] {
        let _ = fs::create_dir_all(path);
    }
}
