// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Configuration cascade: a system-wide file overridden per key by
//! the user's file. Unknown keys are left alone so newer tools can
//! share the same file.

use std::path::PathBuf;

use fs_err::File;
use serde::{Deserialize, Serialize};

use crate::environment;

const EXTENSION: &str = "conf";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the persistent package store
    pub store_root: Option<PathBuf>,
    /// Scratch area for per-package extraction
    pub staging_root: Option<PathBuf>,
    /// Directory payloads are materialized under
    pub install_root: Option<PathBuf>,
}

impl Config {
    /// Later values win per key.
    pub fn merge(self, other: Self) -> Self {
        Self {
            store_root: other.store_root.or(self.store_root),
            staging_root: other.staging_root.or(self.staging_root),
            install_root: other.install_root.or(self.install_root),
        }
    }
}

/// The cascade, system first.
pub fn files() -> Vec<PathBuf> {
    let file_name = format!("{}.{EXTENSION}", environment::NAME);
    let mut paths = vec![PathBuf::from("/etc").join(environment::NAME).join(&file_name)];

    if let Some(user) = dirs::config_dir() {
        paths.push(user.join(environment::NAME).join(&file_name));
    }

    paths
}

/// Load and merge the cascade. Missing or undecodable files
/// contribute nothing.
pub fn load() -> Config {
    files()
        .into_iter()
        .filter_map(|path| {
            let file = File::open(path).ok()?;
            serde_yaml::from_reader(file).ok()
        })
        .reduce(Config::merge)
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn user_key_overrides_system() {
        let system = Config {
            store_root: Some("/var/lib/pebble".into()),
            staging_root: Some("/var/cache/pebble/staging".into()),
            install_root: None,
        };
        let user = Config {
            store_root: Some("/home/dev/.pebble/store".into()),
            staging_root: None,
            install_root: None,
        };

        let merged = system.clone().merge(user);
        assert_eq!(merged.store_root.as_deref(), Some("/home/dev/.pebble/store".as_ref()));
        assert_eq!(merged.staging_root, system.staging_root);
        assert_eq!(merged.install_root, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let parsed: Config =
            serde_yaml::from_str("store_root: /srv/store\ncolour_scheme: mauve\n").expect("unknown keys tolerated");
        assert_eq!(parsed.store_root.as_deref(), Some("/srv/store".as_ref()));
    }

    #[test]
    fn cascade_order() {
        let paths = files();
        assert_eq!(paths[0], PathBuf::from("/etc/pebble/pebble.conf"));
    }
}
