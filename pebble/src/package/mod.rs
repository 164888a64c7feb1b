// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub use self::meta::Meta;

pub mod meta;

/// The name of a [`Package`], validated against policy
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(String);

impl Name {
    pub fn parse(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        if deb::valid_package_name(&name) {
            Ok(Self(name))
        } else {
            Err(InvalidNameError(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid package name: {0:?}")]
pub struct InvalidNameError(pub String);

/// A fully parsed package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub meta: Meta,
    /// Path of the archive this record came from
    pub source: PathBuf,
    /// Payload paths relative to the data root, in walk order
    pub files: Vec<String>,
    /// Extracted control tree; empty once staging is discarded
    pub control_dir: PathBuf,
    /// Extracted data tree; empty once staging is discarded
    pub data_dir: PathBuf,
}

impl Package {
    pub fn name(&self) -> &Name {
        &self.meta.name
    }

    pub fn version(&self) -> &str {
        &self.meta.version
    }

    /// Marker record for the in-flight registry
    pub fn in_flight_marker(name: Name, version: impl Into<String>) -> Self {
        Self {
            meta: Meta::bare(name, version),
            source: PathBuf::new(),
            files: vec![],
            control_dir: PathBuf::new(),
            data_dir: PathBuf::new(),
        }
    }
}
