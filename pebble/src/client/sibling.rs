// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Locating dependency archives beside the one being installed.
//!
//! Candidates are `<name>_<version>_<arch>.deb` files in the
//! originating archive's directory. A candidate whose version token
//! equals the originator's is preferred; otherwise the lexically
//! first wins. The originator itself and anything already attempted
//! in this top-level call are never offered.

use std::collections::HashSet;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::environment;

/// Pick a candidate for `name`, or nothing. All scan failures read
/// as "no candidate": the atom simply stays unsatisfied.
pub fn find(name: &str, origin: &Path, attempted: &HashSet<PathBuf>) -> Option<PathBuf> {
    let debug = debug_enabled();
    let dir = origin.parent()?;
    let origin_file = origin.file_name()?;
    let origin_version = origin_file
        .to_str()
        .and_then(deb::split_file_name)
        .map(|(_, version, _)| version.to_owned());

    let mut candidates = vec![];

    for entry in fs::read_dir(dir).ok()?.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(OsStr::to_str) else {
            continue;
        };
        let Some((candidate, version, _)) = deb::split_file_name(file_name) else {
            continue;
        };
        if candidate != name {
            continue;
        }
        if path.file_name() == Some(origin_file) {
            if debug {
                eprintln!("{}: sibling scan skipping originator {file_name}", environment::NAME);
            }
            continue;
        }
        if attempted.contains(&path) {
            if debug {
                eprintln!("{}: sibling scan skipping attempted {file_name}", environment::NAME);
            }
            continue;
        }
        if debug {
            eprintln!("{}: sibling candidate for {name}: {file_name}", environment::NAME);
        }
        candidates.push((version.to_owned(), path));
    }

    candidates.sort();

    // Exact version match with the originator wins
    if let Some(wanted) = origin_version {
        if let Some((_, path)) = candidates.iter().find(|(version, _)| *version == wanted) {
            return Some(path.clone());
        }
    }

    candidates.into_iter().next().map(|(_, path)| path)
}

fn debug_enabled() -> bool {
    env::var_os(environment::DEBUG_ENV).is_some_and(|value| !value.is_empty())
}
