// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Payload materialization into the install root.
//!
//! Entries are independent units handed to a bounded worker pool in
//! file-list order; the pool is joined before returning. Failures
//! are counted and reported, never unwound: entries already placed
//! stay placed, matching the best-effort unpack model of the wider
//! packaging ecosystem.

use std::io;
use std::num::NonZeroUsize;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Component, Path};
use std::sync::Mutex;
use std::thread;

use fs_err as fs;
use log::{trace, warn};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

use crate::environment;

/// Create every listed entry from `data_dir` under `target`,
/// returning the number of entries that failed.
pub fn materialize(data_dir: &Path, files: &[String], target: &Path) -> Result<u64, Error> {
    fs::create_dir_all(target)?;

    let pool = ThreadPoolBuilder::new().num_threads(pool_size()).build()?;
    let errors = Mutex::new(0u64);

    pool.install(|| {
        files.par_iter().for_each(|entry| {
            if let Err(error) = place_entry(data_dir, entry, target) {
                warn!("failed to materialize {entry:?}: {error}");
                let mut errors = errors.lock().expect("error counter poisoned");
                *errors += 1;
            }
        });
    });

    Ok(errors.into_inner().expect("error counter poisoned"))
}

/// `min(2 x cpus, 32)` workers
fn pool_size() -> usize {
    let cpus = thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1);
    (cpus * 2).min(environment::MAX_BLIT_WORKERS)
}

fn place_entry(data_dir: &Path, entry: &str, target: &Path) -> Result<(), EntryError> {
    let relative = Path::new(entry);
    if relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
    {
        return Err(EntryError::UnsafePath);
    }

    let source = data_dir.join(relative);
    let destination = target.join(relative);

    // Kind re-derived here rather than trusted from any manifest
    let metadata = fs::symlink_metadata(&source)?;
    let kind = metadata.file_type();

    if kind.is_dir() {
        if !destination.is_dir() {
            fs::create_dir_all(&destination)?;
            fs::set_permissions(&destination, std::fs::Permissions::from_mode(0o755))?;
        }
    } else if kind.is_file() {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        // copy truncates an existing destination and carries mode bits
        fs::copy(&source, &destination)?;
    } else if kind.is_symlink() {
        let link_target = fs::read_link(&source)?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::symlink_metadata(&destination) {
            Ok(existing) if existing.is_dir() => fs::remove_dir(&destination)?,
            Ok(_) => fs::remove_file(&destination)?,
            Err(_) => {}
        }
        // target recreated verbatim, no resolution
        symlink(&link_target, &destination)?;
    } else {
        warn!("skipping unsupported entry kind: {entry:?}");
        return Ok(());
    }

    trace!("materialized {entry:?}");

    Ok(())
}

#[derive(Debug, Error)]
enum EntryError {
    #[error("io")]
    Io(#[from] io::Error),

    #[error("path escapes the install root")]
    UnsafePath,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io")]
    Io(#[from] io::Error),

    #[error("worker pool")]
    Pool(#[from] ThreadPoolBuildError),
}

#[cfg(test)]
mod test {
    use std::os::unix::fs::MetadataExt;

    use super::*;

    fn stage(dir: &Path, files: &[(&str, &str)], symlinks: &[(&str, &str)]) {
        fs::create_dir_all(dir).unwrap();
        for (path, content) in files {
            let path = dir.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
        for (path, target) in symlinks {
            symlink(target, dir.join(path)).unwrap();
        }
    }

    #[test]
    fn places_all_entry_kinds() {
        let root = tempfile::tempdir().unwrap();
        let staging = root.path().join("data");
        let target = root.path().join("rootfs");

        stage(
            &staging,
            &[("usr/bin/demo", "#!/bin/sh\n")],
            &[("usr/bin/demo-alias", "demo")],
        );

        let files = [
            "usr".to_owned(),
            "usr/bin".to_owned(),
            "usr/bin/demo".to_owned(),
            "usr/bin/demo-alias".to_owned(),
        ];
        let errors = materialize(&staging, &files, &target).unwrap();

        assert_eq!(errors, 0);
        assert!(target.join("usr/bin").is_dir());
        assert_eq!(fs::read_to_string(target.join("usr/bin/demo")).unwrap(), "#!/bin/sh\n");
        assert_eq!(
            fs::read_link(target.join("usr/bin/demo-alias")).unwrap().to_str(),
            Some("demo")
        );
    }

    #[test]
    fn rejects_parent_components() {
        let root = tempfile::tempdir().unwrap();
        let staging = root.path().join("data");
        let target = root.path().join("rootfs");

        stage(&staging, &[("innocent", "data")], &[]);

        let files = ["../escape".to_owned(), "innocent".to_owned()];
        let errors = materialize(&staging, &files, &target).unwrap();

        assert_eq!(errors, 1);
        assert!(!root.path().join("escape").exists());
        assert!(target.join("innocent").is_file());
    }

    #[test]
    fn overwrites_existing_regular_file() {
        let root = tempfile::tempdir().unwrap();
        let staging = root.path().join("data");
        let target = root.path().join("rootfs");

        stage(&staging, &[("etc/motd", "new contents")], &[]);
        fs::create_dir_all(target.join("etc")).unwrap();
        fs::write(target.join("etc/motd"), "previous contents, much longer").unwrap();

        let errors = materialize(&staging, &["etc/motd".to_owned()], &target).unwrap();

        assert_eq!(errors, 0);
        assert_eq!(fs::read_to_string(target.join("etc/motd")).unwrap(), "new contents");
    }

    #[test]
    fn replaces_existing_symlink() {
        let root = tempfile::tempdir().unwrap();
        let staging = root.path().join("data");
        let target = root.path().join("rootfs");

        stage(&staging, &[], &[("link", "fresh-target")]);
        fs::create_dir_all(&target).unwrap();
        symlink("stale-target", target.join("link")).unwrap();

        let errors = materialize(&staging, &["link".to_owned()], &target).unwrap();

        assert_eq!(errors, 0);
        assert_eq!(fs::read_link(target.join("link")).unwrap().to_str(), Some("fresh-target"));
    }

    #[test]
    fn preserves_file_mode() {
        let root = tempfile::tempdir().unwrap();
        let staging = root.path().join("data");
        let target = root.path().join("rootfs");

        stage(&staging, &[("usr/bin/tool", "exec")], &[]);
        fs::set_permissions(staging.join("usr/bin/tool"), std::fs::Permissions::from_mode(0o750)).unwrap();

        materialize(&staging, &["usr/bin/tool".to_owned()], &target).unwrap();

        let mode = fs::metadata(target.join("usr/bin/tool")).unwrap().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }
}
