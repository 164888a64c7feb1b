// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The persistent package store.
//!
//! Authoritative record of installed packages across process
//! lifetimes. One directory per `(name, version)` holding a single
//! `info` file in control-paragraph syntax: the scalar record fields,
//! the originating archive path and a multiline `Files:` list of the
//! materialized payload paths. A name holds at most one version.
//!
//! The store root also carries the `.autocomplete` index, a flat list
//! of installed names consumed by shell integration outside this
//! crate. Package names start alphanumeric, so the dot prefix can
//! never collide with a package directory.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fs_err as fs;
use log::warn;
use thiserror::Error;

use deb::control::Paragraph;
use deb::version;

use crate::package::{self, Meta, Name, Package};

const INFO_FILE: &str = "info";
const AUTOCOMPLETE_FILE: &str = ".autocomplete";

#[derive(Debug)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open the store at `root`, creating it when absent.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version)
    }

    pub fn info_path(&self, name: &str, version: &str) -> PathBuf {
        self.package_dir(name, version).join(INFO_FILE)
    }

    pub fn autocomplete_path(&self) -> PathBuf {
        autocomplete_path(&self.root)
    }

    /// Last modification of the `(name, version)` entry, if present.
    pub fn modified(&self, name: &str, version: &str) -> Option<SystemTime> {
        fs::metadata(self.package_dir(name, version))
            .and_then(|meta| meta.modified())
            .ok()
    }

    /// Persist one record. The `info` write is atomic: a temporary
    /// file is renamed over the final name.
    pub fn write(&self, package: &Package) -> Result<(), Error> {
        let dir = self.package_dir(package.name().as_str(), package.version());
        fs::create_dir_all(&dir)?;

        let mut paragraph = package.meta.to_paragraph();
        if let Some(source) = package.source.to_str().filter(|source| !source.is_empty()) {
            paragraph.push("Source-File", source);
        }
        paragraph.push("Files", render_files(&package.files));

        let staged = dir.join(format!("{INFO_FILE}.tmp"));
        fs::write(&staged, paragraph.to_string())?;
        fs::rename(staged, dir.join(INFO_FILE))?;

        Ok(())
    }

    /// Drop the `(name, version)` subtree, and the name directory
    /// once it holds nothing else.
    pub fn remove(&self, name: &str, version: &str) -> Result<(), Error> {
        fs::remove_dir_all(self.package_dir(name, version))?;

        let name_dir = self.root.join(name);
        if fs::read_dir(&name_dir)?.next().is_none() {
            fs::remove_dir(name_dir)?;
        }

        Ok(())
    }

    /// Reload every record. Undecodable entries are skipped with a
    /// warning rather than poisoning startup; if a name somehow holds
    /// several versions the newest wins.
    pub fn load_all(&self) -> Result<Vec<Package>, Error> {
        let mut packages: Vec<Package> = vec![];

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') || !entry.file_type()?.is_dir() {
                continue;
            }

            for version_entry in fs::read_dir(entry.path())? {
                let info = version_entry?.path().join(INFO_FILE);
                let package = match load_info(&info) {
                    Ok(package) => package,
                    Err(error) => {
                        warn!("skipping undecodable store entry {}: {error}", info.display());
                        continue;
                    }
                };

                match packages.iter().position(|existing| existing.meta.name == package.meta.name) {
                    None => packages.push(package),
                    Some(position) => {
                        warn!(
                            "store holds multiple versions of {}; keeping the newest",
                            package.name()
                        );
                        if version::compare(package.version(), packages[position].version()).is_gt() {
                            packages[position] = package;
                        }
                    }
                }
            }
        }

        Ok(packages)
    }

    /// Regenerate the autocomplete index from a registry walk.
    pub fn rebuild_autocomplete<'a>(&self, names: impl Iterator<Item = &'a Name>) -> Result<(), Error> {
        let mut names = names.map(Name::as_str).collect::<Vec<_>>();
        names.sort_unstable();

        let mut contents = names.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }

        fs::write(self.autocomplete_path(), contents)?;
        Ok(())
    }
}

/// Index path under a store root, for consumers that do not open the
/// store itself.
pub fn autocomplete_path(root: &Path) -> PathBuf {
    root.join(AUTOCOMPLETE_FILE)
}

fn render_files(files: &[String]) -> String {
    files.iter().fold(String::new(), |mut list, file| {
        list.push('\n');
        list.push_str(file);
        list
    })
}

fn load_info(path: &Path) -> Result<Package, Error> {
    let text = fs::read_to_string(path)?;
    let paragraph = Paragraph::parse(&text)?;
    let meta = Meta::from_paragraph(&paragraph)?;

    let files = paragraph
        .field("Files")
        .map(|list| list.lines().filter(|line| !line.is_empty()).map(String::from).collect())
        .unwrap_or_default();
    let source = paragraph.field("Source-File").map(PathBuf::from).unwrap_or_default();

    Ok(Package {
        meta,
        source,
        files,
        control_dir: PathBuf::new(),
        data_dir: PathBuf::new(),
    })
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io")]
    Io(#[from] io::Error),

    #[error("info syntax")]
    Syntax(#[from] deb::control::Error),

    #[error("info fields")]
    Meta(#[from] package::meta::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(name: &str, version: &str, files: &[&str]) -> Package {
        let paragraph = Paragraph::parse(&format!(
            "Package: {name}\nVersion: {version}\nArchitecture: amd64\nDescription: test fixture\n line two\nX-Origin: unit test\n"
        ))
        .unwrap();

        Package {
            meta: Meta::from_paragraph(&paragraph).unwrap(),
            source: PathBuf::from(format!("/tmp/{name}_{version}_amd64.deb")),
            files: files.iter().map(|&f| f.to_owned()).collect(),
            control_dir: PathBuf::new(),
            data_dir: PathBuf::new(),
        }
    }

    #[test]
    fn write_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let package = record("foo", "1.0-2", &["usr", "usr/bin", "usr/bin/foo"]);
        store.write(&package).unwrap();

        assert!(store.info_path("foo", "1.0-2").is_file());
        assert!(!store.package_dir("foo", "1.0-2").join("info.tmp").exists());

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![package]);
    }

    #[test]
    fn empty_file_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store.write(&record("meta-only", "1.0", &[])).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded[0].files, Vec::<String>::new());
    }

    #[test]
    fn remove_clears_name_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store.write(&record("foo", "1.0", &["usr/bin/foo"])).unwrap();
        store.remove("foo", "1.0").unwrap();

        assert!(!dir.path().join("foo").exists());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn autocomplete_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let zebra = record("zebra", "1.0", &[]);
        let aardvark = record("aardvark", "2.0", &[]);
        store
            .rebuild_autocomplete([&zebra.meta.name, &aardvark.meta.name].into_iter())
            .unwrap();

        let index = fs::read_to_string(store.autocomplete_path()).unwrap();
        assert_eq!(index, "aardvark\nzebra\n");

        // Index file never surfaces as a package
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn newest_version_wins_on_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store.write(&record("foo", "1.0", &[])).unwrap();
        store.write(&record("foo", "1.1", &[])).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].version(), "1.1");
    }
}
