// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The install engine.
//!
//! One call drives one archive through: path resolution, a filename
//! fast path, extraction, duplicate/upgrade handling, in-flight
//! marking, dependency resolution (with recursive sibling installs),
//! persistence, registry insertion and payload materialization.
//! Failures after the in-flight mark always unmark before returning,
//! and staging is discarded on every exit.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use fs_err as fs;
use log::{debug, info, warn};
use thiserror::Error;

use deb::control::Paragraph;
use deb::dependency::Dependency;

use crate::client::{materialize, sibling, Client};
use crate::dependency::{self, Satisfaction};
use crate::package::{self, Meta, Package};
use crate::{environment, store};

/// Bookkeeping shared between a top-level call and the recursive
/// sibling installs it spawns.
struct Context {
    force: bool,
    /// Sibling archives already handed to the engine
    attempted: HashSet<PathBuf>,
}

/// Install a batch serially. Arguments may be concrete paths or glob
/// patterns; each resolved archive runs as its own top-level install.
pub(super) fn install(client: &mut Client, inputs: &[String], force: bool) -> Result<(), Error> {
    if client.installation.read_only() {
        return Err(Error::ReadOnly);
    }

    let mut context = Context {
        force,
        attempted: HashSet::new(),
    };

    for path in resolve_inputs(inputs)? {
        install_archive(client, &path, true, &mut context)?;
    }

    Ok(())
}

/// Parse an archive without installing it.
pub(super) fn inspect(client: &Client, path: &Path) -> Result<Package, Error> {
    let staging = client.installation.staging_dir(".inspect");
    let record = read_archive(path, &staging);
    let _ = fs::remove_dir_all(&staging);
    record
}

fn resolve_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, Error> {
    let mut paths = vec![];

    for input in inputs {
        if input.contains(['*', '?', '[']) {
            let mut matched = glob::glob(input)?
                .flatten()
                .filter(|path| is_archive_path(path))
                .collect::<Vec<_>>();
            if matched.is_empty() {
                return Err(Error::NoMatches(input.clone()));
            }
            matched.sort();
            paths.extend(matched);
        } else {
            paths.push(PathBuf::from(input));
        }
    }

    Ok(paths)
}

fn is_archive_path(path: &Path) -> bool {
    path.is_file() && path.extension() == Some(OsStr::new("deb"))
}

fn install_archive(client: &mut Client, path: &Path, top_level: bool, context: &mut Context) -> Result<(), Error> {
    // ResolvePath: only concrete regular .deb files get this far
    if !is_archive_path(path) {
        return Err(Error::NotAnArchive(path.to_owned()));
    }

    // FastCheck: skip extraction entirely when the basename already
    // names an installed version
    if !context.force {
        if let Some((name, version, _)) = path.file_name().and_then(OsStr::to_str).and_then(deb::split_file_name) {
            if client.installed.get(name).is_some_and(|p| p.version() == version) {
                if top_level {
                    println!("Package {name} ({version}) is already installed.");
                }
                return Ok(());
            }
        }
    }

    let started = Instant::now();

    // Extract into per-package staging
    let base = path.file_stem().and_then(OsStr::to_str).unwrap_or("package");
    let staging = client.installation.staging_dir(base);
    let record = match read_archive(path, &staging) {
        Ok(record) => record,
        Err(error) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(error);
        }
    };
    info!("parsed {} ({}) from {}", record.name(), record.version(), path.display());
    info!("record: {record:#?}");

    let result = activate(client, &record, top_level, context);

    // Success or failure, staging is gone once the call returns
    let _ = fs::remove_dir_all(&staging);

    if result.is_ok() {
        info!("installed {} ({}) in {:?}", record.name(), record.version(), started.elapsed());
    }

    result
}

/// DupeCheck onwards; assumes an extracted record.
fn activate(client: &mut Client, record: &Package, top_level: bool, context: &mut Context) -> Result<(), Error> {
    let name = record.name().clone();
    let version = record.version().to_owned();

    // Recursion break: this name is already installing further up
    // the stack
    if client.in_flight.contains(name.as_str()) {
        debug!("{name} is already in flight, skipping");
        return Ok(());
    }

    let mut upgraded_from = None;
    if client.installed.contains(name.as_str()) {
        if !context.force {
            if top_level && !recently_installed(client, record) {
                println!("Package {name} ({}) is already installed.", installed_version(client, &name));
            }
            return Ok(());
        }

        // Upgrade: retire the old version ahead of the reinstall.
        // Store first: a failure here leaves both views untouched.
        let old_version = installed_version(client, &name);
        client.store.remove(name.as_str(), &old_version)?;
        client.installed.remove(name.as_str());
        upgraded_from = Some(old_version);
    }

    match &upgraded_from {
        Some(old) => eprintln!("Upgrading {name} from {old} to {version}"),
        None => println!("Selecting previously unselected package {name}."),
    }

    // MarkInFlight: present for exactly the rest of this call
    client.in_flight.insert(Package::in_flight_marker(name.clone(), version.clone()));
    let result = complete(client, record, top_level, context);
    client.in_flight.remove(name.as_str());

    result
}

/// ResolveDeps through Finish, with the in-flight mark held.
fn complete(client: &mut Client, record: &Package, top_level: bool, context: &mut Context) -> Result<(), Error> {
    let name = record.name().clone();
    let version = record.version().to_owned();

    resolve_dependencies(client, record, top_level, context)?;

    // Persist before the registry so a crash in between is repaired
    // by the next startup reload
    client.store.write(record)?;

    let mut installed = record.clone();
    installed.control_dir = PathBuf::new();
    installed.data_dir = PathBuf::new();
    client.installed.insert(installed);

    println!("Unpacking {name} ({version}) ...");
    let errors = materialize::materialize(&record.data_dir, &record.files, &client.installation.install_root)?;
    if errors > 0 {
        warn!("{errors} payload entries of {name} could not be materialized");
    }

    client.store.rebuild_autocomplete(client.installed.iter().map(Package::name))?;

    Ok(())
}

fn resolve_dependencies(
    client: &mut Client,
    record: &Package,
    top_level: bool,
    context: &mut Context,
) -> Result<(), Error> {
    let requirements = dependency::parse(record.meta.depends.as_deref())?;
    let mut unsatisfied = vec![];

    for requirement in requirements {
        if dependency::requirement_satisfied(&requirement, &client.installed, &client.in_flight) {
            // At top level, force mode re-examines satisfied atoms:
            // a sibling archive triggers a reinstall. Recursive calls
            // never do, which is what keeps forced batches acyclic.
            if top_level && context.force {
                reinstall_satisfied(client, &requirement, record, context);
            }
            continue;
        }

        // Conservative policy: only the first alternative is ever
        // actively pulled from siblings
        if let Some(first) = requirement.alternatives.first() {
            if let Some(candidate) = sibling::find(&first.name, &record.source, &context.attempted) {
                context.attempted.insert(candidate.clone());
                if let Err(error) = install_archive(client, &candidate, false, context) {
                    debug!("sibling install {} failed: {error}", candidate.display());
                }
            }
        }

        if !dependency::requirement_satisfied(&requirement, &client.installed, &client.in_flight) {
            unsatisfied.push(requirement);
        }
    }

    if unsatisfied.is_empty() {
        return Ok(());
    }

    if context.force {
        for requirement in &unsatisfied {
            warn!("{}: ignoring unsatisfied dependency: {requirement}", record.name());
        }
        return Ok(());
    }

    Err(Error::UnsatisfiedDependencies(
        unsatisfied.iter().map(Dependency::to_string).collect(),
    ))
}

/// Forced reinstall of the first alternative that is satisfied by an
/// installed record, when a sibling archive for it exists.
fn reinstall_satisfied(client: &mut Client, requirement: &Dependency, record: &Package, context: &mut Context) {
    let satisfied_installed = requirement
        .alternatives
        .iter()
        .find(|atom| dependency::evaluate(atom, &client.installed, &client.in_flight) == Satisfaction::Installed);

    let Some(atom) = satisfied_installed else {
        return;
    };
    let Some(candidate) = sibling::find(&atom.name, &record.source, &context.attempted) else {
        return;
    };

    context.attempted.insert(candidate.clone());
    if let Err(error) = install_archive(client, &candidate, false, context) {
        debug!("sibling reinstall {} failed: {error}", candidate.display());
    }
}

fn recently_installed(client: &Client, record: &Package) -> bool {
    let version = installed_version(client, record.name());
    client
        .store
        .modified(record.name().as_str(), &version)
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age < environment::RECENT_INSTALL_WINDOW)
}

fn installed_version(client: &Client, name: &package::Name) -> String {
    client
        .installed
        .get(name.as_str())
        .map(|package| package.version().to_owned())
        .unwrap_or_default()
}

/// Archive Reader: extract into `<staging>/{control,data}` and build
/// the record.
fn read_archive(path: &Path, staging: &Path) -> Result<Package, Error> {
    let control_dir = staging.join("control");
    let data_dir = staging.join("data");

    deb::extract(path, &control_dir, &data_dir)?;

    let control = control_dir.join("control");
    let text = fs::read_to_string(&control).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => Error::MissingControlFile,
        _ => Error::Io(error),
    })?;
    let paragraph = Paragraph::parse(&text)?;
    let meta = Meta::from_paragraph(&paragraph)?;

    Ok(Package {
        meta,
        source: path.to_owned(),
        files: walk_files(&data_dir)?,
        control_dir,
        data_dir,
    })
}

/// Sorted recursive walk of the data tree, parents before children,
/// paths relative to the data root.
fn walk_files(data_dir: &Path) -> Result<Vec<String>, Error> {
    fn walk(root: &Path, dir: &Path, files: &mut Vec<String>) -> Result<(), Error> {
        let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let Some(relative) = path.strip_prefix(root).ok().and_then(Path::to_str) else {
                warn!("skipping non-unicode payload path {path:?}");
                continue;
            };
            files.push(relative.to_owned());

            if entry.file_type()?.is_dir() {
                walk(root, &path, files)?;
            }
        }

        Ok(())
    }

    let mut files = vec![];
    walk(data_dir, data_dir, &mut files)?;
    Ok(files)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("system is read-only")]
    ReadOnly,

    #[error("not a .deb archive: {0:?}")]
    NotAnArchive(PathBuf),

    #[error("nothing matches pattern {0:?}")]
    NoMatches(String),

    #[error("bad glob pattern")]
    Pattern(#[from] glob::PatternError),

    #[error("archive")]
    Archive(#[from] deb::Error),

    #[error("missing control file")]
    MissingControlFile,

    #[error("control")]
    Control(#[from] deb::control::Error),

    #[error("metadata")]
    Meta(#[from] package::meta::Error),

    #[error("dependency expression")]
    Grammar(#[from] deb::dependency::Error),

    #[error("unsatisfied dependencies: {}", .0.join(", "))]
    UnsatisfiedDependencies(Vec<String>),

    #[error("store")]
    Store(#[from] store::Error),

    #[error("materialize")]
    Materialize(#[from] materialize::Error),

    #[error("io")]
    Io(#[from] io::Error),
}

impl Error {
    /// Stable exit-code class for the process boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io(_) | Error::ReadOnly | Error::Store(store::Error::Io(_)) | Error::Materialize(_) => 1,
            Error::Archive(error) if !error.is_format() => 1,
            Error::Archive(_)
            | Error::MissingControlFile
            | Error::Control(_)
            | Error::Meta(_)
            | Error::Grammar(_)
            | Error::Store(_) => 2,
            Error::UnsatisfiedDependencies(_) => 3,
            Error::NotAnArchive(_) | Error::NoMatches(_) | Error::Pattern(_) => 4,
        }
    }
}
