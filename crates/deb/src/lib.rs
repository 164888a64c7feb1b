// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Reading of Debian binary package archives.
//!
//! A `.deb` is an `ar(5)` container wrapping a `debian-binary` format
//! marker, a `control.tar[.gz|.xz|.zst]` of package metadata and a
//! `data.tar[.gz|.xz|.zst]` payload. [`extract`] unpacks both
//! tarballs into caller-provided staging directories in one
//! sequential pass; the sibling modules cover the control syntax,
//! the dependency grammar and version ordering.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use ar::Archive;
use log::trace;
use thiserror::Error;

pub use self::control::Paragraph;

pub mod control;
pub mod dependency;
pub mod version;

/// Compression of a tar member, derived from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    Plain,
    Gzip,
    Xz,
    Zstd,
}

impl Compression {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "" => Some(Self::Plain),
            ".gz" => Some(Self::Gzip),
            ".xz" => Some(Self::Xz),
            ".zst" | ".zstd" => Some(Self::Zstd),
            _ => None,
        }
    }
}

/// Unpack the control and data trees of the archive at `path` into
/// `control_dir` and `data_dir`.
///
/// Both directories are created. Modes are preserved as far as an
/// unprivileged caller can express them and symlink targets are taken
/// verbatim. On error the partially written directories are left for
/// the caller to discard with its staging area.
pub fn extract(path: &Path, control_dir: &Path, data_dir: &Path) -> Result<(), Error> {
    let file = File::open(path)?;
    let mut archive = Archive::new(file);

    let mut seen_marker = false;
    let mut seen_control = false;
    let mut seen_data = false;

    while let Some(entry) = archive.next_entry() {
        let mut entry = entry.map_err(malformed)?;
        let name = String::from_utf8_lossy(entry.header().identifier()).into_owned();
        // BSD ar appends a trailing slash to member names
        let name = name.trim_end_matches('/');

        if name == "debian-binary" {
            let mut marker = String::new();
            entry.read_to_string(&mut marker)?;
            if !marker.trim_end().starts_with("2.") {
                return Err(Error::FormatVersion(marker.trim_end().into()));
            }
            seen_marker = true;
        } else if let Some(extension) = name.strip_prefix("control.tar") {
            let compression =
                Compression::from_extension(extension).ok_or_else(|| Error::UnsupportedCompression(name.into()))?;
            unpack_tar(&mut entry, compression, control_dir)?;
            seen_control = true;
        } else if let Some(extension) = name.strip_prefix("data.tar") {
            let compression =
                Compression::from_extension(extension).ok_or_else(|| Error::UnsupportedCompression(name.into()))?;
            unpack_tar(&mut entry, compression, data_dir)?;
            seen_data = true;
        } else {
            // dpkg tolerates unknown members (signatures etc)
            trace!("skipping archive member {name:?}");
        }
    }

    if !seen_marker {
        return Err(Error::MissingMember("debian-binary"));
    }
    if !seen_control {
        return Err(Error::MissingMember("control.tar"));
    }
    if !seen_data {
        return Err(Error::MissingMember("data.tar"));
    }

    Ok(())
}

fn unpack_tar(reader: &mut impl Read, compression: Compression, dir: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(dir)?;

    let reader: Box<dyn Read + '_> = match compression {
        Compression::Plain => Box::new(reader),
        Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
        Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
        Compression::Zstd => Box::new(zstd::Decoder::new(reader)?),
    };

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.unpack(dir).map_err(malformed)?;

    Ok(())
}

/// The `ar` and `tar` readers surface structural problems as
/// `InvalidData` IO errors; lift those into the format class.
fn malformed(error: io::Error) -> Error {
    if error.kind() == io::ErrorKind::InvalidData {
        Error::Malformed(error.to_string())
    } else {
        Error::Io(error)
    }
}

/// Check a package name against policy: `[A-Za-z0-9][A-Za-z0-9+.-]*`.
pub fn valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphanumeric() && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

/// Split a `<name>_<version>_<arch>.deb` basename into its tokens.
///
/// The version token of the filename uses `%3a` for the epoch colon
/// per convention; callers compare it textually, so no decoding
/// happens here.
pub fn split_file_name(file_name: &str) -> Option<(&str, &str, &str)> {
    let stem = file_name.strip_suffix(".deb")?;
    let mut tokens = stem.splitn(3, '_');
    let name = tokens.next()?;
    let version = tokens.next()?;
    let arch = tokens.next().unwrap_or("");
    (!name.is_empty() && !version.is_empty()).then_some((name, version, arch))
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io")]
    Io(#[from] io::Error),

    #[error("malformed archive: {0}")]
    Malformed(String),

    #[error("missing archive member: {0}")]
    MissingMember(&'static str),

    #[error("unsupported member compression: {0:?}")]
    UnsupportedCompression(String),

    #[error("unsupported debian-binary version: {0:?}")]
    FormatVersion(String),
}

impl Error {
    /// Whether this is a structural problem with the archive rather
    /// than an IO failure.
    pub fn is_format(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn tar_bytes(entries: &[(&str, &str)], symlinks: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(vec![]);

        for (path, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, path, content.as_bytes()).unwrap();
        }
        for (path, target) in symlinks {
            let mut header = tar::Header::new_gnu();
            header.set_size(0);
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_mode(0o777);
            header.set_cksum();
            builder.append_link(&mut header, path, target).unwrap();
        }

        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(vec![], flate2::Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn write_deb(path: &Path, control_tar: &[u8], data_tar: &[u8]) {
        let mut builder = ar::Builder::new(File::create(path).unwrap());
        builder
            .append(&ar::Header::new(b"debian-binary".to_vec(), 4), &b"2.0\n"[..])
            .unwrap();
        builder
            .append(
                &ar::Header::new(b"control.tar.gz".to_vec(), control_tar.len() as u64),
                control_tar,
            )
            .unwrap();
        builder
            .append(&ar::Header::new(b"data.tar.gz".to_vec(), data_tar.len() as u64), data_tar)
            .unwrap();
    }

    #[test]
    fn extracts_both_trees() {
        let dir = tempfile::tempdir().unwrap();
        let deb = dir.path().join("demo_1.0_amd64.deb");

        let control = gzip(&tar_bytes(&[("./control", "Package: demo\nVersion: 1.0\n")], &[]));
        let data = gzip(&tar_bytes(
            &[("./usr/bin/demo", "#!/bin/sh\n")],
            &[("./usr/bin/demo-alias", "demo")],
        ));
        write_deb(&deb, &control, &data);

        let control_dir = dir.path().join("control");
        let data_dir = dir.path().join("data");
        extract(&deb, &control_dir, &data_dir).unwrap();

        let paragraph = Paragraph::parse(&fs::read_to_string(control_dir.join("control")).unwrap()).unwrap();
        assert_eq!(paragraph.field("Package"), Some("demo"));

        let binary = data_dir.join("usr/bin/demo");
        assert_eq!(fs::read_to_string(&binary).unwrap(), "#!/bin/sh\n");
        assert_eq!(fs::metadata(&binary).unwrap().permissions().mode() & 0o777, 0o755);

        let alias = data_dir.join("usr/bin/demo-alias");
        assert_eq!(fs::read_link(&alias).unwrap().to_str(), Some("demo"));
    }

    #[test]
    fn rejects_missing_member() {
        let dir = tempfile::tempdir().unwrap();
        let deb = dir.path().join("broken_1.0_amd64.deb");

        let control = gzip(&tar_bytes(&[("./control", "Package: broken\n")], &[]));
        let mut builder = ar::Builder::new(File::create(&deb).unwrap());
        builder
            .append(&ar::Header::new(b"debian-binary".to_vec(), 4), &b"2.0\n"[..])
            .unwrap();
        builder
            .append(&ar::Header::new(b"control.tar.gz".to_vec(), control.len() as u64), &control[..])
            .unwrap();
        drop(builder);

        let result = extract(&deb, &dir.path().join("c"), &dir.path().join("d"));
        assert!(matches!(result, Err(Error::MissingMember("data.tar"))));
    }

    #[test]
    fn rejects_non_archive() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus_1.0_amd64.deb");
        fs::write(&bogus, "definitely not an ar archive").unwrap();

        let result = extract(&bogus, &dir.path().join("c"), &dir.path().join("d"));
        assert!(result.as_ref().err().is_some_and(Error::is_format), "{result:?}");
    }

    #[test]
    fn rejects_wrong_format_version() {
        let dir = tempfile::tempdir().unwrap();
        let deb = dir.path().join("old_1.0_amd64.deb");

        let mut builder = ar::Builder::new(File::create(&deb).unwrap());
        builder
            .append(&ar::Header::new(b"debian-binary".to_vec(), 4), &b"1.0\n"[..])
            .unwrap();
        drop(builder);

        let result = extract(&deb, &dir.path().join("c"), &dir.path().join("d"));
        assert!(matches!(result, Err(Error::FormatVersion(_))));
    }

    #[test]
    fn file_name_tokens() {
        assert_eq!(split_file_name("foo_1.0-2_amd64.deb"), Some(("foo", "1.0-2", "amd64")));
        assert_eq!(split_file_name("foo_1.0.deb"), Some(("foo", "1.0", "")));
        assert_eq!(split_file_name("foo.deb"), None);
        assert_eq!(split_file_name("foo_1.0_amd64.tar"), None);
    }

    #[test]
    fn package_names() {
        assert!(valid_package_name("zlib1g"));
        assert!(valid_package_name("libstdc++6"));
        assert!(valid_package_name("0ad"));
        assert!(!valid_package_name(""));
        assert!(!valid_package_name("-dash-first"));
        assert!(!valid_package_name("under_score"));
    }
}
