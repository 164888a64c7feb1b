// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use deb::control::Paragraph;
use deb::version;
use log::warn;
use thiserror::Error;

use super::{InvalidNameError, Name};

/// Scalar fields of a control paragraph. Only name and version are
/// mandatory; everything else tags along as written, including fields
/// we do not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    /// Package name
    pub name: Name,
    /// Version string, opaque except for Debian ordering
    pub version: String,
    /// Architecture this was built for
    pub architecture: Option<String>,
    pub maintainer: Option<String>,
    /// Short + extended description
    pub description: Option<String>,
    /// Raw dependency expression, parsed on demand
    pub depends: Option<String>,
    /// Unpacked size hint, kilobytes by convention
    pub installed_size: Option<u64>,
    pub section: Option<String>,
    pub priority: Option<String>,
    pub homepage: Option<String>,
    /// Uninterpreted control fields, in paragraph order
    pub extra: Vec<(String, String)>,
}

/// Fields interpreted above, plus the record-level fields the store
/// owns (`Files`, `Source-File`) which must not leak into `extra`
/// when an `info` paragraph comes back through here.
const KNOWN_FIELDS: &[&str] = &[
    "Package",
    "Version",
    "Architecture",
    "Maintainer",
    "Description",
    "Depends",
    "Installed-Size",
    "Section",
    "Priority",
    "Homepage",
    "Files",
    "Source-File",
];

impl Meta {
    pub fn from_paragraph(paragraph: &Paragraph) -> Result<Self, Error> {
        let name = paragraph.field("Package").ok_or(Error::MissingField("Package"))?;
        let name = Name::parse(name)?;

        let version = paragraph.field("Version").ok_or(Error::MissingField("Version"))?;
        version::validate(version)?;

        let installed_size = paragraph.field("Installed-Size").and_then(|value| match value.parse() {
            Ok(size) => Some(size),
            Err(_) => {
                warn!("ignoring non-numeric Installed-Size {value:?} for {name}");
                None
            }
        });

        let field = |field: &str| paragraph.field(field).map(String::from);

        let extra = paragraph
            .fields()
            .filter(|field| !KNOWN_FIELDS.iter().any(|known| field.name.eq_ignore_ascii_case(known)))
            .map(|field| (field.name.clone(), field.value.clone()))
            .collect();

        Ok(Self {
            name,
            version: version.into(),
            architecture: field("Architecture"),
            maintainer: field("Maintainer"),
            description: field("Description"),
            depends: field("Depends"),
            installed_size,
            section: field("Section"),
            priority: field("Priority"),
            homepage: field("Homepage"),
            extra,
        })
    }

    /// Render back to a paragraph, canonical fields first, extras in
    /// their original order.
    pub fn to_paragraph(&self) -> Paragraph {
        let mut paragraph = Paragraph::default();

        paragraph.push("Package", self.name.as_str());
        paragraph.push("Version", self.version.as_str());

        let mut push = |name: &str, value: &Option<String>| {
            if let Some(value) = value {
                paragraph.push(name, value.as_str());
            }
        };
        push("Architecture", &self.architecture);
        push("Maintainer", &self.maintainer);
        push("Section", &self.section);
        push("Priority", &self.priority);
        push("Homepage", &self.homepage);
        push("Depends", &self.depends);
        push("Description", &self.description);

        if let Some(size) = self.installed_size {
            paragraph.push("Installed-Size", size.to_string());
        }
        for (name, value) in &self.extra {
            paragraph.push(name.as_str(), value.as_str());
        }

        paragraph
    }

    /// Name and version only; the in-flight marker shape.
    pub fn bare(name: Name, version: impl Into<String>) -> Self {
        Self {
            name,
            version: version.into(),
            architecture: None,
            maintainer: None,
            description: None,
            depends: None,
            installed_size: None,
            section: None,
            priority: None,
            homepage: None,
            extra: vec![],
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing mandatory control field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),

    #[error("invalid version: {0}")]
    InvalidVersion(#[from] version::InvalidVersion),
}
