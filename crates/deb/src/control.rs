// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! RFC-822-style control paragraphs.
//!
//! `Field: value` lines with continuation lines indented by a single
//! space or tab. Field order is preserved and unknown fields ride
//! along untouched, so a paragraph can be rewritten without loss.
//! The persistent store reuses this syntax for its `info` files.

use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

/// One field of a paragraph. Multi-line values hold embedded
/// newlines; the leading indent of continuation lines is stripped
/// on parse and restored on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// An ordered set of fields terminated by a blank line or EOF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    fields: Vec<Field>,
}

impl Paragraph {
    /// Parse the first paragraph of `text`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut fields: Vec<Field> = vec![];
        let mut started = false;

        for line in text.lines() {
            if line.trim().is_empty() {
                if started {
                    break;
                }
                continue;
            }
            started = true;

            if let Some(continuation) = line.strip_prefix([' ', '\t']) {
                let Some(last) = fields.last_mut() else {
                    return Err(Error::OrphanContinuation(line.into()));
                };
                last.value.push('\n');
                last.value.push_str(continuation);
            } else {
                let (name, value) = line.split_once(':').ok_or_else(|| Error::MalformedLine(line.into()))?;
                if name.trim().is_empty() {
                    return Err(Error::MalformedLine(line.into()));
                }
                fields.push(Field {
                    name: name.trim().into(),
                    value: value.trim().into(),
                });
            }
        }

        if fields.is_empty() {
            return Err(Error::Empty);
        }

        Ok(Self { fields })
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
            .map(|field| field.value.as_str())
    }

    /// Append a field, preserving insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        write!(writer, "{self}")
    }
}

impl fmt::Display for Paragraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            let mut lines = field.value.split('\n');
            match lines.next() {
                Some("") | None => writeln!(f, "{}:", field.name)?,
                Some(first) => writeln!(f, "{}: {first}", field.name)?,
            }
            for line in lines {
                writeln!(f, " {line}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("control data holds no fields")]
    Empty,

    #[error("junk line in control data: {0:?}")]
    MalformedLine(String),

    #[error("continuation line before any field: {0:?}")]
    OrphanContinuation(String),
}
