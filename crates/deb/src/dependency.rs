// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The dependency expression grammar.
//!
//! An expression is a comma-separated list of requirements; each
//! requirement is a pipe-separated list of alternative atoms; an atom
//! is `name` or `name (op version)`. Whitespace around separators is
//! insignificant.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::{valid_package_name, version};

/// A comparison operator inside a constraint.
///
/// The legacy single-character forms `<` and `>` mean `<=` and `>=`.
/// Anything else is carried as [`Relation::Other`] so callers can
/// apply their own forward-compatibility policy instead of failing
/// the parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation {
    StrictlyEarlier,
    EarlierOrEqual,
    Equal,
    LaterOrEqual,
    StrictlyLater,
    Other(String),
}

impl Relation {
    fn parse(op: &str) -> Self {
        match op {
            "<<" => Self::StrictlyEarlier,
            "<=" | "<" => Self::EarlierOrEqual,
            "=" => Self::Equal,
            ">=" | ">" => Self::LaterOrEqual,
            ">>" => Self::StrictlyLater,
            other => Self::Other(other.into()),
        }
    }

    /// Whether an installed-vs-wanted [`Ordering`] satisfies this
    /// relation. `None` for [`Relation::Other`].
    pub fn allows(&self, ordering: Ordering) -> Option<bool> {
        Some(match self {
            Self::StrictlyEarlier => ordering == Ordering::Less,
            Self::EarlierOrEqual => ordering != Ordering::Greater,
            Self::Equal => ordering == Ordering::Equal,
            Self::LaterOrEqual => ordering != Ordering::Less,
            Self::StrictlyLater => ordering == Ordering::Greater,
            Self::Other(_) => return None,
        })
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StrictlyEarlier => "<<".fmt(f),
            Self::EarlierOrEqual => "<=".fmt(f),
            Self::Equal => "=".fmt(f),
            Self::LaterOrEqual => ">=".fmt(f),
            Self::StrictlyLater => ">>".fmt(f),
            Self::Other(op) => op.fmt(f),
        }
    }
}

/// `(op version)` of a versioned atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub relation: Relation,
    pub version: String,
}

impl Constraint {
    /// Evaluate against an installed version. `None` when the
    /// relation is unknown to us.
    pub fn satisfied_by(&self, installed: &str) -> Option<bool> {
        self.relation.allows(version::compare(installed, &self.version))
    }
}

/// One `name` or `name (op version)` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub name: String,
    pub constraint: Option<Constraint>,
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(constraint) => write!(f, "{} ({} {})", self.name, constraint.relation, constraint.version),
            None => self.name.fmt(f),
        }
    }
}

/// One comma-separated requirement: a non-empty list of alternatives,
/// satisfied when any alternative is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub alternatives: Vec<Atom>,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, atom) in self.alternatives.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            atom.fmt(f)?;
        }
        Ok(())
    }
}

/// Parse a full dependency expression. The empty expression is the
/// empty list.
pub fn parse(expression: &str) -> Result<Vec<Dependency>, Error> {
    expression
        .split(',')
        .map(str::trim)
        .filter(|requirement| !requirement.is_empty())
        .map(parse_requirement)
        .collect()
}

fn parse_requirement(requirement: &str) -> Result<Dependency, Error> {
    let alternatives = requirement
        .split('|')
        .map(str::trim)
        .filter(|atom| !atom.is_empty())
        .map(parse_atom)
        .collect::<Result<Vec<_>, _>>()?;

    if alternatives.is_empty() {
        return Err(Error::EmptyRequirement(requirement.into()));
    }

    Ok(Dependency { alternatives })
}

fn parse_atom(atom: &str) -> Result<Atom, Error> {
    let (name, constraint) = match atom.split_once('(') {
        None => (atom.trim(), None),
        Some((name, rest)) => {
            let inner = rest
                .trim_end()
                .strip_suffix(')')
                .ok_or_else(|| Error::UnterminatedConstraint(atom.into()))?
                .trim();

            // Operator and version may abut: `(>=1.0)` is accepted
            let split = inner
                .find(|c: char| c.is_ascii_alphanumeric() || c == '~')
                .ok_or_else(|| Error::MissingVersion(atom.into()))?;
            let (op, wanted) = inner.split_at(split);
            let op = op.trim();
            if op.is_empty() {
                return Err(Error::MissingOperator(atom.into()));
            }

            (
                name.trim(),
                Some(Constraint {
                    relation: Relation::parse(op),
                    version: wanted.trim().into(),
                }),
            )
        }
    };

    if !valid_package_name(name) {
        return Err(Error::InvalidName(name.into()));
    }

    Ok(Atom {
        name: name.into(),
        constraint,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("requirement has no atoms: {0:?}")]
    EmptyRequirement(String),

    #[error("invalid package name: {0:?}")]
    InvalidName(String),

    #[error("unterminated constraint: {0:?}")]
    UnterminatedConstraint(String),

    #[error("constraint is missing an operator: {0:?}")]
    MissingOperator(String),

    #[error("constraint is missing a version: {0:?}")]
    MissingVersion(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_expression() {
        assert_eq!(parse("").unwrap(), vec![]);
        assert_eq!(parse("  ,  ").unwrap(), vec![]);
    }

    #[test]
    fn plain_names() {
        let deps = parse("libc6, zlib1g").unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].alternatives[0].name, "libc6");
        assert!(deps[0].alternatives[0].constraint.is_none());
        assert_eq!(deps[1].alternatives[0].name, "zlib1g");
    }

    #[test]
    fn constraints() {
        let deps = parse("libssl3 (>= 3.0.0) , foo (<< 2) , bar(=1.0)").unwrap();

        let ssl = &deps[0].alternatives[0];
        assert_eq!(ssl.name, "libssl3");
        assert_eq!(
            ssl.constraint,
            Some(Constraint {
                relation: Relation::LaterOrEqual,
                version: "3.0.0".into()
            })
        );

        assert_eq!(deps[1].alternatives[0].constraint.as_ref().unwrap().relation, Relation::StrictlyEarlier);
        assert_eq!(deps[2].alternatives[0].constraint.as_ref().unwrap().relation, Relation::Equal);
    }

    #[test]
    fn legacy_operators() {
        let deps = parse("a (< 1.0), b (> 2.0)").unwrap();
        assert_eq!(deps[0].alternatives[0].constraint.as_ref().unwrap().relation, Relation::EarlierOrEqual);
        assert_eq!(deps[1].alternatives[0].constraint.as_ref().unwrap().relation, Relation::LaterOrEqual);
    }

    #[test]
    fn alternatives() {
        let deps = parse("mail-transport-agent | postfix (>= 3.0)").unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].alternatives.len(), 2);
        assert_eq!(deps[0].alternatives[0].name, "mail-transport-agent");
        assert_eq!(deps[0].alternatives[1].name, "postfix");
    }

    #[test]
    fn unknown_operator_is_preserved() {
        let deps = parse("weird (?= 1.0)").unwrap();
        let constraint = deps[0].alternatives[0].constraint.as_ref().unwrap();
        assert_eq!(constraint.relation, Relation::Other("?=".into()));
        assert_eq!(constraint.satisfied_by("1.0"), None);
    }

    #[test]
    fn constraint_evaluation() {
        let deps = parse("x (>= 1.2)").unwrap();
        let constraint = deps[0].alternatives[0].constraint.as_ref().unwrap();
        assert_eq!(constraint.satisfied_by("1.2"), Some(true));
        assert_eq!(constraint.satisfied_by("1.10"), Some(true));
        assert_eq!(constraint.satisfied_by("1.1"), Some(false));
    }

    #[test]
    fn malformed() {
        assert!(matches!(parse("a (>= 1.0"), Err(Error::UnterminatedConstraint(_))));
        assert!(matches!(parse("a (1.0)"), Err(Error::MissingOperator(_))));
        assert!(matches!(parse("a (>=)"), Err(Error::MissingVersion(_))));
        assert!(matches!(parse("_bad"), Err(Error::InvalidName(_))));
    }

    #[test]
    fn rendering() {
        let deps = parse("a | b (>= 1.0)").unwrap();
        assert_eq!(deps[0].to_string(), "a | b (>= 1.0)");
    }
}
