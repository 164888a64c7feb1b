// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Dependency evaluation against the registries.

use deb::dependency::{Atom, Dependency};
use log::warn;

use crate::registry::Registry;

/// How one atom is (or is not) accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Satisfaction {
    /// A matching package is installed
    Installed,
    /// The named install is already on the call stack; counts as
    /// satisfied to break recursion
    InFlight,
    Unsatisfied,
}

impl Satisfaction {
    pub fn is_satisfied(self) -> bool {
        !matches!(self, Self::Unsatisfied)
    }
}

/// Parse an optional dependency expression; absent means no atoms.
pub fn parse(expression: Option<&str>) -> Result<Vec<Dependency>, deb::dependency::Error> {
    expression.map(deb::dependency::parse).transpose().map(Option::unwrap_or_default)
}

/// Evaluate one atom. The installed registry is consulted first; a
/// name found there is judged there, the in-flight registry only
/// answers for names with no installed record.
pub fn evaluate(atom: &Atom, installed: &Registry, in_flight: &Registry) -> Satisfaction {
    let lookup = [
        (installed, Satisfaction::Installed),
        (in_flight, Satisfaction::InFlight),
    ];

    for (registry, satisfaction) in lookup {
        let Some(package) = registry.get(&atom.name) else {
            continue;
        };

        let Some(constraint) = &atom.constraint else {
            return satisfaction;
        };

        return match constraint.satisfied_by(package.version()) {
            Some(true) => satisfaction,
            Some(false) => Satisfaction::Unsatisfied,
            // Operator from a newer grammar: fail open
            None => {
                warn!("unknown relation in {atom}, treating as satisfied");
                satisfaction
            }
        };
    }

    Satisfaction::Unsatisfied
}

/// Whether any alternative of the requirement holds.
pub fn requirement_satisfied(requirement: &Dependency, installed: &Registry, in_flight: &Registry) -> bool {
    requirement
        .alternatives
        .iter()
        .any(|atom| evaluate(atom, installed, in_flight).is_satisfied())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::package::{Name, Package};

    fn registry(entries: &[(&str, &str)]) -> Registry {
        let mut registry = Registry::new();
        for (name, version) in entries {
            registry.insert(Package::in_flight_marker(Name::parse(*name).unwrap(), *version));
        }
        registry
    }

    fn atom(expression: &str) -> Atom {
        deb::dependency::parse(expression).unwrap().remove(0).alternatives.remove(0)
    }

    #[test]
    fn unconstrained_name() {
        let installed = registry(&[("libc6", "2.36-9")]);
        let empty = Registry::new();

        assert_eq!(evaluate(&atom("libc6"), &installed, &empty), Satisfaction::Installed);
        assert_eq!(evaluate(&atom("libfoo"), &installed, &empty), Satisfaction::Unsatisfied);
    }

    #[test]
    fn constrained_name() {
        let installed = registry(&[("libc6", "2.36-9")]);
        let empty = Registry::new();

        assert_eq!(
            evaluate(&atom("libc6 (>= 2.30)"), &installed, &empty),
            Satisfaction::Installed
        );
        assert_eq!(
            evaluate(&atom("libc6 (>= 2.37)"), &installed, &empty),
            Satisfaction::Unsatisfied
        );
        assert_eq!(
            evaluate(&atom("libc6 (<< 3)"), &installed, &empty),
            Satisfaction::Installed
        );
    }

    #[test]
    fn in_flight_breaks_recursion() {
        let installed = Registry::new();
        let in_flight = registry(&[("self-dep", "1.0")]);

        assert_eq!(
            evaluate(&atom("self-dep"), &installed, &in_flight),
            Satisfaction::InFlight
        );
    }

    #[test]
    fn unknown_operator_fails_open() {
        let installed = registry(&[("odd", "1.0")]);
        let empty = Registry::new();

        assert_eq!(evaluate(&atom("odd (?= 9.9)"), &installed, &empty), Satisfaction::Installed);
    }

    #[test]
    fn alternatives_any() {
        let installed = registry(&[("postfix", "3.7")]);
        let empty = Registry::new();

        let requirement = deb::dependency::parse("exim4 | postfix").unwrap().remove(0);
        assert!(requirement_satisfied(&requirement, &installed, &empty));

        let requirement = deb::dependency::parse("exim4 | sendmail").unwrap().remove(0);
        assert!(!requirement_satisfied(&requirement, &installed, &empty));
    }

    #[test]
    fn empty_expression_is_trivially_satisfied() {
        assert_eq!(parse(None).unwrap(), vec![]);
        assert_eq!(parse(Some("")).unwrap(), vec![]);
    }
}
