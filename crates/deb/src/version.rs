// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Debian version ordering.
//!
//! Versions have the shape `[epoch:]upstream[-revision]` and compare
//! per the dpkg rules: epochs numerically, then upstream and revision
//! as alternating non-digit and digit runs where `~` sorts before
//! everything (including the end of the string) and letters sort
//! before non-letters.

use std::cmp::Ordering;

use thiserror::Error;

/// Compare two version strings.
///
/// Total over all inputs; malformed pieces degrade gracefully
/// (a non-numeric epoch counts as zero) so ordering never fails
/// mid-resolution. Use [`validate`] to reject malformed versions
/// at parse boundaries.
pub fn compare(left: &str, right: &str) -> Ordering {
    let (left_epoch, left_upstream, left_revision) = split(left);
    let (right_epoch, right_upstream, right_revision) = split(right);

    left_epoch
        .cmp(&right_epoch)
        .then_with(|| verrevcmp(left_upstream, right_upstream))
        .then_with(|| verrevcmp(left_revision, right_revision))
}

/// Check a version string against the allowed shape.
pub fn validate(version: &str) -> Result<(), InvalidVersion> {
    if version.is_empty() {
        return Err(InvalidVersion::Empty);
    }

    let (epoch, remainder) = match version.split_once(':') {
        Some((epoch, remainder)) => (Some(epoch), remainder),
        None => (None, version),
    };
    let (upstream, revision) = match remainder.rsplit_once('-') {
        Some((upstream, revision)) => (upstream, Some(revision)),
        None => (remainder, None),
    };

    if let Some(epoch) = epoch {
        if epoch.is_empty() || !epoch.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidVersion::Epoch(version.into()));
        }
    }

    // Hyphens in upstream are only valid when a revision terminates the string
    let upstream_ok = !upstream.is_empty()
        && upstream.chars().all(|c| match c {
            c if c.is_ascii_alphanumeric() => true,
            '.' | '+' | '~' => true,
            '-' => revision.is_some(),
            _ => false,
        });
    if !upstream_ok {
        return Err(InvalidVersion::Upstream(version.into()));
    }

    if let Some(revision) = revision {
        let revision_ok = !revision.is_empty()
            && revision.chars().all(|c| match c {
                c if c.is_ascii_alphanumeric() => true,
                '.' | '+' | '~' => true,
                _ => false,
            });
        if !revision_ok {
            return Err(InvalidVersion::Revision(version.into()));
        }
    }

    Ok(())
}

/// Break a version into `(epoch, upstream, revision)`.
///
/// An absent revision compares as `0` per policy.
fn split(version: &str) -> (u64, &str, &str) {
    let (epoch, remainder) = match version.split_once(':') {
        Some((epoch, remainder)) => (epoch.parse().unwrap_or(0), remainder),
        None => (0, version),
    };
    let (upstream, revision) = match remainder.rsplit_once('-') {
        Some((upstream, revision)) => (upstream, revision),
        None => (remainder, "0"),
    };
    (epoch, upstream, revision)
}

/// Weight of a character in a non-digit run.
fn order(c: u8) -> i32 {
    match c {
        b'~' => -1,
        c if c.is_ascii_digit() => 0,
        c if c.is_ascii_alphabetic() => i32::from(c),
        c => i32::from(c) + 256,
    }
}

/// dpkg's `verrevcmp` over one upstream or revision component.
fn verrevcmp(left: &str, right: &str) -> Ordering {
    let mut left = left.as_bytes();
    let mut right = right.as_bytes();

    while !left.is_empty() || !right.is_empty() {
        // Non-digit run: weighted lexical compare, end-of-string weighs 0
        // so a trailing `~` loses to nothing at all
        while left.first().is_some_and(|c| !c.is_ascii_digit())
            || right.first().is_some_and(|c| !c.is_ascii_digit())
        {
            let l = left.first().map_or(0, |&c| order(c));
            let r = right.first().map_or(0, |&c| order(c));
            match l.cmp(&r) {
                Ordering::Equal => {}
                diff => return diff,
            }
            left = advance(left);
            right = advance(right);
        }

        // Digit run: numeric compare without materializing integers,
        // so absurdly long version numbers cannot overflow
        while left.first() == Some(&b'0') {
            left = &left[1..];
        }
        while right.first() == Some(&b'0') {
            right = &right[1..];
        }

        let mut first_diff = Ordering::Equal;
        while left.first().is_some_and(u8::is_ascii_digit) && right.first().is_some_and(u8::is_ascii_digit) {
            if first_diff == Ordering::Equal {
                first_diff = left[0].cmp(&right[0]);
            }
            left = &left[1..];
            right = &right[1..];
        }
        if left.first().is_some_and(u8::is_ascii_digit) {
            return Ordering::Greater;
        }
        if right.first().is_some_and(u8::is_ascii_digit) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

fn advance(s: &[u8]) -> &[u8] {
    if s.is_empty() {
        s
    } else {
        &s[1..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidVersion {
    #[error("version is empty")]
    Empty,

    #[error("epoch is not numeric: {0:?}")]
    Epoch(String),

    #[error("upstream version has an illegal character: {0:?}")]
    Upstream(String),

    #[error("revision has an illegal character: {0:?}")]
    Revision(String),
}

#[cfg(test)]
mod test {
    use super::*;

    fn less(a: &str, b: &str) {
        assert_eq!(compare(a, b), Ordering::Less, "{a} << {b}");
        assert_eq!(compare(b, a), Ordering::Greater, "{b} >> {a}");
    }

    fn equal(a: &str, b: &str) {
        assert_eq!(compare(a, b), Ordering::Equal, "{a} = {b}");
        assert_eq!(compare(b, a), Ordering::Equal, "{b} = {a}");
    }

    #[test]
    fn numeric_runs() {
        less("1.0", "1.1");
        less("1.2.3", "1.2.10");
        less("2.5", "2.50");
        equal("1.02", "1.2");
        equal("1.0", "1.0");
    }

    #[test]
    fn revisions() {
        less("1.0", "1.0-1");
        less("1.0-1", "1.0-2");
        less("1.0-1", "1.0-1.1");
        equal("1.0-0", "1.0");
    }

    #[test]
    fn epochs() {
        less("2.0", "1:0.5");
        less("1:2.0", "2:1.0");
        equal("0:1.0", "1.0");
    }

    #[test]
    fn tilde_sorts_before_everything() {
        less("1.0~rc1", "1.0");
        less("1.0~rc1~git123", "1.0~rc1");
        less("1.0~~", "1.0~");
        less("1.0~", "1.0");
        less("1.0~beta1", "1.0~beta2");
    }

    #[test]
    fn letters_before_non_letters() {
        less("1.0", "1.0a");
        less("1.0a", "1.0+");
        less("1.0alpha", "1.0+dfsg");
    }

    #[test]
    fn transitivity_on_corpus() {
        // Policy manual ordering examples, ascending. A bare letter
        // sorts after digit-led upstreams: the first non-digit run of
        // "1.0" is empty, and letters beat end-of-part.
        let corpus = [
            "~~", "~~a", "~", "", "1.0~beta1~svn1245", "1.0~beta1", "1.0", "1.0-1", "1.0-1+b1", "1.0.1", "a",
            "1:0.1",
        ];
        for (i, a) in corpus.iter().enumerate() {
            for b in &corpus[i + 1..] {
                less(a, b);
            }
        }
    }

    #[test]
    fn validation() {
        assert!(validate("1.0").is_ok());
        assert!(validate("1:4.7.0+dfsg1-2").is_ok());
        assert!(validate("3.3.2.final~github").is_ok());
        assert!(validate("0.18.0+dfsg-2+b1").is_ok());
        assert_eq!(validate(""), Err(InvalidVersion::Empty));
        assert!(matches!(validate("a:1.0"), Err(InvalidVersion::Epoch(_))));
        assert!(matches!(validate("1.0_2"), Err(InvalidVersion::Upstream(_))));
        assert!(matches!(validate("1.0-a_b"), Err(InvalidVersion::Revision(_))));
    }
}
