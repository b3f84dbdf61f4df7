//! Semantic ordering of box version strings
//!
//! Box versions are rarely full semver ("1.0", "4.1", "20240101", "v2"),
//! so every string is reduced to one sort key and compared the same way:
//!
//! - build metadata after the first `+` is ignored
//! - the release part (before the first `-`) is split on `.`/`_` and into
//!   runs of digits and non-digits; numeric runs compare by value, text
//!   runs lexically, numeric above text; trailing zero runs are dropped so
//!   `1.0` and `1.0.0` tie
//! - a prerelease (after the first `-`) orders below the bare release and
//!   its dot-separated identifiers compare with semver precedence rules
//!
//! For strings that are valid semver this is semver precedence. Keys that
//! tie are broken by plain string comparison so the order stays total.

use std::cmp::Ordering;

/// Compare two version strings semantically ("1.10" > "1.2", "2.0" > "1.10")
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    VersionKey::new(a)
        .cmp(&VersionKey::new(b))
        .then_with(|| a.cmp(b))
}

#[derive(Debug)]
struct VersionKey<'a> {
    release: Vec<Segment<'a>>,
    prerelease: Option<Vec<Identifier<'a>>>,
}

impl<'a> VersionKey<'a> {
    fn new(version: &'a str) -> Self {
        let version = version.split_once('+').map_or(version, |(v, _)| v);
        let (release, prerelease) = match version.split_once('-') {
            Some((release, pre)) => (release, Some(pre)),
            None => (version, None),
        };

        let mut segments: Vec<Segment<'a>> = release
            .split(['.', '_'])
            .filter(|s| !s.is_empty())
            .flat_map(runs)
            .collect();
        while matches!(segments.last(), Some(Segment::Numeric(n)) if n.bytes().all(|b| b == b'0')) {
            segments.pop();
        }

        Self {
            release: segments,
            prerelease: prerelease.map(|pre| pre.split('.').map(Identifier::new).collect()),
        }
    }
}

impl Ord for VersionKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release.cmp(&other.release).then_with(|| {
            match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            }
        })
    }
}

impl PartialEq for VersionKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionKey<'_> {}

impl PartialOrd for VersionKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A run inside the release part
#[derive(Debug)]
enum Segment<'a> {
    Numeric(&'a str),
    Text(&'a str),
}

impl Ord for Segment<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Numeric(a), Segment::Numeric(b)) => compare_numeric(a, b),
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
        }
    }
}

impl PartialEq for Segment<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Segment<'_> {}

impl PartialOrd for Segment<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A prerelease identifier; numeric identifiers sort below alphanumeric ones
#[derive(Debug)]
enum Identifier<'a> {
    Numeric(&'a str),
    Alphanumeric(&'a str),
}

impl<'a> Identifier<'a> {
    fn new(ident: &'a str) -> Self {
        if !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_digit()) {
            Identifier::Numeric(ident)
        } else {
            Identifier::Alphanumeric(ident)
        }
    }
}

impl Ord for Identifier<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Identifier::Numeric(a), Identifier::Numeric(b)) => compare_numeric(a, b),
            (Identifier::Alphanumeric(a), Identifier::Alphanumeric(b)) => a.cmp(b),
            (Identifier::Numeric(_), Identifier::Alphanumeric(_)) => Ordering::Less,
            (Identifier::Alphanumeric(_), Identifier::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl PartialEq for Identifier<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Identifier<'_> {}

impl PartialOrd for Identifier<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare digit strings by value without parsing (no overflow on long dates)
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Split into alternating runs of digits and non-digits ("v10" -> v, 10)
fn runs(part: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = part.as_bytes();
    for i in 1..=bytes.len() {
        let boundary = i == bytes.len() || bytes[i].is_ascii_digit() != bytes[start].is_ascii_digit();
        if boundary {
            let run = &part[start..i];
            if bytes[start].is_ascii_digit() {
                out.push(Segment::Numeric(run));
            } else {
                out.push(Segment::Text(run));
            }
            start = i;
        }
    }
    out
}
