//! Version ordering and version ranges.
//!
//! Documents identify themselves with free-form version strings (`1.0`, `2.3.1-rc1`,
//! `4.0-SNAPSHOT`). Parents may be referenced by a range instead of a literal
//! version, JDK activation accepts ranges, and the local repository resolver picks
//! the highest version inside a range. This module provides both halves.
//!
//! # Module Organization
//!
//! - [`Version`] - a parsed version with a total ordering
//! - [`range`] - [`VersionRange`] parsing and containment checks
//!
//! # Ordering
//!
//! A version is split into numeric and qualifier items at `.`, `-` and at every
//! transition between digits and letters. Items compare left to right; missing items
//! behave like `0` (numbers) or a release (qualifiers), so `1`, `1.0` and `1.0.0` are
//! equal. Well-known qualifiers order as
//!
//! ```text
//! alpha < beta < milestone < rc < snapshot < "" (release) < sp
//! ```
//!
//! with unknown qualifiers sorting after `sp`, lexically among themselves. A numeric
//! item is always newer than a qualifier at the same position, so `1.0.1 > 1.0-rc1`.
//!
//! # Examples
//!
//! ```rust
//! use pomr::version::{Version, VersionRange};
//!
//! assert!(Version::parse("1.0-alpha") < Version::parse("1.0-beta"));
//! assert_eq!(Version::parse("1.0"), Version::parse("1.0.0"));
//!
//! let range = VersionRange::parse("[1.0,2.0)").unwrap();
//! assert!(range.contains(&Version::parse("1.5")));
//! assert!(!range.contains(&Version::parse("2.0")));
//! ```

pub mod range;

pub use range::{Restriction, VersionRange};

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One component of a parsed version.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// Digits with leading zeros removed (`"0"` for zero).
    Number(String),
    /// A lower-cased qualifier with aliases normalized.
    Qualifier(String),
}

/// Rank of a well-known qualifier; unknown qualifiers rank after `sp`.
fn qualifier_rank(qualifier: &str) -> Option<u8> {
    match qualifier {
        "alpha" => Some(0),
        "beta" => Some(1),
        "milestone" => Some(2),
        "rc" => Some(3),
        "snapshot" => Some(4),
        "" => Some(5),
        "sp" => Some(6),
        _ => None,
    }
}

fn normalize_qualifier(raw: &str, followed_by_digit: bool) -> String {
    let lower = raw.to_ascii_lowercase();
    match lower.as_str() {
        "a" if followed_by_digit => "alpha".to_string(),
        "b" if followed_by_digit => "beta".to_string(),
        "m" if followed_by_digit => "milestone".to_string(),
        "cr" => "rc".to_string(),
        "ga" | "final" | "release" => String::new(),
        _ => lower,
    }
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_qualifiers(a: &str, b: &str) -> Ordering {
    match (qualifier_rank(a), qualifier_rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn compare_items(a: Option<&Item>, b: Option<&Item>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(Item::Number(x)), Some(Item::Number(y))) => compare_numbers(x, y),
        (Some(Item::Number(_)), Some(Item::Qualifier(_))) => Ordering::Greater,
        (Some(Item::Qualifier(_)), Some(Item::Number(_))) => Ordering::Less,
        (Some(Item::Qualifier(x)), Some(Item::Qualifier(y))) => compare_qualifiers(x, y),
        (Some(Item::Number(x)), None) => compare_numbers(x, "0"),
        (None, Some(Item::Number(y))) => compare_numbers("0", y),
        (Some(Item::Qualifier(x)), None) => compare_qualifiers(x, ""),
        (None, Some(Item::Qualifier(y))) => compare_qualifiers("", y),
    }
}

/// A version string with Maven-style ordering.
///
/// Equality and hashing follow the ordering, not the spelling: `1.0` equals `1`.
/// [`Display`](fmt::Display) prints the original spelling.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    items: Vec<Item>,
}

impl Version {
    /// Parse a version. Parsing never fails; any string orders somewhere.
    pub fn parse(version: &str) -> Self {
        let mut items = Vec::new();
        let chars: Vec<char> = version.trim().chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '.' || c == '-' || c == '_' || c == '+' {
                i += 1;
                continue;
            }
            let start = i;
            let numeric = c.is_ascii_digit();
            while i < chars.len()
                && chars[i] != '.'
                && chars[i] != '-'
                && chars[i] != '_'
                && chars[i] != '+'
                && chars[i].is_ascii_digit() == numeric
            {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            if numeric {
                let trimmed = token.trim_start_matches('0');
                items.push(Item::Number(if trimmed.is_empty() {
                    "0".to_string()
                } else {
                    trimmed.to_string()
                }));
            } else {
                let followed_by_digit = chars.get(i).is_some_and(char::is_ascii_digit);
                items.push(Item::Qualifier(normalize_qualifier(&token, followed_by_digit)));
            }
        }

        // Trailing zeros and release qualifiers carry no information
        while let Some(last) = items.last() {
            let is_null = match last {
                Item::Number(n) => n == "0",
                Item::Qualifier(q) => q.is_empty(),
            };
            if is_null {
                items.pop();
            } else {
                break;
            }
        }

        Self {
            original: version.trim().to_string(),
            items,
        }
    }

    /// The version as written.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Whether this is a snapshot (development) version.
    pub fn is_snapshot(&self) -> bool {
        self.original.to_ascii_uppercase().ends_with("SNAPSHOT")
    }

    /// Whether `other`'s items are a leading prefix of this version's items.
    ///
    /// Used for JDK activation where `11` matches `11.0.2`.
    pub fn starts_with(&self, prefix: &Version) -> bool {
        prefix.items.len() <= self.items.len()
            && prefix.items.iter().zip(&self.items).all(|(a, b)| a == b)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for i in 0..len {
            let ordering = compare_items(self.items.get(i), other.items.get(i));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Trailing null items are already stripped, so equal versions hash equally
        for item in &self.items {
            match item {
                Item::Number(n) => {
                    0u8.hash(state);
                    n.hash(state);
                }
                Item::Qualifier(q) => {
                    1u8.hash(state);
                    q.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}
