//! Version range parsing.
//!
//! Supported forms:
//!
//! | Spec            | Meaning                 |
//! |-----------------|-------------------------|
//! | `1.0`           | soft requirement, any   |
//! | `[1.0]`         | exactly 1.0             |
//! | `[1.0,2.0)`     | 1.0 <= x < 2.0          |
//! | `(1.0,2.0]`     | 1.0 < x <= 2.0          |
//! | `[1.5,)`        | x >= 1.5                |
//! | `(,1.0]`        | x <= 1.0                |
//! | `(,1.0],[1.2,)` | x <= 1.0 or x >= 1.2    |

use std::fmt;

use super::Version;
use crate::core::PomrError;

/// One bracketed interval of a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    /// Lower bound and whether it is inclusive; `None` is unbounded.
    pub lower: Option<(Version, bool)>,
    /// Upper bound and whether it is inclusive; `None` is unbounded.
    pub upper: Option<(Version, bool)>,
}

impl Restriction {
    /// Whether the version lies within this interval.
    pub fn contains(&self, version: &Version) -> bool {
        if let Some((lower, inclusive)) = &self.lower {
            if version < lower || (!inclusive && version == lower) {
                return false;
            }
        }
        if let Some((upper, inclusive)) = &self.upper {
            if version > upper || (!inclusive && version == upper) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.lower, &self.upper) {
            (Some((l, true)), Some((u, true))) if l == u => write!(f, "[{l}]"),
            _ => {
                let (open, lower) = match &self.lower {
                    Some((v, inclusive)) => (if *inclusive { '[' } else { '(' }, v.to_string()),
                    None => ('(', String::new()),
                };
                let (close, upper) = match &self.upper {
                    Some((v, inclusive)) => (if *inclusive { ']' } else { ')' }, v.to_string()),
                    None => (')', String::new()),
                };
                write!(f, "{open}{lower},{upper}{close}")
            }
        }
    }
}

/// A parsed version specification.
///
/// Either a soft requirement (`recommended` set, no restrictions; every version
/// matches) or a union of [`Restriction`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    /// The literal version of a non-range spec.
    pub recommended: Option<Version>,
    /// The intervals of a range spec, in declaration order.
    pub restrictions: Vec<Restriction>,
}

impl VersionRange {
    /// Whether the spec uses range syntax at all.
    pub fn is_range(spec: &str) -> bool {
        let spec = spec.trim();
        spec.starts_with('[') || spec.starts_with('(')
    }

    /// Parse a version spec.
    ///
    /// # Errors
    ///
    /// Returns [`PomrError::InvalidVersionRange`] for unbalanced brackets, intervals
    /// with more than two bounds, a lower bound above the upper bound, or an
    /// exclusive single-version interval like `(1.0)`.
    pub fn parse(spec: &str) -> Result<Self, PomrError> {
        let trimmed = spec.trim();
        let invalid = |reason: &str| PomrError::InvalidVersionRange {
            range: spec.to_string(),
            reason: reason.to_string(),
        };

        if !Self::is_range(trimmed) {
            if trimmed.is_empty() {
                return Err(invalid("empty version specification"));
            }
            return Ok(Self {
                recommended: Some(Version::parse(trimmed)),
                restrictions: Vec::new(),
            });
        }

        let mut restrictions = Vec::new();
        let mut rest = trimmed;
        while !rest.is_empty() {
            let close = rest.find([']', ')']).ok_or_else(|| invalid("unbounded range"))?;
            let restriction = Self::parse_restriction(&rest[..=close], &invalid)?;
            if let (Some(previous), Some((lower, _))) = (
                restrictions.last().and_then(|r: &Restriction| r.upper.as_ref()),
                restriction.lower.as_ref(),
            ) && lower < &previous.0
            {
                return Err(invalid("ranges overlap"));
            }
            restrictions.push(restriction);

            rest = rest[close + 1..].trim_start();
            if let Some(next) = rest.strip_prefix(',') {
                rest = next.trim_start();
                if rest.is_empty() {
                    return Err(invalid("trailing comma"));
                }
            } else if !rest.is_empty() {
                return Err(invalid("expected ',' between ranges"));
            }
            if !rest.is_empty() && !Self::is_range(rest) {
                return Err(invalid("only ranges may follow a range"));
            }
        }

        Ok(Self {
            recommended: None,
            restrictions,
        })
    }

    fn parse_restriction(
        text: &str,
        invalid: &dyn Fn(&str) -> PomrError,
    ) -> Result<Restriction, PomrError> {
        let lower_inclusive = text.starts_with('[');
        let upper_inclusive = text.ends_with(']');
        let inner = text[1..text.len() - 1].trim();

        if !inner.contains(',') {
            if !lower_inclusive || !upper_inclusive {
                return Err(invalid("single version must be surrounded by []"));
            }
            if inner.is_empty() {
                return Err(invalid("empty range"));
            }
            let version = Version::parse(inner);
            return Ok(Restriction {
                lower: Some((version.clone(), true)),
                upper: Some((version, true)),
            });
        }

        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(invalid("a range may only have a lower and an upper bound"));
        }
        let lower = (!parts[0].is_empty()).then(|| (Version::parse(parts[0]), lower_inclusive));
        let upper = (!parts[1].is_empty()).then(|| (Version::parse(parts[1]), upper_inclusive));

        if let (Some((l, _)), Some((u, _))) = (&lower, &upper)
            && l > u
        {
            return Err(invalid("lower bound is above upper bound"));
        }

        Ok(Restriction {
            lower,
            upper,
        })
    }

    /// Whether the version satisfies the spec. Soft requirements match everything.
    pub fn contains(&self, version: &Version) -> bool {
        if self.restrictions.is_empty() {
            return true;
        }
        self.restrictions.iter().any(|r| r.contains(version))
    }

    /// The highest of the candidates that satisfies the spec.
    ///
    /// For a soft requirement this is the recommended version itself when present
    /// among the candidates.
    pub fn best_match<'a>(&self, candidates: &'a [Version]) -> Option<&'a Version> {
        if let Some(recommended) = &self.recommended {
            return candidates.iter().find(|c| *c == recommended);
        }
        candidates.iter().filter(|c| self.contains(c)).max()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(recommended) = &self.recommended {
            return write!(f, "{recommended}");
        }
        let parts: Vec<String> = self.restrictions.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}
