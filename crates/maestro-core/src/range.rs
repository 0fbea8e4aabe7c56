//! Version constraints: soft recommendations, hard ranges and unions.
//!
//! | Spec              | Meaning                              |
//! |-------------------|--------------------------------------|
//! | `1.0`             | soft: prefer 1.0, accept anything    |
//! | `[1.0]`           | exactly 1.0                          |
//! | `[1.0,2.0)`       | 1.0 <= v < 2.0                       |
//! | `(,1.0]`          | v <= 1.0                             |
//! | `[1.2,)`          | v >= 1.2                             |
//! | `(,1.0],[1.2,)`   | v <= 1.0 or v >= 1.2                 |

use crate::error::ConstraintError;
use crate::version::ArtifactVersion;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// One interval of a version range. A missing bound is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Restriction {
    lower: Option<ArtifactVersion>,
    lower_inclusive: bool,
    upper: Option<ArtifactVersion>,
    upper_inclusive: bool,
}

impl Restriction {
    /// The restriction that admits every version.
    #[must_use]
    pub const fn everything() -> Self {
        Self {
            lower: None,
            lower_inclusive: false,
            upper: None,
            upper_inclusive: false,
        }
    }

    /// Exactly one version.
    #[must_use]
    pub fn exactly(version: ArtifactVersion) -> Self {
        Self {
            lower: Some(version.clone()),
            lower_inclusive: true,
            upper: Some(version),
            upper_inclusive: true,
        }
    }

    /// Lower bound, if any.
    #[must_use]
    pub fn lower(&self) -> Option<&ArtifactVersion> {
        self.lower.as_ref()
    }

    /// Upper bound, if any.
    #[must_use]
    pub fn upper(&self) -> Option<&ArtifactVersion> {
        self.upper.as_ref()
    }

    /// Whether this restriction has no bounds at all.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Check whether a version falls inside this interval.
    #[must_use]
    pub fn contains(&self, version: &ArtifactVersion) -> bool {
        if let Some(lower) = &self.lower {
            match version.cmp(lower) {
                Ordering::Less => return false,
                Ordering::Equal if !self.lower_inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match version.cmp(upper) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.upper_inclusive => return false,
                _ => {}
            }
        }
        true
    }

    /// Intersection of two intervals, or `None` when they are disjoint.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let (lower, lower_inclusive) = match (&self.lower, &other.lower) {
            (None, None) => (None, false),
            (Some(a), None) => (Some(a.clone()), self.lower_inclusive),
            (None, Some(b)) => (Some(b.clone()), other.lower_inclusive),
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Greater => (Some(a.clone()), self.lower_inclusive),
                Ordering::Less => (Some(b.clone()), other.lower_inclusive),
                Ordering::Equal => (
                    Some(a.clone()),
                    self.lower_inclusive && other.lower_inclusive,
                ),
            },
        };
        let (upper, upper_inclusive) = match (&self.upper, &other.upper) {
            (None, None) => (None, false),
            (Some(a), None) => (Some(a.clone()), self.upper_inclusive),
            (None, Some(b)) => (Some(b.clone()), other.upper_inclusive),
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Less => (Some(a.clone()), self.upper_inclusive),
                Ordering::Greater => (Some(b.clone()), other.upper_inclusive),
                Ordering::Equal => (
                    Some(a.clone()),
                    self.upper_inclusive && other.upper_inclusive,
                ),
            },
        };

        if let (Some(l), Some(u)) = (&lower, &upper) {
            match l.cmp(u) {
                Ordering::Greater => return None,
                Ordering::Equal if !(lower_inclusive && upper_inclusive) => return None,
                _ => {}
            }
        }

        Some(Self {
            lower,
            lower_inclusive,
            upper,
            upper_inclusive,
        })
    }

    fn parse(spec: &str) -> Result<Self, ConstraintError> {
        let lower_inclusive = spec.starts_with('[');
        let upper_inclusive = spec.ends_with(']');
        let inner = spec[1..spec.len() - 1].trim();

        let Some((low, high)) = inner.split_once(',') else {
            if !lower_inclusive || !upper_inclusive {
                return Err(ConstraintError::invalid(
                    spec,
                    "single version must be surrounded by []",
                ));
            }
            if inner.is_empty() {
                return Err(ConstraintError::invalid(spec, "empty version"));
            }
            return Ok(Self::exactly(ArtifactVersion::parse(inner)));
        };

        let (low, high) = (low.trim(), high.trim());
        if high.contains(',') {
            return Err(ConstraintError::invalid(spec, "too many bounds"));
        }
        if !low.is_empty() && low == high {
            return Err(ConstraintError::invalid(
                spec,
                "range cannot have identical boundaries",
            ));
        }

        let lower = (!low.is_empty()).then(|| ArtifactVersion::parse(low));
        let upper = (!high.is_empty()).then(|| ArtifactVersion::parse(high));
        if let (Some(l), Some(u)) = (&lower, &upper) {
            if u < l {
                return Err(ConstraintError::invalid(spec, "range defies version ordering"));
            }
        }

        Ok(Self {
            lower,
            lower_inclusive: lower_inclusive && !low.is_empty(),
            upper,
            upper_inclusive: upper_inclusive && !high.is_empty(),
        })
    }

    fn compare_lower(&self, other: &Self) -> Ordering {
        match (&self.lower, &other.lower) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a
                .cmp(b)
                .then_with(|| other.lower_inclusive.cmp(&self.lower_inclusive)),
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(l), Some(u)) = (&self.lower, &self.upper) {
            if l == u && self.lower_inclusive && self.upper_inclusive {
                return write!(f, "[{l}]");
            }
        }
        f.write_str(if self.lower_inclusive { "[" } else { "(" })?;
        if let Some(l) = &self.lower {
            write!(f, "{l}")?;
        }
        f.write_str(",")?;
        if let Some(u) = &self.upper {
            write!(f, "{u}")?;
        }
        f.write_str(if self.upper_inclusive { "]" } else { ")" })
    }
}

/// A version constraint: an optional recommended version plus the set of
/// acceptable versions.
///
/// A plain version is *soft*: it recommends that version but admits any.
/// A bracketed spec is *hard*: it has no recommendation and restricts the
/// acceptable versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionConstraint {
    recommended: Option<ArtifactVersion>,
    restrictions: Vec<Restriction>,
}

impl VersionConstraint {
    /// Parse a version specification.
    pub fn parse(spec: &str) -> Result<Self, ConstraintError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ConstraintError::invalid(spec, "empty specification"));
        }

        let mut restrictions: Vec<Restriction> = Vec::new();
        let mut process = spec;
        let mut upper_bound: Option<Option<ArtifactVersion>> = None;

        while process.starts_with('[') || process.starts_with('(') {
            let end = match (process.find(')'), process.find(']')) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => {
                    return Err(ConstraintError::invalid(spec, "unbounded range"));
                }
            };

            let restriction = Restriction::parse(&process[..=end])?;
            if let Some(previous_upper) = &upper_bound {
                let overlaps = match (previous_upper, restriction.lower()) {
                    (None, _) | (_, None) => true,
                    (Some(u), Some(l)) => l < u,
                };
                if overlaps {
                    return Err(ConstraintError::invalid(spec, "ranges overlap"));
                }
            }
            upper_bound = Some(restriction.upper().cloned());
            restrictions.push(restriction);

            process = process[end + 1..].trim();
            if let Some(rest) = process.strip_prefix(',') {
                process = rest.trim();
            }
        }

        if !process.is_empty() {
            if !restrictions.is_empty() {
                return Err(ConstraintError::invalid(
                    spec,
                    "only fully-qualified sets allowed in multiple set scenario",
                ));
            }
            return Ok(Self::soft(ArtifactVersion::parse(process)));
        }

        Ok(Self {
            recommended: None,
            restrictions,
        })
    }

    /// A soft constraint recommending `version`.
    #[must_use]
    pub fn soft(version: ArtifactVersion) -> Self {
        Self {
            recommended: Some(version),
            restrictions: vec![Restriction::everything()],
        }
    }

    /// A hard constraint admitting exactly `version`.
    #[must_use]
    pub fn exact(version: ArtifactVersion) -> Self {
        Self {
            recommended: None,
            restrictions: vec![Restriction::exactly(version)],
        }
    }

    /// The recommended version, if this constraint still carries one.
    #[must_use]
    pub fn recommended_version(&self) -> Option<&ArtifactVersion> {
        self.recommended.as_ref()
    }

    /// Intervals of acceptable versions, sorted and non-overlapping.
    #[must_use]
    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    /// True when no recommended version is present, so a concrete version
    /// has to be selected from the acceptable set.
    #[must_use]
    pub fn is_range(&self) -> bool {
        self.recommended.is_none()
    }

    /// True for an unrestricted recommendation.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        self.recommended.is_some() && self.restrictions.iter().all(Restriction::is_unbounded)
    }

    /// Check whether a version is acceptable.
    #[must_use]
    pub fn contains(&self, version: &ArtifactVersion) -> bool {
        self.restrictions.iter().any(|r| r.contains(version))
    }

    /// Highest acceptable version among `available`.
    pub fn select_version<'a, I>(&self, available: I) -> Result<ArtifactVersion, ConstraintError>
    where
        I: IntoIterator<Item = &'a ArtifactVersion>,
    {
        let mut seen = Vec::new();
        let mut best: Option<&ArtifactVersion> = None;
        for version in available {
            seen.push(version.as_str());
            if self.contains(version) && best.is_none_or(|b| version > b) {
                best = Some(version);
            }
        }
        best.cloned()
            .ok_or_else(|| ConstraintError::NoVersionInRange {
                constraint: self.to_string(),
                available: seen.join(", "),
            })
    }

    /// Combine two constraints.
    ///
    /// The result admits only versions both sides admit. It keeps this
    /// constraint's recommendation if still acceptable, otherwise the other
    /// side's, otherwise none. Fails when the acceptable sets are disjoint.
    pub fn intersect(&self, other: &Self) -> Result<Self, ConstraintError> {
        let mut restrictions = Vec::new();
        for left in &self.restrictions {
            for right in &other.restrictions {
                if let Some(r) = left.intersect(right) {
                    restrictions.push(r);
                }
            }
        }
        if restrictions.is_empty() {
            return Err(ConstraintError::NoOverlap {
                left: self.to_string(),
                right: other.to_string(),
            });
        }
        restrictions.sort_by(Restriction::compare_lower);

        let contains = |v: &ArtifactVersion| restrictions.iter().any(|r| r.contains(v));
        let recommended = match (&self.recommended, &other.recommended) {
            (Some(mine), _) if contains(mine) => Some(mine.clone()),
            (_, Some(theirs)) if contains(theirs) => Some(theirs.clone()),
            _ => None,
        };

        Ok(Self {
            recommended,
            restrictions,
        })
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(version) = &self.recommended {
            return write!(f, "{version}");
        }
        for (i, restriction) in self.restrictions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{restriction}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionConstraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionConstraint {
    type Error = ConstraintError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<VersionConstraint> for String {
    fn from(c: VersionConstraint) -> Self {
        c.to_string()
    }
}

impl From<ArtifactVersion> for VersionConstraint {
    fn from(version: ArtifactVersion) -> Self {
        Self::soft(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn c(spec: &str) -> VersionConstraint {
        VersionConstraint::parse(spec).unwrap()
    }

    fn v(s: &str) -> ArtifactVersion {
        ArtifactVersion::parse(s)
    }

    #[test]
    fn soft_constraint_accepts_anything() {
        let soft = c("1.0");
        assert!(soft.is_soft());
        assert!(!soft.is_range());
        assert_eq!(soft.recommended_version(), Some(&v("1.0")));
        assert!(soft.contains(&v("0.1")));
        assert!(soft.contains(&v("99")));
    }

    #[test_case("[1.0,2.0)", "1.0", true ; "inclusive lower")]
    #[test_case("[1.0,2.0)", "2.0", false ; "exclusive upper")]
    #[test_case("(1.0,2.0]", "1.0", false ; "exclusive lower")]
    #[test_case("(1.0,2.0]", "2.0", true ; "inclusive upper")]
    #[test_case("(,1.0]", "0.5", true ; "unbounded lower")]
    #[test_case("[1.2,)", "5.0", true ; "unbounded upper")]
    #[test_case("[1.5]", "1.5", true ; "exact match")]
    #[test_case("[1.5]", "1.6", false ; "exact mismatch")]
    #[test_case("(,1.0],[1.2,)", "1.1", false ; "union gap")]
    #[test_case("(,1.0],[1.2,)", "1.3", true ; "union upper arm")]
    #[test_case("[1.0,2.0)", "2.0-SNAPSHOT", true ; "snapshot below upper")]
    fn range_contains(spec: &str, version: &str, expected: bool) {
        assert_eq!(c(spec).contains(&v(version)), expected);
    }

    #[test_case("[1.0" ; "unterminated")]
    #[test_case("(1.0)" ; "single version in parens")]
    #[test_case("[2.0,1.0]" ; "reversed")]
    #[test_case("[1.0,1.0]" ; "identical boundaries")]
    #[test_case("[1.0,2.0],[1.5,3.0]" ; "overlapping")]
    #[test_case("[1.0,2.0],1.5" ; "mixed soft and hard")]
    #[test_case("" ; "empty")]
    fn invalid_specs(spec: &str) {
        assert!(matches!(
            VersionConstraint::parse(spec),
            Err(ConstraintError::InvalidRange { .. })
        ));
    }

    #[test]
    fn display_round_trips_shape() {
        assert_eq!(c("[1.0,2.0)").to_string(), "[1.0,2.0)");
        assert_eq!(c("(,1.0],[1.2,)").to_string(), "(,1.0],[1.2,)");
        assert_eq!(c("[1.5]").to_string(), "[1.5]");
        assert_eq!(c("1.5").to_string(), "1.5");
    }

    #[test]
    fn intersect_ranges() {
        let merged = c("[1.0,2.0)").intersect(&c("[1.5,3.0)")).unwrap();
        assert!(merged.is_range());
        assert_eq!(merged.to_string(), "[1.5,2.0)");
        assert!(merged.contains(&v("1.9")));
        assert!(!merged.contains(&v("1.4")));
    }

    #[test]
    fn intersect_keeps_own_recommendation() {
        let merged = c("1.2").intersect(&c("[1.0,2.0)")).unwrap();
        assert_eq!(merged.recommended_version(), Some(&v("1.2")));
        assert!(!merged.contains(&v("2.0")));
    }

    #[test]
    fn intersect_falls_back_to_other_recommendation() {
        let merged = c("[1.0,2.0)").intersect(&c("1.5")).unwrap();
        assert_eq!(merged.recommended_version(), Some(&v("1.5")));

        let merged = c("3.0").intersect(&c("1.5")).unwrap();
        assert_eq!(merged.recommended_version(), Some(&v("3.0")));
    }

    #[test]
    fn intersect_drops_recommendation_outside_range() {
        let merged = c("2.5").intersect(&c("[1.0,2.0)")).unwrap();
        assert_eq!(merged.recommended_version(), None);
        assert!(merged.is_range());
    }

    #[test]
    fn intersect_disjoint_fails() {
        let err = c("[1.0,2.0)").intersect(&c("[2.0,3.0)")).unwrap_err();
        assert!(matches!(err, ConstraintError::NoOverlap { .. }));
    }

    #[test]
    fn intersect_with_union() {
        let merged = c("(,1.0],[1.2,)").intersect(&c("[0.5,1.5]")).unwrap();
        assert_eq!(merged.to_string(), "[0.5,1.0],[1.2,1.5]");
    }

    #[test]
    fn select_highest_matching() {
        let available = [v("1.0"), v("1.5"), v("1.9"), v("2.0")];
        assert_eq!(c("[1.0,2.0)").select_version(&available).unwrap(), v("1.9"));
        assert_eq!(c("[1.5]").select_version(&available).unwrap(), v("1.5"));
    }

    #[test]
    fn select_without_match() {
        let available = [v("1.0"), v("2.0")];
        let err = c("[3.0,)").select_version(&available).unwrap_err();
        assert!(matches!(err, ConstraintError::NoVersionInRange { .. }));
        assert!(err.to_string().contains("1.0, 2.0"));
    }
}
