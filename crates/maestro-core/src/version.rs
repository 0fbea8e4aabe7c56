//! Maven-style artifact versions.
//!
//! Versions are free-form strings. Ordering splits a version into a leading
//! numeric part and a list of qualifier tokens:
//!
//! ```text
//! alpha < beta < milestone < rc == cr < snapshot < "" == ga == final == release
//! ```
//!
//! Unknown qualifiers sort lexically (case-insensitive) between `snapshot`
//! and the release marker, and numeric tokens sort above every qualifier.
//! Timestamped snapshots (`1.0-20090101.120000-3`) rank as snapshots ordered
//! by timestamp and build number.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Symbolic version resolved to the newest version known to a repository.
pub const LATEST: &str = "LATEST";

/// Symbolic version resolved to the newest non-snapshot version.
pub const RELEASE: &str = "RELEASE";

/// Suffix marking an unresolved snapshot.
pub const SNAPSHOT: &str = "SNAPSHOT";

static TIMESTAMPED_SNAPSHOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*)-(\d{8})\.(\d{6})-(\d+)$").expect("invalid timestamped snapshot regex")
});

/// A numeric token of any length, leading zeros removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Digits(String);

impl Digits {
    fn parse(token: &str) -> Option<Self> {
        is_numeric(token).then(|| Self(token.trim_start_matches('0').to_owned()))
    }

    fn zero() -> Self {
        Self(String::new())
    }

    fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}

impl Ord for Digits {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.len().cmp(&other.0.len()).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Digits {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A single comparable piece of a version's qualifier list.
///
/// Variant order is the comparison order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Item {
    Alpha,
    Beta,
    Milestone,
    Candidate,
    Snapshot,
    Named(String),
    Release,
    Number(Digits),
}

impl Item {
    fn qualifier(token: &str, followed_by_digit: bool) -> Self {
        let lower = token.to_ascii_lowercase();
        match lower.as_str() {
            "alpha" => Self::Alpha,
            "a" if followed_by_digit => Self::Alpha,
            "beta" => Self::Beta,
            "b" if followed_by_digit => Self::Beta,
            "milestone" => Self::Milestone,
            "m" if followed_by_digit => Self::Milestone,
            "rc" | "cr" => Self::Candidate,
            "snapshot" => Self::Snapshot,
            "" | "ga" | "final" | "release" => Self::Release,
            _ => Self::Named(lower),
        }
    }

    fn token(token: &str, followed_by_digit: bool) -> Self {
        Digits::parse(token).map_or_else(|| Self::qualifier(token, followed_by_digit), Self::Number)
    }

    fn is_trailing_noise(&self) -> bool {
        match self {
            Self::Release => true,
            Self::Number(n) => n.is_zero(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    Start,
    Dot,
    Hyphen,
    Transition,
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Split on `.` and `-`, and wherever digits meet letters.
fn split_tokens(s: &str) -> Vec<(Separator, &str)> {
    let mut tokens = Vec::new();
    let mut separator = Separator::Start;
    let mut start = 0;
    let mut previous_digit: Option<bool> = None;

    for (i, c) in s.char_indices() {
        if c == '.' || c == '-' {
            tokens.push((separator, &s[start..i]));
            separator = if c == '.' {
                Separator::Dot
            } else {
                Separator::Hyphen
            };
            start = i + 1;
            previous_digit = None;
            continue;
        }
        let digit = c.is_ascii_digit();
        if previous_digit.is_some_and(|p| p != digit) {
            tokens.push((separator, &s[start..i]));
            separator = Separator::Transition;
            start = i;
        }
        previous_digit = Some(digit);
    }
    tokens.push((separator, &s[start..]));
    tokens
}

fn analyze(raw: &str) -> (Vec<Digits>, Vec<Item>) {
    if let Some(caps) = TIMESTAMPED_SNAPSHOT.captures(raw) {
        let (numbers, mut items) = analyze_plain(&caps[1]);
        items.push(Item::Snapshot);
        for group in 2..=4 {
            items.push(Item::token(&caps[group], false));
        }
        return (numbers, items);
    }
    analyze_plain(raw)
}

fn analyze_plain(raw: &str) -> (Vec<Digits>, Vec<Item>) {
    let tokens = split_tokens(raw.trim());
    let mut numbers = Vec::new();
    let mut idx = 0;

    while let Some(&(separator, token)) = tokens.get(idx) {
        if !matches!(separator, Separator::Start | Separator::Dot) {
            break;
        }
        if token.is_empty() {
            numbers.push(Digits::zero());
        } else if let Some(n) = Digits::parse(token) {
            numbers.push(n);
        } else {
            break;
        }
        idx += 1;
    }

    let mut items = Vec::new();
    for (pos, &(_, token)) in tokens.iter().enumerate().skip(idx) {
        if token.is_empty() {
            continue;
        }
        let followed_by_digit = tokens.get(pos + 1).is_some_and(|&(sep, next)| {
            sep == Separator::Transition && next.starts_with(|c: char| c.is_ascii_digit())
        });
        items.push(Item::token(token, followed_by_digit));
    }

    while numbers.last().is_some_and(Digits::is_zero) {
        numbers.pop();
    }
    while items.last().is_some_and(Item::is_trailing_noise) {
        items.pop();
    }
    (numbers, items)
}

/// An artifact version with Maven ordering semantics.
///
/// Equality and hashing follow the ordering, so `1.0`, `1` and `1.0.0-ga`
/// are the same version. The original spelling is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ArtifactVersion {
    raw: String,
    numbers: Vec<Digits>,
    items: Vec<Item>,
}

impl ArtifactVersion {
    /// Parse a version string. Every string is a valid version.
    #[must_use]
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let (numbers, items) = analyze(&raw);
        Self {
            raw,
            numbers,
            items,
        }
    }

    /// The version as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `LATEST` or `RELEASE`.
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        self.raw == LATEST || self.raw == RELEASE
    }

    /// Either a `-SNAPSHOT` version or a timestamped snapshot.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        self.is_unresolved_snapshot() || self.is_timestamped()
    }

    /// A snapshot still carrying the literal `SNAPSHOT` marker.
    #[must_use]
    pub fn is_unresolved_snapshot(&self) -> bool {
        let len = self.raw.len();
        len >= SNAPSHOT.len()
            && self.raw.is_char_boundary(len - SNAPSHOT.len())
            && self.raw[len - SNAPSHOT.len()..].eq_ignore_ascii_case(SNAPSHOT)
    }

    /// A snapshot of the form `base-yyyyMMdd.HHmmss-build`.
    #[must_use]
    pub fn is_timestamped(&self) -> bool {
        TIMESTAMPED_SNAPSHOT.is_match(&self.raw)
    }

    /// The version a snapshot was deployed from.
    ///
    /// `1.0-20090101.120000-3` becomes `1.0-SNAPSHOT`; any other version is
    /// returned unchanged.
    #[must_use]
    pub fn base_version(&self) -> Self {
        match TIMESTAMPED_SNAPSHOT.captures(&self.raw) {
            Some(caps) => Self::parse(format!("{}-{SNAPSHOT}", &caps[1])),
            None => self.clone(),
        }
    }

    /// Timestamp and build number of a timestamped snapshot.
    #[must_use]
    pub fn snapshot_build(&self) -> Option<(String, u32)> {
        let caps = TIMESTAMPED_SNAPSHOT.captures(&self.raw)?;
        let build = caps[4].parse().ok()?;
        Some((format!("{}.{}", &caps[2], &caps[3]), build))
    }

    fn compare_items(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for i in 0..len {
            let left = self.items.get(i).unwrap_or(&Item::Release);
            let right = other.items.get(i).unwrap_or(&Item::Release);
            match left.cmp(right) {
                Ordering::Equal => {}
                ordering => return ordering,
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for ArtifactVersion {
    fn eq(&self, other: &Self) -> bool {
        self.numbers == other.numbers && self.items == other.items
    }
}

impl Eq for ArtifactVersion {}

impl Hash for ArtifactVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numbers.hash(state);
        self.items.hash(state);
    }
}

impl Ord for ArtifactVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numbers
            .cmp(&other.numbers)
            .then_with(|| self.compare_items(other))
    }
}

impl PartialOrd for ArtifactVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ArtifactVersion {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for ArtifactVersion {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for ArtifactVersion {
    fn from(s: String) -> Self {
        Self::parse(s)
    }
}

impl From<ArtifactVersion> for String {
    fn from(v: ArtifactVersion) -> Self {
        v.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn v(s: &str) -> ArtifactVersion {
        ArtifactVersion::parse(s)
    }

    #[test_case("1.0-alpha-1", "1.0-beta-1" ; "alpha before beta")]
    #[test_case("1.0-beta-2", "1.0-milestone-1" ; "beta before milestone")]
    #[test_case("1.0-M1", "1.0-RC1" ; "milestone before rc")]
    #[test_case("1.0-RC1", "1.0-SNAPSHOT" ; "rc before snapshot")]
    #[test_case("1.0-SNAPSHOT", "1.0" ; "snapshot before release")]
    #[test_case("1.0", "1.0-1" ; "release before numeric qualifier")]
    #[test_case("1.0-foo", "1.0" ; "named qualifier before release")]
    #[test_case("1.0-SNAPSHOT", "1.0-foo" ; "snapshot before named qualifier")]
    #[test_case("1.0-abc", "1.0-abd" ; "named qualifiers lexical")]
    #[test_case("1.9", "1.10" ; "numeric not lexical")]
    #[test_case("1.0-rc1", "1.0-rc2" ; "rc numbering")]
    #[test_case("2", "18446744073709551616" ; "component beyond u64")]
    #[test_case("1.0-99999999999999999999", "1.0-100000000000000000000" ; "qualifier beyond u64")]
    #[test_case("1.0-foo", "1.0-99999999999999999999" ; "long number above named")]
    #[test_case("2.0-alpha1", "2.0" ; "alpha before release")]
    #[test_case("1.0-SNAPSHOT", "1.0-20090101.120000-1" ; "plain snapshot before timestamped")]
    #[test_case("1.0-20090101.120000-1", "1.0-20090101.120000-2" ; "build number")]
    #[test_case("1.0-20090101.120000-9", "1.0-20090102.000000-1" ; "timestamp before build")]
    #[test_case("1.0-20090101.120000-9", "1.0" ; "timestamped before release")]
    fn ordering(lower: &str, higher: &str) {
        assert!(v(lower) < v(higher), "{lower} should sort before {higher}");
        assert!(v(higher) > v(lower));
    }

    #[test_case("1", "1.0" ; "trailing zero")]
    #[test_case("1.0.0", "1" ; "trailing zeros")]
    #[test_case("1.0-ga", "1.0" ; "ga is release")]
    #[test_case("1.0-FINAL", "1.0" ; "final is release")]
    #[test_case("1.0-RC1", "1.0-cr1" ; "cr is rc")]
    #[test_case("1.0-ALPHA-1", "1.0-a1" ; "short alpha")]
    #[test_case("1.0-Foo", "1.0-foo" ; "case insensitive qualifier")]
    #[test_case("1.0-0", "1.0" ; "zero qualifier")]
    #[test_case("1.007", "1.7" ; "leading zeros")]
    fn equivalence(left: &str, right: &str) {
        assert_eq!(v(left), v(right));
        assert_eq!(v(left).cmp(&v(right)), Ordering::Equal);
    }

    #[test]
    fn display_keeps_spelling() {
        assert_eq!(v("1.0.0-GA").to_string(), "1.0.0-GA");
    }

    #[test]
    fn snapshot_detection() {
        assert!(v("1.0-SNAPSHOT").is_snapshot());
        assert!(v("1.0-SNAPSHOT").is_unresolved_snapshot());
        assert!(v("1.0-20090101.120000-3").is_snapshot());
        assert!(!v("1.0-20090101.120000-3").is_unresolved_snapshot());
        assert!(!v("1.0").is_snapshot());
    }

    #[test]
    fn base_version_of_timestamped() {
        let ts = v("2.1-20230415.083000-12");
        assert_eq!(ts.base_version().as_str(), "2.1-SNAPSHOT");
        assert_eq!(
            ts.snapshot_build(),
            Some(("20230415.083000".to_string(), 12))
        );
        assert_eq!(v("2.1").base_version().as_str(), "2.1");
    }

    #[test]
    fn symbolic() {
        assert!(v(LATEST).is_symbolic());
        assert!(v(RELEASE).is_symbolic());
        assert!(!v("1.0").is_symbolic());
    }

    #[test]
    fn serde_as_string() {
        use serde::de::IntoDeserializer;
        use serde::de::value::{Error, StrDeserializer};

        let de: StrDeserializer<'_, Error> = "3.2.1".into_deserializer();
        let version = ArtifactVersion::deserialize(de).unwrap();
        assert_eq!(version, v("3.2.1"));
        assert_eq!(String::from(version), "3.2.1");
    }

    fn version_strategy() -> impl Strategy<Value = String> {
        let qualifier = prop_oneof![
            Just(String::new()),
            Just("-alpha-1".to_string()),
            Just("-beta".to_string()),
            Just("-RC2".to_string()),
            Just("-SNAPSHOT".to_string()),
            Just("-foo".to_string()),
            Just("-1".to_string()),
            Just("-20200101.101010-4".to_string()),
        ];
        (prop::collection::vec(0u64..4, 1..4), qualifier).prop_map(|(nums, q)| {
            let nums: Vec<String> = nums.iter().map(ToString::to_string).collect();
            format!("{}{q}", nums.join("."))
        })
    }

    proptest! {
        #[test]
        fn ordering_is_antisymmetric(a in version_strategy(), b in version_strategy()) {
            let (a, b) = (v(&a), v(&b));
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
            prop_assert_eq!(a == b, a.cmp(&b) == Ordering::Equal);
        }

        #[test]
        fn ordering_is_transitive(
            a in version_strategy(),
            b in version_strategy(),
            c in version_strategy(),
        ) {
            let mut sorted = vec![v(&a), v(&b), v(&c)];
            sorted.sort();
            prop_assert!(sorted[0] <= sorted[2]);
            prop_assert!(sorted[0] <= sorted[1] && sorted[1] <= sorted[2]);
        }
    }
}
