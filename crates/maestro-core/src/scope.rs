//! Dependency scopes and their transitive propagation.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a dependency is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Needed everywhere.
    #[default]
    Compile,
    /// Supplied by the runtime environment.
    Provided,
    /// Needed at runtime but not for compilation.
    Runtime,
    /// Needed only by tests.
    Test,
    /// Supplied from an explicit local path.
    System,
}

impl Scope {
    /// All scopes.
    pub const ALL: [Self; 5] = [
        Self::Compile,
        Self::Provided,
        Self::Runtime,
        Self::Test,
        Self::System,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Provided => "provided",
            Self::Runtime => "runtime",
            Self::Test => "test",
            Self::System => "system",
        }
    }

    /// Scope of a transitive dependency declared with `declared` inside a
    /// parent resolved with `self`.
    ///
    /// `None` means the dependency does not propagate: `provided`, `test`
    /// and `system` dependencies of a dependency are never inherited, and a
    /// `system` parent propagates nothing.
    ///
    /// | parent \ declared | compile  | runtime  |
    /// |-------------------|----------|----------|
    /// | compile           | compile  | runtime  |
    /// | runtime           | runtime  | runtime  |
    /// | provided          | provided | provided |
    /// | test              | test     | test     |
    #[must_use]
    pub const fn inherit(self, declared: Self) -> Option<Self> {
        match (self, declared) {
            (_, Self::Provided | Self::Test | Self::System) | (Self::System, _) => None,
            (Self::Compile, d) => Some(d),
            (Self::Runtime, _) => Some(Self::Runtime),
            (Self::Provided, _) => Some(Self::Provided),
            (Self::Test, _) => Some(Self::Test),
        }
    }

    /// Relative visibility; larger is wider.
    const fn width(self) -> u8 {
        match self {
            Self::Test => 0,
            Self::Provided | Self::System => 1,
            Self::Runtime => 2,
            Self::Compile => 3,
        }
    }

    /// Check whether this scope makes an artifact visible in strictly more
    /// places than `other`.
    #[must_use]
    pub const fn is_wider_than(self, other: Self) -> bool {
        self.width() > other.width()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownScope(s.to_string()))
    }
}

/// Limits a resolution to the artifacts needed for one classpath.
///
/// Filtering by `compile` keeps compile, provided and system; `runtime`
/// keeps compile and runtime; `test` keeps everything; `provided` and
/// `system` keep only themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeFilter {
    target: Scope,
}

impl ScopeFilter {
    /// Filter for the classpath of `target`.
    #[must_use]
    pub const fn new(target: Scope) -> Self {
        Self { target }
    }

    /// The classpath this filter selects.
    #[must_use]
    pub const fn target(self) -> Scope {
        self.target
    }

    /// Check whether an artifact with `scope` belongs to the classpath.
    #[must_use]
    pub const fn includes(self, scope: Scope) -> bool {
        match self.target {
            Scope::Compile => matches!(scope, Scope::Compile | Scope::Provided | Scope::System),
            Scope::Runtime => matches!(scope, Scope::Compile | Scope::Runtime),
            Scope::Test => true,
            Scope::Provided => matches!(scope, Scope::Provided),
            Scope::System => matches!(scope, Scope::System),
        }
    }
}

impl From<Scope> for ScopeFilter {
    fn from(target: Scope) -> Self {
        Self::new(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Scope::Compile, Scope::Compile, Some(Scope::Compile))]
    #[test_case(Scope::Compile, Scope::Runtime, Some(Scope::Runtime))]
    #[test_case(Scope::Runtime, Scope::Compile, Some(Scope::Runtime))]
    #[test_case(Scope::Runtime, Scope::Runtime, Some(Scope::Runtime))]
    #[test_case(Scope::Provided, Scope::Compile, Some(Scope::Provided))]
    #[test_case(Scope::Provided, Scope::Runtime, Some(Scope::Provided))]
    #[test_case(Scope::Test, Scope::Compile, Some(Scope::Test))]
    #[test_case(Scope::Test, Scope::Runtime, Some(Scope::Test))]
    #[test_case(Scope::Compile, Scope::Test, None)]
    #[test_case(Scope::Compile, Scope::Provided, None)]
    #[test_case(Scope::Compile, Scope::System, None)]
    #[test_case(Scope::System, Scope::Compile, None)]
    fn inheritance(parent: Scope, declared: Scope, expected: Option<Scope>) {
        assert_eq!(parent.inherit(declared), expected);
    }

    #[test]
    fn widening() {
        assert!(Scope::Compile.is_wider_than(Scope::Runtime));
        assert!(Scope::Runtime.is_wider_than(Scope::Test));
        assert!(Scope::Provided.is_wider_than(Scope::Test));
        assert!(!Scope::Test.is_wider_than(Scope::Compile));
        assert!(!Scope::Compile.is_wider_than(Scope::Compile));
    }

    #[test]
    fn parse_scope() {
        assert_eq!("runtime".parse::<Scope>().unwrap(), Scope::Runtime);
        assert_eq!("TEST".parse::<Scope>().unwrap(), Scope::Test);
        assert!("import".parse::<Scope>().is_err());
    }

    #[test]
    fn filter() {
        let compile = ScopeFilter::new(Scope::Compile);
        assert!(compile.includes(Scope::Provided));
        assert!(!compile.includes(Scope::Runtime));
        assert!(!compile.includes(Scope::Test));

        let runtime = ScopeFilter::new(Scope::Runtime);
        assert!(runtime.includes(Scope::Runtime));
        assert!(!runtime.includes(Scope::Provided));

        assert!(Scope::ALL.iter().all(|s| ScopeFilter::new(Scope::Test).includes(*s)));
    }
}
