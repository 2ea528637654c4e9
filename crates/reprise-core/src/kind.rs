//! Failure classification
//!
//! Failures are filtered by category rather than by concrete type. A failure
//! type opts in by implementing [`Classify`]; a [`KindFilter`] then decides
//! which categories are worth retrying.

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A failure that belongs to a category
///
/// # Example
///
/// ```rust
/// use reprise_core::Classify;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum FetchKind {
///     Transient,
///     Permanent,
/// }
///
/// struct FetchError {
///     status: u16,
/// }
///
/// impl Classify for FetchError {
///     type Kind = FetchKind;
///
///     fn kind(&self) -> FetchKind {
///         if self.status >= 500 {
///             FetchKind::Transient
///         } else {
///             FetchKind::Permanent
///         }
///     }
/// }
/// ```
pub trait Classify {
    /// Category type
    type Kind: Copy + Eq + fmt::Debug;

    /// Category of this failure
    fn kind(&self) -> Self::Kind;
}

impl Classify for io::Error {
    type Kind = io::ErrorKind;

    fn kind(&self) -> io::ErrorKind {
        io::Error::kind(self)
    }
}

/// Name that stands for every failure kind when parsing a filter
pub const ANY_KIND: &str = "any";

/// Set of failure kinds that are eligible for retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindFilter<K> {
    /// Every failure is eligible
    Any,
    /// Only failures of the listed kinds are eligible
    Only(Vec<K>),
}

impl<K> Default for KindFilter<K> {
    fn default() -> Self {
        KindFilter::Any
    }
}

impl<K: Copy + Eq> KindFilter<K> {
    /// Filter that accepts every failure
    pub fn any() -> Self {
        KindFilter::Any
    }

    /// Filter restricted to `kinds`
    ///
    /// An empty set does not denote any category and is rejected.
    pub fn only(kinds: impl IntoIterator<Item = K>) -> Result<Self> {
        let kinds: Vec<K> = kinds.into_iter().collect();
        if kinds.is_empty() {
            return Err(Error::EmptyKindFilter);
        }
        Ok(KindFilter::Only(kinds))
    }

    /// Build a filter from kind names
    ///
    /// `any` (or `*`) anywhere in the list yields [`KindFilter::Any`]. Every
    /// other name must parse as `K`.
    pub fn parse<I, S>(names: I) -> Result<Self>
    where
        K: FromStr,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kinds = Vec::new();
        let mut any = false;

        for name in names {
            let name = name.as_ref().trim();
            if name.eq_ignore_ascii_case(ANY_KIND) || name == "*" {
                any = true;
                continue;
            }
            let kind = name
                .parse::<K>()
                .map_err(|_| Error::unknown_failure_kind(name))?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        if any {
            Ok(KindFilter::Any)
        } else {
            Self::only(kinds)
        }
    }

    /// Whether a failure of `kind` is eligible
    pub fn accepts(&self, kind: K) -> bool {
        match self {
            KindFilter::Any => true,
            KindFilter::Only(kinds) => kinds.contains(&kind),
        }
    }

    /// Whether this filter accepts everything
    pub fn is_any(&self) -> bool {
        matches!(self, KindFilter::Any)
    }
}
