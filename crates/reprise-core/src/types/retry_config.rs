//! Retry settings as stored in configuration files

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::kind::{Classify, KindFilter};
use crate::retry::{PolicyChain, Retry};
use crate::units::micros;

/// Value meaning "no limit" for `timeout-us` and `max-attempts`
pub const UNBOUNDED: i64 = -1;

/// Retry settings for the default case and for named operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RetryProfiles {
    /// Settings used when no operation-specific entry exists
    #[serde(default)]
    pub default: RetrySettings,

    /// Per-operation settings
    #[serde(default)]
    pub operations: HashMap<String, RetrySettings>,
}

impl RetryProfiles {
    /// Settings for `operation`, falling back to the default entry
    pub fn for_operation(&self, operation: &str) -> &RetrySettings {
        self.operations.get(operation).unwrap_or(&self.default)
    }

    /// Overlay `other` on top of these profiles
    ///
    /// The overlay's default replaces this default; operations are merged
    /// with the overlay winning on conflicts.
    pub fn merge(mut self, other: RetryProfiles) -> RetryProfiles {
        for (name, settings) in other.operations {
            self.operations.insert(name, settings);
        }
        self.default = other.default;
        self
    }

    /// Validate every entry
    pub fn validate(&self) -> Result<()> {
        self.default.validate()?;
        for (name, settings) in &self.operations {
            settings
                .validate()
                .map_err(|e| Error::invalid_config(format!("operation '{}': {}", name, e)))?;
        }
        Ok(())
    }
}

/// Retry settings for one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetrySettings {
    /// Time limit in microseconds, -1 for unbounded
    #[serde(default = "default_unbounded")]
    pub timeout_us: i64,

    /// Maximum invocations, -1 for unbounded
    #[serde(default = "default_unbounded")]
    pub max_attempts: i64,

    /// Pause between attempts in microseconds
    #[serde(default)]
    pub pause_us: u64,

    /// Failure kinds to retry; empty means every kind
    #[serde(default)]
    pub catch_only: Vec<String>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            timeout_us: default_unbounded(),
            max_attempts: default_unbounded(),
            pause_us: 0,
            catch_only: Vec::new(),
        }
    }
}

fn default_unbounded() -> i64 {
    UNBOUNDED
}

impl RetrySettings {
    /// Time limit, `None` when unbounded
    pub fn timeout(&self) -> Result<Option<Duration>> {
        match self.timeout_us {
            UNBOUNDED => Ok(None),
            us if us < 0 => Err(Error::invalid_config(format!(
                "timeout-us must be -1 or a non-negative number of microseconds, got {}",
                us
            ))),
            us => Ok(Some(micros(us as u64))),
        }
    }

    /// Maximum invocations, `None` when unbounded
    pub fn max_attempts(&self) -> Result<Option<u32>> {
        match self.max_attempts {
            UNBOUNDED => Ok(None),
            0 => Err(Error::ZeroAttempts),
            n if n < 0 => Err(Error::invalid_config(format!(
                "max-attempts must be -1 or a positive count, got {}",
                n
            ))),
            n => u32::try_from(n).map(Some).map_err(|_| {
                Error::invalid_config(format!("max-attempts is too large: {}", n))
            }),
        }
    }

    /// Pause between attempts
    pub fn pause(&self) -> Duration {
        micros(self.pause_us)
    }

    /// Failure kind filter named by `catch-only`
    pub fn failure_filter<K>(&self) -> Result<KindFilter<K>>
    where
        K: Copy + Eq + FromStr,
    {
        if self.catch_only.is_empty() {
            Ok(KindFilter::Any)
        } else {
            KindFilter::parse(&self.catch_only)
        }
    }

    /// Check the numeric limits
    ///
    /// Kind names can only be checked against a concrete failure type, see
    /// [`RetrySettings::failure_filter`].
    pub fn validate(&self) -> Result<()> {
        self.timeout()?;
        self.max_attempts()?;
        Ok(())
    }

    /// Build the equivalent policy chain
    ///
    /// Policies are ordered kind filter, timeout, attempt limit, pause, the
    /// same order [`Retry`] checks them in.
    pub fn policy_chain<'a, E>(&self) -> Result<PolicyChain<'a, E>>
    where
        E: Classify,
        E::Kind: FromStr + 'a,
    {
        let mut chain = PolicyChain::new();

        let filter = self.failure_filter::<E::Kind>()?;
        if !filter.is_any() {
            chain = chain.catch_only(filter);
        }
        if let Some(limit) = self.timeout()? {
            chain = chain.timeout(limit);
        }
        if let Some(limit) = self.max_attempts()? {
            chain = chain.max_attempts(limit);
        }
        if self.pause_us > 0 {
            chain = chain.pause(self.pause());
        }

        Ok(chain)
    }

    /// Apply these settings to a [`Retry`]
    ///
    /// Every setting is checked first; on error `retry` is left untouched.
    pub fn configure<'a, T, E, C, O>(&self, retry: &mut Retry<'a, T, E, C, O>) -> Result<()>
    where
        E: Classify,
        E::Kind: FromStr + 'a,
    {
        let timeout = self.timeout()?;
        let count = self.max_attempts()?;
        let filter = self.failure_filter::<E::Kind>()?;

        retry
            .set_timeout(timeout)
            .set_count(count)?
            .set_pause(self.pause())
            .set_failure_kinds(filter)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Display;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Busy,
    }

    impl FromStr for Kind {
        type Err = ();

        fn from_str(s: &str) -> std::result::Result<Self, ()> {
            match s {
                "busy" => Ok(Kind::Busy),
                _ => Err(()),
            }
        }
    }

    #[derive(Debug)]
    struct Failure;

    impl Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("failure")
        }
    }

    impl Classify for Failure {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            Kind::Busy
        }
    }

    #[test]
    fn test_defaults_are_unbounded() {
        let settings = RetrySettings::default();
        assert_eq!(settings.timeout().unwrap(), None);
        assert_eq!(settings.max_attempts().unwrap(), None);
        assert_eq!(settings.pause(), Duration::ZERO);
        assert!(settings.failure_filter::<Kind>().unwrap().is_any());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
default:
  timeout-us: 5000000
  max-attempts: 5
  pause-us: 100000
  catch-only: [busy]
operations:
  fetch:
    max-attempts: 3
"#;
        let profiles: RetryProfiles = serde_yaml_ng::from_str(yaml).unwrap();

        let default = &profiles.default;
        assert_eq!(default.timeout().unwrap(), Some(Duration::from_secs(5)));
        assert_eq!(default.max_attempts().unwrap(), Some(5));
        assert_eq!(default.pause(), Duration::from_millis(100));
        assert_eq!(
            default.failure_filter::<Kind>().unwrap(),
            KindFilter::Only(vec![Kind::Busy])
        );

        let fetch = profiles.for_operation("fetch");
        assert_eq!(fetch.max_attempts().unwrap(), Some(3));
        assert_eq!(fetch.timeout().unwrap(), None);

        assert_eq!(profiles.for_operation("unknown"), default);
    }

    #[test]
    fn test_invalid_limits() {
        let zero = RetrySettings {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(Error::ZeroAttempts)));

        let negative = RetrySettings {
            timeout_us: -5,
            ..Default::default()
        };
        assert!(matches!(negative.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_unknown_kind_name() {
        let settings = RetrySettings {
            catch_only: vec!["melted".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            settings.failure_filter::<Kind>(),
            Err(Error::UnknownFailureKind { .. })
        ));
    }

    #[test]
    fn test_policy_chain_skips_unset_limits() {
        let settings = RetrySettings {
            max_attempts: 2,
            ..Default::default()
        };
        let chain = settings.policy_chain::<Failure>().unwrap();
        assert_eq!(chain.len(), 1);

        let full = RetrySettings {
            timeout_us: 1000,
            max_attempts: 2,
            pause_us: 10,
            catch_only: vec!["busy".to_string()],
        };
        assert_eq!(full.policy_chain::<Failure>().unwrap().len(), 4);
    }

    #[test]
    fn test_configure_retry() {
        let settings = RetrySettings {
            timeout_us: 2_000_000,
            max_attempts: 4,
            pause_us: 250,
            catch_only: vec!["busy".to_string()],
        };
        let mut retry: Retry<'_, (), Failure> = Retry::new(|| Ok(()));

        settings.configure(&mut retry).unwrap();

        assert_eq!(retry.timeout(), Some(Duration::from_secs(2)));
        assert_eq!(retry.count(), Some(4));
        assert_eq!(retry.pause(), Duration::from_micros(250));
        assert!(!retry.catches_all());
    }

    #[test]
    fn test_configure_rejects_without_partial_update() {
        let mut retry: Retry<'_, (), Failure> = Retry::new(|| Ok(()));

        let zero_count = RetrySettings {
            timeout_us: 7,
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_count.configure(&mut retry),
            Err(Error::ZeroAttempts)
        ));

        let bad_kind = RetrySettings {
            timeout_us: 7,
            pause_us: 3,
            catch_only: vec!["melted".to_string()],
            ..Default::default()
        };
        assert!(bad_kind.configure(&mut retry).is_err());

        assert_eq!(retry.timeout(), None);
        assert_eq!(retry.pause(), Duration::ZERO);
        assert!(retry.catches_all());
    }

    #[test]
    fn test_merge_profiles() {
        let mut base = RetryProfiles::default();
        base.operations
            .insert("fetch".to_string(), RetrySettings::default());
        base.operations
            .insert("push".to_string(), RetrySettings::default());

        let mut overlay = RetryProfiles::default();
        overlay.default.max_attempts = 7;
        overlay.operations.insert(
            "fetch".to_string(),
            RetrySettings {
                pause_us: 5,
                ..Default::default()
            },
        );

        let merged = base.merge(overlay);
        assert_eq!(merged.default.max_attempts, 7);
        assert_eq!(merged.for_operation("fetch").pause_us, 5);
        assert!(merged.operations.contains_key("push"));
    }

    #[test]
    fn test_validate_names_operation() {
        let mut profiles = RetryProfiles::default();
        profiles.operations.insert(
            "fetch".to_string(),
            RetrySettings {
                max_attempts: -3,
                ..Default::default()
            },
        );

        let err = profiles.validate().unwrap_err();
        assert!(err.to_string().contains("operation 'fetch'"));
    }
}
