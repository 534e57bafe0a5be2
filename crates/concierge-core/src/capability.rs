//! Hierarchical capability names.
//!
//! Capabilities are dotted paths such as `customer.lookup` or `ticket.create`.
//! An agent declaring `customer` serves every capability under that prefix, while
//! an agent declaring `customer.history` serves only that one. When several
//! declarations match a request, the one with more segments is more specific.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized, dotted capability name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Capability(String);

/// How a declared capability matched a requested one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CapabilityMatch {
    /// Number of dotted segments in the declared capability
    pub specificity: usize,
    /// Declared capability is identical to the request
    pub exact: bool,
}

impl Capability {
    /// Build a capability, lowercasing and trimming stray dots and whitespace
    pub fn new(name: impl AsRef<str>) -> Self {
        let normalized = name
            .as_ref()
            .split('.')
            .map(|segment| segment.trim().to_ascii_lowercase())
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(".");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.0.split('.').count()
        }
    }

    /// Check whether this (declared) capability serves `requested`
    pub fn matches(&self, requested: &Capability) -> Option<CapabilityMatch> {
        if self.is_empty() {
            return None;
        }
        if self.0 == requested.0 {
            return Some(CapabilityMatch {
                specificity: self.segments(),
                exact: true,
            });
        }
        let is_prefix = requested
            .0
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('.'));
        is_prefix.then(|| CapabilityMatch {
            specificity: self.segments(),
            exact: false,
        })
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Capability {
    fn from(value: String) -> Self {
        Capability::new(value)
    }
}

impl From<&str> for Capability {
    fn from(value: &str) -> Self {
        Capability::new(value)
    }
}

impl From<Capability> for String {
    fn from(value: Capability) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalization() {
        assert_eq!(Capability::new(" Customer.Lookup ").as_str(), "customer.lookup");
        assert_eq!(Capability::new("customer..history.").as_str(), "customer.history");
        assert!(Capability::new("  ").is_empty());
    }

    #[test]
    fn test_exact_match() {
        let declared = Capability::new("customer.history");
        let m = declared.matches(&Capability::new("customer.history")).unwrap();
        assert!(m.exact);
        assert_eq!(m.specificity, 2);
    }

    #[test]
    fn test_prefix_match_requires_segment_boundary() {
        let declared = Capability::new("customer");
        assert!(declared.matches(&Capability::new("customer.lookup")).is_some());
        assert!(declared.matches(&Capability::new("customers.lookup")).is_none());
        assert!(
            Capability::new("customer.lookup")
                .matches(&Capability::new("customer"))
                .is_none()
        );
    }

    #[test]
    fn test_more_segments_is_more_specific() {
        let requested = Capability::new("customer.history");
        let broad = Capability::new("customer").matches(&requested).unwrap();
        let narrow = Capability::new("customer.history").matches(&requested).unwrap();
        assert!(narrow > broad);
    }

    proptest! {
        #[test]
        fn prop_every_capability_serves_its_children(
            parent in "[a-z]{1,8}(\\.[a-z]{1,8}){0,2}",
            child in "[a-z]{1,8}",
        ) {
            let declared = Capability::new(&parent);
            let requested = Capability::new(format!("{parent}.{child}"));
            let m = declared.matches(&requested);
            prop_assert!(m.is_some());
            prop_assert_eq!(m.unwrap().specificity, declared.segments());
        }
    }
}
