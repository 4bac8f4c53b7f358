//! Social platforms, compliance capabilities, and account consent sets.
//!
//! A [`Capability`] is a named permission an account grants for automated
//! activity on one [`Platform`]. Catalog entries declare which capabilities
//! their actions need; an account's [`ConsentSet`] records which ones it has
//! granted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A social platform an automation can observe or act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Instagram,
    Facebook,
    X,
    Linkedin,
    Tiktok,
}

impl Platform {
    /// All supported platforms.
    pub const ALL: [Self; 5] = [
        Self::Instagram,
        Self::Facebook,
        Self::X,
        Self::Linkedin,
        Self::Tiktok,
    ];

    /// Returns the wire name of this platform.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::X => "x",
            Self::Linkedin => "linkedin",
            Self::Tiktok => "tiktok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a platform or capability name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNameError {
    /// What kind of name was being parsed.
    pub expected: &'static str,
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for UnknownNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.expected, self.value)
    }
}

impl std::error::Error for UnknownNameError {}

impl FromStr for Platform {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownNameError {
                expected: "platform",
                value: s.to_string(),
            })
    }
}

/// A compliance capability an account grants for automated activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// The account holder explicitly opted in to automated interactions.
    ExplicitConsent,
    /// Recipients who opted out are never contacted by automation.
    OptOutRespected,
    /// Automation may publish content on the account's behalf.
    PublishAccess,
    /// Automation may send direct messages from the account.
    DirectMessaging,
}

impl Capability {
    /// All known capabilities.
    pub const ALL: [Self; 4] = [
        Self::ExplicitConsent,
        Self::OptOutRespected,
        Self::PublishAccess,
        Self::DirectMessaging,
    ];

    /// Returns the wire name of this capability.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitConsent => "explicit_consent",
            Self::OptOutRespected => "opt_out_respected",
            Self::PublishAccess => "publish_access",
            Self::DirectMessaging => "direct_messaging",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownNameError {
                expected: "capability",
                value: s.to_string(),
            })
    }
}

/// A capability required on a specific platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlatformRequirement {
    pub platform: Platform,
    pub capability: Capability,
}

impl PlatformRequirement {
    #[must_use]
    pub const fn new(platform: Platform, capability: Capability) -> Self {
        Self {
            platform,
            capability,
        }
    }
}

impl fmt::Display for PlatformRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.capability)
    }
}

/// The capabilities an account has granted, per platform.
///
/// Serializes as `{ "x": ["explicit_consent"], ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentSet(BTreeMap<Platform, BTreeSet<Capability>>);

impl ConsentSet {
    /// Creates an empty consent set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a capability grant, returning the set for chaining.
    #[must_use]
    pub fn with(mut self, platform: Platform, capability: Capability) -> Self {
        self.grant(platform, capability);
        self
    }

    /// Grants a capability on a platform.
    ///
    /// Returns true if the grant is new.
    pub fn grant(&mut self, platform: Platform, capability: Capability) -> bool {
        self.0.entry(platform).or_default().insert(capability)
    }

    /// Revokes a capability on a platform.
    ///
    /// Returns true if the capability had been granted.
    pub fn revoke(&mut self, platform: Platform, capability: Capability) -> bool {
        let Some(granted) = self.0.get_mut(&platform) else {
            return false;
        };
        let removed = granted.remove(&capability);
        if granted.is_empty() {
            self.0.remove(&platform);
        }
        removed
    }

    /// Returns whether the capability is granted on the platform.
    #[must_use]
    pub fn has(&self, platform: Platform, capability: Capability) -> bool {
        self.0
            .get(&platform)
            .is_some_and(|granted| granted.contains(&capability))
    }

    /// Returns whether the requirement is satisfied.
    #[must_use]
    pub fn satisfies(&self, requirement: &PlatformRequirement) -> bool {
        self.has(requirement.platform, requirement.capability)
    }

    /// Returns the capabilities granted on a platform.
    pub fn capabilities(&self, platform: Platform) -> impl Iterator<Item = Capability> + '_ {
        self.0.get(&platform).into_iter().flatten().copied()
    }

    /// Returns whether nothing is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_parse_and_display() {
        let platform: Platform = "x".parse().expect("should parse");
        assert_eq!(platform, Platform::X);
        assert_eq!(Platform::Linkedin.to_string(), "linkedin");
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn capability_wire_names_match_serde() {
        for capability in Capability::ALL {
            let json = serde_json::to_string(&capability).expect("serialize");
            assert_eq!(json, format!("\"{}\"", capability.as_str()));
        }
    }

    #[test]
    fn consent_grant_and_revoke() {
        let mut consents = ConsentSet::new();
        assert!(consents.grant(Platform::X, Capability::ExplicitConsent));
        assert!(!consents.grant(Platform::X, Capability::ExplicitConsent));
        assert!(consents.has(Platform::X, Capability::ExplicitConsent));
        assert!(!consents.has(Platform::Instagram, Capability::ExplicitConsent));

        assert!(consents.revoke(Platform::X, Capability::ExplicitConsent));
        assert!(!consents.revoke(Platform::X, Capability::ExplicitConsent));
        assert!(consents.is_empty());
    }

    #[test]
    fn consent_set_serializes_as_map() {
        let consents = ConsentSet::new()
            .with(Platform::X, Capability::ExplicitConsent)
            .with(Platform::X, Capability::OptOutRespected);
        let json = serde_json::to_value(&consents).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "x": ["explicit_consent", "opt_out_respected"] })
        );

        let parsed: ConsentSet = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, consents);
    }
}
