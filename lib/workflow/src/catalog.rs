//! The node catalog: every trigger, condition and action kind an automation
//! may use.
//!
//! The catalog is the single source of truth for which node types exist,
//! what config each accepts, and which platform capabilities each implies.
//! It is immutable after construction; the built-in catalog is created once
//! per process.

use crate::error::{CatalogError, GraphError};
use crate::node::{Config, NodeKind, NodeType, target_platform};
use crate::schema::{ConfigField, ConfigSchema, FieldType};
use postflow_core::{Capability, Platform, PlatformRequirement};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

const METRICS: &[&str] = &["reach", "impressions", "engagement", "followers", "profile_views"];
const OPERATORS: &[&str] = &[">", "<", ">=", "<=", "=="];

static BUILTIN: LazyLock<NodeCatalog> = LazyLock::new(|| NodeCatalog::indexed(builtin_entries()));

/// A capability a node type needs on (some) platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRule {
    /// Restricts the rule to one platform; `None` applies to any target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub capability: Capability,
}

impl CapabilityRule {
    fn applies_to(&self, platform: Platform) -> bool {
        self.platform.is_none_or(|only| only == platform)
    }
}

/// A catalog entry describing one node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub node_type: NodeType,
    pub kind: NodeKind,
    /// Human-readable label for the authoring palette.
    pub label: String,
    pub config_schema: ConfigSchema,
    pub capability_rules: Vec<CapabilityRule>,
}

impl CatalogEntry {
    /// Creates an entry with an empty schema and no requirements.
    #[must_use]
    pub fn new(node_type: impl Into<String>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            node_type: NodeType::new(node_type),
            kind,
            label: label.into(),
            config_schema: ConfigSchema::default(),
            capability_rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn trigger(node_type: &str, label: &str) -> Self {
        Self::new(node_type, NodeKind::Trigger, label)
    }

    #[must_use]
    pub fn condition(node_type: &str, label: &str) -> Self {
        Self::new(node_type, NodeKind::Condition, label)
    }

    #[must_use]
    pub fn action(node_type: &str, label: &str) -> Self {
        Self::new(node_type, NodeKind::Action, label)
    }

    /// Adds a config field.
    #[must_use]
    pub fn field(mut self, field: ConfigField) -> Self {
        self.config_schema.fields.push(field);
        self
    }

    /// Requires a capability on whatever platform the node targets.
    #[must_use]
    pub fn requires(mut self, capability: Capability) -> Self {
        self.capability_rules.push(CapabilityRule {
            platform: None,
            capability,
        });
        self
    }

    /// Requires a capability only when the node targets `platform`.
    #[must_use]
    pub fn requires_on(mut self, platform: Platform, capability: Capability) -> Self {
        self.capability_rules.push(CapabilityRule {
            platform: Some(platform),
            capability,
        });
        self
    }

    /// Validates a config against this entry's schema.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the mismatch.
    pub fn validate_config(&self, config: &Config) -> Result<(), GraphError> {
        self.config_schema
            .validate(config)
            .map_err(|reason| GraphError::InvalidConfig {
                node_type: self.node_type.to_string(),
                reason,
            })
    }

    /// Derives the platform requirements of a node with this config.
    ///
    /// Nodes that target no platform carry no requirements.
    #[must_use]
    pub fn requirements_for(&self, config: &Config) -> Vec<PlatformRequirement> {
        let Some(platform) = target_platform(config) else {
            return Vec::new();
        };

        let mut requirements: Vec<PlatformRequirement> = Vec::new();
        for rule in &self.capability_rules {
            let requirement = PlatformRequirement::new(platform, rule.capability);
            if rule.applies_to(platform) && !requirements.contains(&requirement) {
                requirements.push(requirement);
            }
        }
        requirements
    }
}

/// The registry of available node types.
#[derive(Debug, Clone)]
pub struct NodeCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<NodeType, usize>,
}

impl NodeCatalog {
    /// Builds a catalog from entries.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNodeType` if two entries share a type.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.node_type.as_str()) {
                return Err(CatalogError::DuplicateNodeType {
                    node_type: entry.node_type.to_string(),
                });
            }
        }
        Ok(Self::indexed(entries))
    }

    /// Returns the process-wide built-in catalog.
    #[must_use]
    pub fn builtin() -> &'static NodeCatalog {
        &BUILTIN
    }

    fn indexed(entries: Vec<CatalogEntry>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            index.entry(entry.node_type.clone()).or_insert(position);
        }
        Self { entries, index }
    }

    /// Looks up a node type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNodeType` if the catalog has no such entry.
    pub fn lookup(&self, node_type: &str) -> Result<&CatalogEntry, GraphError> {
        self.index
            .get(node_type)
            .map(|&position| &self.entries[position])
            .ok_or_else(|| GraphError::UnknownNodeType {
                node_type: node_type.to_string(),
            })
    }

    /// Returns all entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Returns the entries of one kind.
    pub fn entries_of(&self, kind: NodeKind) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn builtin_entries() -> Vec<CatalogEntry> {
    use FieldType::{Integer, Number, StringList};
    let platform = || ConfigField::required("platform", FieldType::Platform);
    let text = |name: &str| ConfigField::optional(name, FieldType::String);
    let metric = || ConfigField::required("metric", FieldType::one_of(METRICS));
    let operator = || ConfigField::required("operator", FieldType::one_of(OPERATORS));

    vec![
        // Triggers
        CatalogEntry::trigger("new_post", "New Post Published")
            .field(platform())
            .field(text("account_handle"))
            .field(ConfigField::optional("since_minutes", Integer)),
        CatalogEntry::trigger("new_follower", "New Follower")
            .field(platform())
            .field(ConfigField::optional("threshold", Integer))
            .field(ConfigField::optional("since_minutes", Integer)),
        CatalogEntry::trigger("unfollower", "Lost Follower")
            .field(platform())
            .field(ConfigField::optional("threshold", Integer))
            .field(ConfigField::optional("since_minutes", Integer)),
        CatalogEntry::trigger("mention", "Mentioned in Post").field(platform()),
        CatalogEntry::trigger("kpi_threshold", "KPI Threshold Reached")
            .field(platform())
            .field(metric())
            .field(operator())
            .field(ConfigField::required("threshold", Number)),
        CatalogEntry::trigger("schedule", "On a Schedule")
            .field(ConfigField::required("cron", FieldType::String))
            .field(text("timezone")),
        // Conditions
        CatalogEntry::condition("engagement_threshold", "Engagement Threshold")
            .field(metric())
            .field(operator())
            .field(ConfigField::required("threshold", Number)),
        CatalogEntry::condition("time_window", "Within Time Window")
            .field(ConfigField::required("start_hour", Integer))
            .field(ConfigField::required("end_hour", Integer))
            .field(text("timezone")),
        CatalogEntry::condition("keyword_match", "Keyword Match")
            .field(ConfigField::required("keywords", StringList)),
        // Actions
        CatalogEntry::action("create_draft", "Create Draft Post")
            .field(ConfigField::optional("platform", FieldType::Platform))
            .field(text("template")),
        CatalogEntry::action("send_notification", "Send Notification")
            .field(ConfigField::optional(
                "channel",
                FieldType::one_of(&["email", "push", "slack"]),
            ))
            .field(text("message")),
        CatalogEntry::action("request_approval", "Request Approval")
            .field(text("approver"))
            .field(text("note")),
        CatalogEntry::action("add_to_calendar", "Add to Calendar")
            .field(ConfigField::optional("platform", FieldType::Platform))
            .field(text("slot")),
        CatalogEntry::action("webhook", "Call Webhook")
            .field(ConfigField::required("url", FieldType::String))
            .field(ConfigField::optional(
                "method",
                FieldType::one_of(&["GET", "POST", "PUT"]),
            )),
        CatalogEntry::action("auto_reply", "Auto Reply")
            .field(platform())
            .field(ConfigField::required("template", FieldType::String))
            .requires_on(Platform::X, Capability::ExplicitConsent),
        CatalogEntry::action("send_direct_message", "Send Direct Message")
            .field(platform())
            .field(ConfigField::required("template", FieldType::String))
            .requires(Capability::ExplicitConsent)
            .requires(Capability::OptOutRespected)
            .requires(Capability::DirectMessaging),
        CatalogEntry::action("publish_post", "Publish Post")
            .field(platform())
            .field(ConfigField::required("template", FieldType::String))
            .requires(Capability::PublishAccess),
    ]
}
