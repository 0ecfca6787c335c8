//! Routing configuration
//!
//! Declarative `teams` + ordered `rules` document, supplied at deploy time as
//! JSON. Secrets never live here; they are resolved by a `SecretResolver`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info, warn};

pub const DEFAULT_SLACK_CHANNEL: &str = "#cloudo-default";
pub const DEFAULT_OPSGENIE_TEAM: &str = "default";

/// Complete routing document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub teams: BTreeMap<String, Team>,
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub slack: SlackTarget,
    #[serde(default)]
    pub opsgenie: OpsgenieTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpsgenieTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

/// Per-team destination defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opsgenie: Option<OpsgenieTarget>,
}

impl Team {
    pub fn slack_channel(&self) -> Option<&str> {
        self.slack.as_ref().and_then(|s| s.channel.as_deref())
    }

    pub fn opsgenie_team(&self) -> Option<&str> {
        self.opsgenie.as_ref().and_then(|o| o.team.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    #[serde(default)]
    pub when: When,
    #[serde(default)]
    pub then: Vec<ThenAction>,
}

/// Rule conditions; every unset field is a wildcard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct When {
    #[serde(default, deserialize_with = "string_ish", skip_serializing_if = "Option::is_none")]
    pub any: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_in: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, alias = "schemaName", skip_serializing_if = "Option::is_none")]
    pub alert_rule: Option<String>,
    #[serde(default, deserialize_with = "string_ish", skip_serializing_if = "Option::is_none")]
    pub oncall: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_prefix: Option<String>,
    #[serde(default, deserialize_with = "string_ish", skip_serializing_if = "Option::is_none")]
    pub severity_min: Option<String>,
    #[serde(default, deserialize_with = "string_ish", skip_serializing_if = "Option::is_none")]
    pub severity_max: Option<String>,
    #[serde(default, deserialize_with = "bool_ish", skip_serializing_if = "Option::is_none")]
    pub is_alert: Option<bool>,
}

/// One `then` entry; `type` is kept raw so unsupported kinds can be reported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThenAction {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Where the routing document comes from
#[derive(Debug, Clone, Default)]
pub struct RoutingSource {
    /// Inline JSON (`ROUTING_RULES`)
    pub inline: Option<String>,
    /// Path to a JSON file (`ROUTING_RULES_FILE`)
    pub file: Option<String>,
    /// Soft default for `defaults.slack.channel`
    pub default_slack_channel: Option<String>,
}

impl RoutingConfig {
    /// Built-in configuration used when nothing (valid) is supplied
    pub fn fallback(default_slack_channel: &str) -> Self {
        let slack = || ThenAction {
            kind: "slack".to_string(),
            ..Default::default()
        };

        Self {
            version: 1,
            defaults: Defaults {
                slack: SlackTarget {
                    channel: Some(default_slack_channel.to_string()),
                },
                opsgenie: OpsgenieTarget {
                    team: Some(DEFAULT_OPSGENIE_TEAM.to_string()),
                },
            },
            teams: BTreeMap::new(),
            rules: vec![
                RoutingRule {
                    when: When {
                        is_alert: Some(true),
                        status_in: Some(vec!["failed".into(), "error".into(), "routed".into()]),
                        ..Default::default()
                    },
                    then: vec![
                        ThenAction {
                            kind: "opsgenie".to_string(),
                            ..Default::default()
                        },
                        slack(),
                    ],
                },
                RoutingRule {
                    when: When {
                        any: Some("*".to_string()),
                        ..Default::default()
                    },
                    then: vec![slack()],
                },
            ],
        }
    }

    /// Load from inline JSON or a file; never fails, falls back instead
    pub fn load(source: &RoutingSource) -> Self {
        let channel = source
            .default_slack_channel
            .clone()
            .unwrap_or_else(|| DEFAULT_SLACK_CHANNEL.to_string());

        let raw = match (&source.inline, &source.file) {
            (Some(inline), _) if !inline.trim().is_empty() => inline.clone(),
            (_, Some(path)) if !path.trim().is_empty() => match std::fs::read_to_string(Path::new(path)) {
                Ok(text) => text,
                Err(e) => {
                    error!("Cannot read routing rules file {}: {}", path, e);
                    return Self::fallback(&channel);
                }
            },
            _ => {
                info!("ROUTING_RULES not set: using fallback configuration");
                return Self::fallback(&channel);
            }
        };

        match Self::parse(&raw, &channel) {
            Ok(config) => {
                info!(
                    "Routing configuration loaded: {} teams, {} rules",
                    config.teams.len(),
                    config.rules.len()
                );
                config
            }
            Err(e) => {
                error!("Invalid ROUTING_RULES JSON: {}", e);
                Self::fallback(&channel)
            }
        }
    }

    /// Parse a document and soft-merge the defaults
    pub fn parse(raw: &str, default_slack_channel: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        let has_rules = value.get("rules").is_some();
        let mut config: RoutingConfig = serde_json::from_value(value)?;

        if config.defaults.slack.channel.is_none() {
            config.defaults.slack.channel = Some(default_slack_channel.to_string());
        }
        if config.defaults.opsgenie.team.is_none() {
            config.defaults.opsgenie.team = Some(DEFAULT_OPSGENIE_TEAM.to_string());
        }
        if !has_rules {
            warn!("Routing configuration has no rules: using fallback rules");
            config.rules = Self::fallback(default_slack_channel).rules;
        }
        Ok(config)
    }

    /// Copy with inline tokens and API keys removed
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for action in copy.rules.iter_mut().flat_map(|r| r.then.iter_mut()) {
            action.token = None;
            action.api_key = None;
        }
        copy
    }
}

fn string_ish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn bool_ish<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => Some(s.trim().eq_ignore_ascii_case("true")),
        Some(_) => Some(false),
    })
}
