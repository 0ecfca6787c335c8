//! Credential lookup for notification sinks
//!
//! Naming convention: `SLACK_TOKEN_<TEAM>` then `SLACK_TOKEN_DEFAULT`;
//! `OPSGENIE_API_KEY_<TEAM>` then `OPSGENIE_API_KEY_DEFAULT` then
//! `OPSGENIE_API_KEY`.

use std::collections::HashMap;

/// Source of named secrets
pub trait SecretResolver: Send + Sync {
    /// Raw lookup by key
    fn lookup(&self, key: &str) -> Option<String>;

    fn slack_token(&self, team: Option<&str>) -> Option<String> {
        team.and_then(|t| self.get(&team_key("SLACK_TOKEN", t)))
            .or_else(|| self.get("SLACK_TOKEN_DEFAULT"))
    }

    fn opsgenie_api_key(&self, team: Option<&str>) -> Option<String> {
        team.and_then(|t| self.get(&team_key("OPSGENIE_API_KEY", t)))
            .or_else(|| self.get("OPSGENIE_API_KEY_DEFAULT"))
            .or_else(|| self.get("OPSGENIE_API_KEY"))
    }

    /// Cleaned lookup: whitespace and surrounding quotes removed, empty is absent
    fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).and_then(|v| clean_secret(&v))
    }
}

/// Process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecrets;

impl SecretResolver for EnvSecrets {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed map, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl SecretResolver for StaticSecrets {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// `SLACK_TOKEN` + `team-a` -> `SLACK_TOKEN_TEAM_A`
pub fn team_key(prefix: &str, team: &str) -> String {
    format!("{}_{}", prefix, team.trim()).to_uppercase().replace('-', "_")
}

pub fn clean_secret(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_matches('"').trim_matches('\'').trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}
