//! Notification Router
//!
//! Evaluates every rule against one event. All matching rules contribute
//! their actions, which are then resolved against the team table, extended
//! with the payload's `routing_info` team and deduplicated.

use crate::error::AppError;
use crate::governance::approval::{ApprovalLinks, RoutingInfo};
use crate::models::{ExecStatus, ExecutionEvent};
use crate::routing::rules::{RoutingConfig, ThenAction, When};
use crate::routing::secrets::SecretResolver;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

static SEVERITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:sev)?\s*(\d+)\s*$").expect("valid severity pattern"));

/// Statuses accepted by `finalOnly`
const FINAL_STATUSES: [&str; 6] = ["succeeded", "completed", "error", "failed", "timeout", "routed"];
/// Statuses that still page someone when nothing matched
const FALLBACK_STATUSES: [&str; 5] = ["error", "failed", "timeout", "routed", "scheduled"];

/// `Sev2` -> 2; anything unparseable is `None`
pub fn parse_severity(raw: &str) -> Option<u8> {
    SEVERITY_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Comparison view of one event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedEvent {
    pub exec_id: String,
    pub name: Option<String>,
    pub status: String,
    pub severity: Option<String>,
    pub resource_id: Option<String>,
    pub resource_group: Option<String>,
    pub resource_name: Option<String>,
    pub namespace: Option<String>,
    pub subscription_id: Option<String>,
    pub alert_rule: Option<String>,
    pub oncall: bool,
    pub monitor_condition: Option<String>,
    pub routing_info: Option<RoutingInfo>,
}

impl NormalizedEvent {
    /// Build from a log record and its decoded approval links
    pub fn from_event(event: &ExecutionEvent, links: &ApprovalLinks) -> Self {
        let info = &links.resource_info;
        let payload = links.payload.as_ref();

        Self {
            exec_id: event.exec_id.clone(),
            name: event.name.clone(),
            status: event.status.clone(),
            severity: event
                .severity
                .clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| payload.and_then(|p| p.severity.clone())),
            resource_id: field(info, &["resource_id", "resourceId"]),
            resource_group: field(info, &["resource_rg", "resource_group", "resourceGroup"]),
            resource_name: field(info, &["resource_name", "resourceName"]),
            namespace: field(info, &["aks_namespace", "namespace"]),
            subscription_id: field(info, &["subscription_id", "subscriptionId"]),
            alert_rule: event.name.clone().or_else(|| event.schema_id.clone()),
            oncall: event.on_call,
            monitor_condition: event
                .monitor_condition
                .clone()
                .or_else(|| payload.and_then(|p| p.monitor_condition.clone())),
            routing_info: payload.and_then(|p| p.routing_info.clone()),
        }
    }

    pub fn status_lower(&self) -> String {
        self.status.trim().to_lowercase()
    }

    pub fn severity_level(&self) -> Option<u8> {
        self.severity.as_deref().and_then(parse_severity)
    }

    /// Explicit subscription, else the one embedded in `resourceId`
    pub fn effective_subscription(&self) -> Option<String> {
        self.subscription_id
            .clone()
            .or_else(|| self.resource_id.as_deref().and_then(subscription_from_resource_id))
    }

    /// Has a severity or a failure status
    pub fn is_alert(&self) -> bool {
        self.severity_level().is_some()
            || matches!(ExecStatus::parse(&self.status), ExecStatus::Failed | ExecStatus::Error | ExecStatus::Timeout)
    }
}

fn field(info: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match info.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}

/// `/subscriptions/<id>/resourceGroups/...` -> `<id>`
pub fn subscription_from_resource_id(resource_id: &str) -> Option<String> {
    let mut parts = resource_id.split('/');
    let _leading = parts.next()?;
    let marker = parts.next()?;
    let id = parts.next()?;
    (marker.eq_ignore_ascii_case("subscriptions") && !id.is_empty()).then(|| id.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Slack,
    Opsgenie,
}

impl ActionKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "slack" => Some(ActionKind::Slack),
            "opsgenie" => Some(ActionKind::Opsgenie),
            _ => None,
        }
    }
}

/// Resolved notification target; credentials are never serialized
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub team: Option<String>,
    pub channel: Option<String>,
    #[serde(skip)]
    pub token: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Action {
    pub fn slack(team: Option<String>, channel: Option<String>, token: Option<String>) -> Self {
        Self { kind: ActionKind::Slack, team, channel, token, api_key: None }
    }

    pub fn opsgenie(team: Option<String>, api_key: Option<String>) -> Self {
        Self { kind: ActionKind::Opsgenie, team, channel: None, token: None, api_key }
    }

    /// Slack: channel (or team); Opsgenie: team
    pub fn dedup_key(&self) -> (ActionKind, Option<String>) {
        match self.kind {
            ActionKind::Slack => (self.kind, self.channel.clone().or_else(|| self.team.clone())),
            ActionKind::Opsgenie => (self.kind, self.team.clone()),
        }
    }

    pub fn has_credentials(&self) -> bool {
        match self.kind {
            ActionKind::Slack => self.token.is_some() && self.channel.is_some(),
            ActionKind::Opsgenie => self.api_key.is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingReason {
    Matched,
    FallbackOpsgenie,
    NoActionNonFinal,
}

/// Action removed because its team is not configured
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedAction {
    pub rule_index: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub team: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub actions: Vec<Action>,
    pub matched_rules: Vec<usize>,
    pub reason: RoutingReason,
    pub dropped: Vec<DroppedAction>,
}

/// Rule evaluator; the configuration is passed per call
#[derive(Clone)]
pub struct NotificationRouter {
    secrets: Arc<dyn SecretResolver>,
}

impl NotificationRouter {
    pub fn new(secrets: Arc<dyn SecretResolver>) -> Self {
        Self { secrets }
    }

    pub fn route(&self, event: &NormalizedEvent, config: &RoutingConfig) -> RoutingDecision {
        let exec_id = if event.exec_id.is_empty() { "unknown" } else { event.exec_id.as_str() };
        let status = event.status_lower();
        let ri = event.routing_info.clone().unwrap_or_default();
        if event.routing_info.is_some() {
            info!("[{}] Routing info (redacted): {:?}", exec_id, ri.redacted());
        }
        info!("[{}] Routing: evaluating {} rules for status={}", exec_id, config.rules.len(), status);

        let mut actions = Vec::new();
        let mut matched_rules = Vec::new();
        let mut dropped = Vec::new();

        for (idx, rule) in config.rules.iter().enumerate() {
            if !matches(&rule.when, event, exec_id) {
                continue;
            }
            matched_rules.push(idx);

            let mut resolved = Vec::new();
            for then in &rule.then {
                match self.resolve(then, config, &ri) {
                    Ok(Some(action)) => resolved.push(action),
                    Ok(None) => warn!("[{}] Ignoring unsupported action type: {}", exec_id, then.kind),
                    Err(e) => {
                        warn!("[{}] Rule #{} action dropped: {}", exec_id, idx, e);
                        dropped.push(DroppedAction {
                            rule_index: idx,
                            kind: then.kind.clone(),
                            team: then.team.clone().unwrap_or_default(),
                            error: e.to_string(),
                        });
                    }
                }
            }
            self.extend_for_routing_team(&mut resolved, config, &ri);
            debug!("[{}] Rule #{} contributed {} action(s)", exec_id, idx, resolved.len());
            actions.extend(resolved);
        }

        let actions = dedup(actions);
        if !actions.is_empty() {
            info!(
                "[{}] Routing: {} rule(s) matched, {} action(s)",
                exec_id,
                matched_rules.len(),
                actions.len()
            );
            return RoutingDecision { actions, matched_rules, reason: RoutingReason::Matched, dropped };
        }

        if FALLBACK_STATUSES.contains(&status.as_str()) {
            let team = ri.team().map(str::to_string).or_else(|| config.defaults.opsgenie.team.clone());
            let api_key = ri
                .opsgenie_token
                .clone()
                .or_else(|| self.secrets.opsgenie_api_key(team.as_deref()));
            info!("[{}] Routing: no action resolved, using Opsgenie fallback", exec_id);
            return RoutingDecision {
                actions: vec![Action::opsgenie(team, api_key)],
                matched_rules,
                reason: RoutingReason::FallbackOpsgenie,
                dropped,
            };
        }

        warn!("[{}] Routing: non-final status and no rule matched, no actions", exec_id);
        RoutingDecision { actions: Vec::new(), matched_rules, reason: RoutingReason::NoActionNonFinal, dropped }
    }

    /// `Ok(None)` for unsupported kinds, `Err` for unknown teams
    fn resolve(&self, then: &ThenAction, config: &RoutingConfig, ri: &RoutingInfo) -> Result<Option<Action>, AppError> {
        let Some(kind) = ActionKind::parse(&then.kind) else {
            return Ok(None);
        };

        let explicit_team = then.team.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let team_conf = match explicit_team {
            Some(name) => Some(
                config
                    .teams
                    .get(name)
                    .ok_or_else(|| AppError::UnknownTeam(name.to_string()))?,
            ),
            None => ri.team().and_then(|name| config.teams.get(name)),
        };
        let team = explicit_team.or_else(|| ri.team()).map(str::to_string);

        let action = match kind {
            ActionKind::Slack => {
                let channel = then
                    .channel
                    .clone()
                    .or_else(|| team_conf.and_then(|t| t.slack_channel()).map(str::to_string))
                    .or_else(|| config.defaults.slack.channel.clone())
                    .or_else(|| ri.slack_channel.clone());
                let token = then
                    .token
                    .clone()
                    .or_else(|| self.secrets.slack_token(team.as_deref()))
                    .or_else(|| ri.slack_token.clone());
                Action::slack(team, channel, token)
            }
            ActionKind::Opsgenie => {
                let og_team = team_conf
                    .and_then(|t| t.opsgenie_team())
                    .map(str::to_string)
                    .or(team)
                    .or_else(|| config.defaults.opsgenie.team.clone());
                let api_key = then
                    .api_key
                    .clone()
                    .or_else(|| self.secrets.opsgenie_api_key(og_team.as_deref()))
                    .or_else(|| ri.opsgenie_token.clone());
                Action::opsgenie(og_team, api_key)
            }
        };
        Ok(Some(action))
    }

    /// Make sure the payload's own team hears about it too
    fn extend_for_routing_team(&self, resolved: &mut Vec<Action>, config: &RoutingConfig, ri: &RoutingInfo) {
        let has_kind = |kind| resolved.iter().any(|a: &Action| a.kind == kind);
        let (has_slack, has_opsgenie) = (has_kind(ActionKind::Slack), has_kind(ActionKind::Opsgenie));
        let ri_team = ri.team().map(str::to_string);

        if has_slack {
            if let Some(team) = &ri_team {
                let covered = resolved
                    .iter()
                    .any(|a| a.kind == ActionKind::Slack && a.team.as_ref() == Some(team));
                if !covered {
                    let channel = ri
                        .slack_channel
                        .clone()
                        .or_else(|| config.teams.get(team).and_then(|t| t.slack_channel()).map(str::to_string))
                        .or_else(|| config.defaults.slack.channel.clone());
                    let token = ri.slack_token.clone().or_else(|| self.secrets.slack_token(Some(team)));
                    if channel.is_some() || token.is_some() {
                        resolved.push(Action::slack(Some(team.clone()), channel, token));
                    }
                }
            }
        }

        if has_opsgenie && (ri_team.is_some() || ri.opsgenie_token.is_some()) {
            let og_team = ri_team.or_else(|| config.defaults.opsgenie.team.clone());
            let covered = resolved
                .iter()
                .any(|a| a.kind == ActionKind::Opsgenie && a.team == og_team);
            if !covered {
                let api_key = ri
                    .opsgenie_token
                    .clone()
                    .or_else(|| self.secrets.opsgenie_api_key(og_team.as_deref()));
                if api_key.is_some() {
                    resolved.push(Action::opsgenie(og_team, api_key));
                }
            }
        }
    }
}

fn dedup(actions: Vec<Action>) -> Vec<Action> {
    let mut seen = HashSet::new();
    actions
        .into_iter()
        .filter(|a| seen.insert(a.dedup_key()))
        .collect()
}

/// Every specified field of `when` must hold
pub fn matches(when: &When, event: &NormalizedEvent, exec_id: &str) -> bool {
    if when.any.as_deref() == Some("*") {
        return true;
    }

    let status = event.status_lower();
    if when.final_only == Some(true) && !FINAL_STATUSES.contains(&status.as_str()) {
        debug!("[{}] Routing mismatch: status '{}' is not final", exec_id, status);
        return false;
    }
    if let Some(allowed) = &when.status_in {
        if !allowed.iter().any(|s| s.trim().eq_ignore_ascii_case(&status)) {
            debug!("[{}] Routing mismatch: status '{}' not in {:?}", exec_id, status, allowed);
            return false;
        }
    }

    let subscription = event.effective_subscription();
    let exact = [
        ("resourceId", &when.resource_id, event.resource_id.as_ref()),
        ("resourceGroup", &when.resource_group, event.resource_group.as_ref()),
        ("resourceName", &when.resource_name, event.resource_name.as_ref()),
        ("subscriptionId", &when.subscription_id, subscription.as_ref()),
        ("namespace", &when.namespace, event.namespace.as_ref()),
        ("alertRule", &when.alert_rule, event.alert_rule.as_ref()),
    ];
    for (name, expected, actual) in exact {
        if let Some(expected) = expected {
            if actual != Some(expected) {
                debug!("[{}] Routing mismatch: {} {:?} != '{}'", exec_id, name, actual, expected);
                return false;
            }
        }
    }

    if let Some(expected) = &when.oncall {
        let actual = if event.oncall { "true" } else { "false" };
        if expected.trim() != actual {
            debug!("[{}] Routing mismatch: oncall '{}' != '{}'", exec_id, actual, expected);
            return false;
        }
    }

    if let Some(prefix) = &when.resource_group_prefix {
        if !event.resource_group.as_deref().is_some_and(|rg| rg.starts_with(prefix.as_str())) {
            debug!("[{}] Routing mismatch: resourceGroup does not start with '{}'", exec_id, prefix);
            return false;
        }
    }

    if let Some(should_be_alert) = when.is_alert {
        if should_be_alert != event.is_alert() {
            debug!("[{}] Routing mismatch: isAlert requirement {}", exec_id, should_be_alert);
            return false;
        }
    }

    let severity = event.severity_level();
    if let Some(min) = when.severity_min.as_deref().and_then(parse_severity) {
        if severity.map_or(true, |s| s < min) {
            debug!("[{}] Routing mismatch: severity {:?} < severityMin {}", exec_id, severity, min);
            return false;
        }
    }
    if let Some(max) = when.severity_max.as_deref().and_then(parse_severity) {
        if severity.map_or(true, |s| s > max) {
            debug!("[{}] Routing mismatch: severity {:?} > severityMax {}", exec_id, severity, max);
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::rules::{Team, DEFAULT_SLACK_CHANNEL};
    use crate::routing::secrets::StaticSecrets;
    use pretty_assertions::assert_eq;

    fn router() -> NotificationRouter {
        NotificationRouter::new(Arc::new(StaticSecrets::new([
            ("SLACK_TOKEN_DEFAULT", "xoxb-default"),
            ("OPSGENIE_API_KEY_DEFAULT", "og-default"),
            ("OPSGENIE_API_KEY_PAYMENTS", "og-payments"),
        ])))
    }

    fn config(raw: &str) -> RoutingConfig {
        RoutingConfig::parse(raw, DEFAULT_SLACK_CHANNEL).unwrap()
    }

    fn failed_event() -> NormalizedEvent {
        NormalizedEvent {
            exec_id: "e1".into(),
            status: "failed".into(),
            severity: Some("Sev1".into()),
            resource_group: Some("rg-payments-prod".into()),
            resource_id: Some("/subscriptions/sub-123/resourceGroups/rg-payments-prod/providers/x".into()),
            namespace: Some("payments".into()),
            oncall: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_severity() {
        assert_eq!(parse_severity("Sev0"), Some(0));
        assert_eq!(parse_severity(" sev3 "), Some(3));
        assert_eq!(parse_severity("2"), Some(2));
        assert_eq!(parse_severity("critical"), None);
        assert_eq!(parse_severity(""), None);
    }

    #[test]
    fn test_subscription_from_resource_id() {
        assert_eq!(
            subscription_from_resource_id("/subscriptions/abc/resourceGroups/rg").as_deref(),
            Some("abc")
        );
        assert_eq!(subscription_from_resource_id("/providers/x"), None);
        assert_eq!(subscription_from_resource_id(""), None);
    }

    #[test]
    fn test_severity_bounds() {
        let event = failed_event();
        let when = |max: &str| When { severity_max: Some(max.into()), ..Default::default() };
        assert!(matches(&when("Sev2"), &event, "e1"));
        assert!(matches(&when("Sev1"), &event, "e1"));
        assert!(!matches(&when("Sev0"), &event, "e1"));

        let min = When { severity_min: Some("Sev2".into()), ..Default::default() };
        assert!(!matches(&min, &event, "e1"));

        let mut no_sev = event.clone();
        no_sev.severity = None;
        assert!(!matches(&when("Sev4"), &no_sev, "e1"));
    }

    #[test]
    fn test_empty_when_is_wildcard() {
        assert!(matches(&When::default(), &NormalizedEvent::default(), "x"));
    }

    #[test]
    fn test_field_matching() {
        let event = failed_event();
        let ok = When {
            status_in: Some(vec!["FAILED".into(), "error".into()]),
            resource_group_prefix: Some("rg-pay".into()),
            subscription_id: Some("sub-123".into()),
            namespace: Some("payments".into()),
            oncall: Some("true".into()),
            is_alert: Some(true),
            ..Default::default()
        };
        assert!(matches(&ok, &event, "e1"));

        let case_sensitive = When { namespace: Some("Payments".into()), ..Default::default() };
        assert!(!matches(&case_sensitive, &event, "e1"));

        let oncall_false = When { oncall: Some("false".into()), ..Default::default() };
        assert!(!matches(&oncall_false, &event, "e1"));

        let wrong_status = When { status_in: Some(vec!["succeeded".into()]), ..Default::default() };
        assert!(!matches(&wrong_status, &event, "e1"));
    }

    #[test]
    fn test_final_only() {
        let when = When { final_only: Some(true), ..Default::default() };
        let mut event = failed_event();
        assert!(matches(&when, &event, "e1"));
        event.status = "pending".into();
        assert!(!matches(&when, &event, "e1"));
        assert!(matches(&When { final_only: Some(false), ..Default::default() }, &event, "e1"));
    }

    #[test]
    fn test_all_matching_rules_fire_and_dedup() {
        let config = config(
            r##"{
                "teams": {
                    "payments": {"slack": {"channel": "#payments"}, "opsgenie": {"team": "payments"}},
                    "platform": {"slack": {"channel": "#platform"}}
                },
                "rules": [
                    {"when": {"resourceGroupPrefix": "rg-payments"}, "then": [{"type": "slack", "team": "payments"}]},
                    {"when": {"severityMax": "Sev2"}, "then": [{"type": "opsgenie", "team": "payments"}]},
                    {"when": {"namespace": "payments"}, "then": [{"type": "slack", "team": "platform"}, {"type": "slack", "team": "payments"}]},
                    {"when": {"any": "*"}, "then": [{"type": "slack", "channel": "#all"}]}
                ]
            }"##,
        );

        let decision = router().route(&failed_event(), &config);
        assert_eq!(decision.reason, RoutingReason::Matched);
        assert_eq!(decision.matched_rules, vec![0, 1, 2, 3]);

        let keys: Vec<_> = decision.actions.iter().map(|a| a.dedup_key()).collect();
        assert_eq!(
            keys,
            vec![
                (ActionKind::Slack, Some("#payments".to_string())),
                (ActionKind::Opsgenie, Some("payments".to_string())),
                (ActionKind::Slack, Some("#platform".to_string())),
                (ActionKind::Slack, Some("#all".to_string())),
            ]
        );
        let og = &decision.actions[1];
        assert_eq!(og.api_key.as_deref(), Some("og-payments"));
        assert!(decision.actions[0].has_credentials());
    }

    #[test]
    fn test_unknown_team_drops_only_that_action() {
        let config = config(
            r##"{
                "teams": {"payments": {"slack": {"channel": "#payments"}}},
                "rules": [
                    {"when": {}, "then": [{"type": "slack", "team": "ghost"}, {"type": "slack", "team": "payments"}]}
                ]
            }"##,
        );

        let decision = router().route(&failed_event(), &config);
        assert_eq!(decision.actions.len(), 1);
        assert_eq!(decision.actions[0].channel.as_deref(), Some("#payments"));
        assert_eq!(decision.dropped.len(), 1);
        assert_eq!(decision.dropped[0].team, "ghost");
        assert_eq!(decision.dropped[0].error, "Unknown team: ghost");
    }

    #[test]
    fn test_unsupported_action_type_is_ignored() {
        let config = config(r#"{"rules": [{"when": {}, "then": [{"type": "email"}]}]}"#);
        let mut event = failed_event();
        event.status = "running".into();
        let decision = router().route(&event, &config);
        assert!(decision.actions.is_empty());
        assert!(decision.dropped.is_empty());
        assert_eq!(decision.reason, RoutingReason::NoActionNonFinal);
    }

    #[test]
    fn test_fallback_opsgenie_for_final_failures() {
        let config = config(r#"{"rules": [{"when": {"namespace": "other"}, "then": [{"type": "slack"}]}]}"#);
        let decision = router().route(&failed_event(), &config);
        assert_eq!(decision.reason, RoutingReason::FallbackOpsgenie);
        assert_eq!(decision.actions.len(), 1);
        assert_eq!(decision.actions[0].kind, ActionKind::Opsgenie);
        assert_eq!(decision.actions[0].team.as_deref(), Some("default"));
        assert_eq!(decision.actions[0].api_key.as_deref(), Some("og-default"));

        let mut running = failed_event();
        running.status = "running".into();
        assert_eq!(router().route(&running, &config).reason, RoutingReason::NoActionNonFinal);
    }

    #[test]
    fn test_routing_info_team_gets_extra_actions() {
        let mut config = config(
            r##"{"rules": [{"when": {"any": "*"}, "then": [{"type": "slack", "channel": "#all"}, {"type": "opsgenie"}]}]}"##,
        );
        config.teams.insert("payments".into(), Team::default());

        let mut event = failed_event();
        event.routing_info = Some(RoutingInfo {
            team: Some("payments".into()),
            slack_channel: Some("#pay-alerts".into()),
            slack_token: Some("xoxb-ri".into()),
            opsgenie_token: None,
        });

        let decision = router().route(&event, &config);
        let slack: Vec<_> = decision
            .actions
            .iter()
            .filter(|a| a.kind == ActionKind::Slack)
            .map(|a| (a.channel.clone(), a.team.clone()))
            .collect();
        // The #all action already carries the routing team, so no extra Slack target
        assert_eq!(slack, vec![(Some("#all".to_string()), Some("payments".to_string()))]);
        let og: Vec<_> = decision.actions.iter().filter(|a| a.kind == ActionKind::Opsgenie).collect();
        assert_eq!(og.len(), 1);
        assert_eq!(og[0].team.as_deref(), Some("payments"));
        assert_eq!(og[0].api_key.as_deref(), Some("og-payments"));
    }

    #[test]
    fn test_routing_info_extra_slack_when_team_not_covered() {
        let mut config = config(
            r#"{"rules": [{"when": {"any": "*"}, "then": [{"type": "slack", "team": "platform"}]}]}"#,
        );
        config.teams.insert("platform".into(), Team::default());

        let mut event = failed_event();
        event.routing_info = Some(RoutingInfo {
            team: Some("payments".into()),
            slack_channel: Some("#pay-alerts".into()),
            ..Default::default()
        });

        let decision = router().route(&event, &config);
        let channels: Vec<_> = decision.actions.iter().filter_map(|a| a.channel.clone()).collect();
        assert_eq!(channels, vec![DEFAULT_SLACK_CHANNEL.to_string(), "#pay-alerts".to_string()]);
    }

    #[test]
    fn test_normalized_event_from_links() {
        let mut resource_info = Map::new();
        resource_info.insert("resource_rg".into(), Value::String("rg-a".into()));
        resource_info.insert("aks_namespace".into(), Value::String("ns".into()));
        resource_info.insert("resource_id".into(), Value::String("/subscriptions/s1/rg".into()));
        let links = ApprovalLinks { resource_info, ..Default::default() };
        let event = ExecutionEvent {
            exec_id: "e".into(),
            status: "error".into(),
            name: Some("disk-full".into()),
            severity: Some("Sev3".into()),
            on_call: true,
            ..Default::default()
        };

        let normalized = NormalizedEvent::from_event(&event, &links);
        assert_eq!(normalized.resource_group.as_deref(), Some("rg-a"));
        assert_eq!(normalized.namespace.as_deref(), Some("ns"));
        assert_eq!(normalized.alert_rule.as_deref(), Some("disk-full"));
        assert_eq!(normalized.effective_subscription().as_deref(), Some("s1"));
        assert_eq!(normalized.severity_level(), Some(3));
        assert!(normalized.is_alert());
    }

    #[test]
    fn test_fallback_config_routes_failures() {
        let config = RoutingConfig::fallback(DEFAULT_SLACK_CHANNEL);
        let decision = router().route(&failed_event(), &config);
        assert_eq!(decision.matched_rules, vec![0, 1]);
        let kinds: Vec<_> = decision.actions.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::Opsgenie, ActionKind::Slack]);
    }
}
