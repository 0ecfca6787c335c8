//! Approval Codec
//!
//! Encodes and decodes the signed payload embedded in approve/reject URLs.
//!
//! A pending execution's `Log` blob carries the two action URLs. The approve
//! URL's `p` query parameter is unpadded base64url JSON describing the alert
//! (severity, monitor condition, worker, resource info, routing info) and `s`
//! is an HMAC-SHA256 over `p`. Decoding the payload is best effort: when it
//! fails the URLs stay usable and only the decorative metadata is lost.

use crate::error::AppError;
use crate::models::ExecutionEvent;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the approver identity expected by the action endpoint
pub const APPROVER_HEADER: &str = "x-Approver";
/// Header carrying the dashboard user identity
pub const USER_HEADER: &str = "x-cloudo-user";

// =============================================================================
// PAYLOAD TYPES
// =============================================================================

/// Routing hints carried inside the approval payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opsgenie_token: Option<String>,
}

impl RoutingInfo {
    /// Copy safe to log or return over the API
    pub fn redacted(&self) -> Self {
        Self {
            team: self.team.clone(),
            slack_channel: self.slack_channel.clone(),
            slack_token: None,
            opsgenie_token: None,
        }
    }

    /// Team hint, if set to something non-blank
    pub fn team(&self) -> Option<&str> {
        self.team.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Decoded `p` parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalPayload {
    #[serde(rename = "execId", default, skip_serializing_if = "Option::is_none")]
    pub exec_id: Option<String>,
    #[serde(rename = "schemaId", default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Token expiry (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<String>,
    /// Function key forwarded to the action endpoint; never surfaced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(rename = "monitorCondition", default, skip_serializing_if = "Option::is_none")]
    pub monitor_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_info: Option<Value>,
    /// Legacy key for `resource_info`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_info: Option<RoutingInfo>,
}

impl ApprovalPayload {
    /// Resource info carried by the payload (`resource_info`, then `aks`)
    pub fn resource_info(&self) -> Option<Map<String, Value>> {
        self.resource_info
            .as_ref()
            .and_then(non_empty_object)
            .or_else(|| self.aks.as_ref().and_then(non_empty_object))
    }

    /// Copy without secrets, for the API
    pub fn redacted(&self) -> Self {
        Self {
            code: None,
            routing_info: self.routing_info.as_ref().map(RoutingInfo::redacted),
            ..self.clone()
        }
    }
}

/// Everything the dashboard needs from a pending execution's `Log` blob
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalLinks {
    pub approve: Option<String>,
    pub reject: Option<String>,
    pub message: Option<String>,
    pub payload: Option<ApprovalPayload>,
    /// Resolved by precedence: payload > Log.resource_info > Log.response.resource_info > {}
    pub resource_info: Map<String, Value>,
    /// Why the payload could not be decoded, when it could not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
}

/// Loosely shaped `Log` blob with the fields the engine reads
#[derive(Debug, Default, Deserialize)]
struct LogBlob {
    #[serde(default)]
    approve: Option<Value>,
    #[serde(default)]
    reject: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    resource_info: Option<Value>,
    #[serde(default)]
    aks: Option<Value>,
    #[serde(default)]
    response: Option<Value>,
}

impl LogBlob {
    fn resource_info(&self) -> Option<Map<String, Value>> {
        self.resource_info
            .as_ref()
            .and_then(non_empty_object)
            .or_else(|| self.aks.as_ref().and_then(non_empty_object))
    }

    fn response_resource_info(&self) -> Option<Map<String, Value>> {
        self.response
            .as_ref()
            .and_then(|r| r.get("resource_info"))
            .and_then(non_empty_object)
    }
}

/// Approve or reject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "approve" | "approved" => Some(Decision::Approve),
            "reject" | "rejected" => Some(Decision::Reject),
            _ => None,
        }
    }

    /// URL for this decision, if the log carried one
    pub fn url<'a>(&self, links: &'a ApprovalLinks) -> Option<&'a str> {
        match self {
            Decision::Approve => links.approve.as_deref(),
            Decision::Reject => links.reject.as_deref(),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Approve => write!(f, "approve"),
            Decision::Reject => write!(f, "reject"),
        }
    }
}

/// Outbound approve/reject call, ready for an executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// Links minted for a new pending execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedLinks {
    pub approve: String,
    pub reject: String,
    pub p: String,
    pub s: String,
}

/// Why a signed token was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenRejection {
    #[error("missing payload or signature")]
    MissingParts,
    #[error("signature mismatch")]
    BadSignature,
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("execId in payload does not match the route")]
    ExecIdMismatch,
    #[error("payload has no valid expiry")]
    MissingExpiry,
    #[error("payload expired")]
    Expired,
}

// =============================================================================
// CODEC
// =============================================================================

/// Approval URL codec
pub struct ApprovalCodec;

impl ApprovalCodec {
    /// Decode a `Log` blob.
    ///
    /// Fails only when the blob itself is not a JSON object. Problems with the
    /// embedded payload are logged and reported in `decode_error`.
    pub fn decode(log_blob: &str) -> Result<ApprovalLinks, AppError> {
        let value: Value = serde_json::from_str(log_blob)
            .map_err(|e| AppError::DecodeFailed(format!("log is not JSON: {}", e)))?;
        Self::decode_value(&value)
    }

    /// Decode a `Log` blob that is already parsed
    pub fn decode_value(value: &Value) -> Result<ApprovalLinks, AppError> {
        if !value.is_object() {
            return Err(AppError::DecodeFailed("log is not a JSON object".to_string()));
        }
        let blob: LogBlob = serde_json::from_value(value.clone())
            .map_err(|e| AppError::DecodeFailed(e.to_string()))?;

        let approve = blob.approve.as_ref().and_then(text);
        let reject = blob.reject.as_ref().and_then(text);
        let message = blob.message.as_ref().and_then(text);

        let (payload, decode_error) = match approve.as_deref().and_then(extract_p) {
            Some(p) => match Self::decode_payload(&p) {
                Ok(payload) => (Some(payload), None),
                Err(e) => {
                    warn!("Approval payload could not be decoded, keeping links: {}", e);
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };

        let resource_info = resolve_resource_info(
            payload.as_ref().and_then(ApprovalPayload::resource_info),
            None,
            blob.resource_info(),
            blob.response_resource_info(),
        );

        Ok(ApprovalLinks {
            approve,
            reject,
            message,
            payload,
            resource_info,
            decode_error,
        })
    }

    /// Decode the links of a log record, letting a non-empty `ResourceInfo`
    /// column override the resource info embedded in the `Log` blob.
    pub fn decode_event(event: &ExecutionEvent) -> Result<ApprovalLinks, AppError> {
        let value = match event.log.as_ref() {
            Some(Value::String(s)) => serde_json::from_str(s)
                .map_err(|e| AppError::DecodeFailed(format!("log is not JSON: {}", e)))?,
            Some(v @ Value::Object(_)) => v.clone(),
            _ => return Err(AppError::DecodeFailed("record has no log".to_string())),
        };

        let mut links = Self::decode_value(&value)?;
        let blob: LogBlob = serde_json::from_value(value).unwrap_or_default();
        links.resource_info = resolve_resource_info(
            links.payload.as_ref().and_then(ApprovalPayload::resource_info),
            event.resource_info_column(),
            blob.resource_info(),
            blob.response_resource_info(),
        );
        Ok(links)
    }

    /// Decode a `p` parameter: base64url -> bytes -> percent-decoded UTF-8 -> JSON
    pub fn decode_payload(p: &str) -> Result<ApprovalPayload, AppError> {
        let mut b64 = p.trim().replace('-', "+").replace('_', "/");
        while b64.len() % 4 != 0 {
            b64.push('=');
        }

        let raw = STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| AppError::DecodeFailed(format!("invalid base64: {}", e)))?;

        let escaped: String = raw.iter().map(|b| format!("%{:02X}", b)).collect();
        let text = urlencoding::decode(&escaped)
            .map_err(|e| AppError::DecodeFailed(format!("invalid UTF-8: {}", e)))?;

        serde_json::from_str(&text)
            .map_err(|e| AppError::DecodeFailed(format!("invalid payload JSON: {}", e)))
    }

    /// Build the GET that performs an approve/reject on behalf of an operator
    pub fn build_action_request(url: &str, approver: &str) -> ActionRequest {
        ActionRequest {
            method: "GET",
            url: url.to_string(),
            headers: vec![
                (APPROVER_HEADER.to_string(), approver.to_string()),
                (USER_HEADER.to_string(), approver.to_string()),
            ],
        }
    }

    /// Mint signed approve/reject URLs for a pending execution
    pub fn issue(
        payload: &ApprovalPayload,
        secret: &str,
        base_url: &str,
        partition_key: &str,
        exec_id: &str,
        function_key: Option<&str>,
    ) -> Result<IssuedLinks, AppError> {
        let json = serde_json::to_vec(payload)
            .map_err(|e| AppError::Internal(format!("payload serialization failed: {}", e)))?;
        let p = URL_SAFE_NO_PAD.encode(json);
        let s = Self::sign(&p, secret)?;

        let base = base_url.trim_end_matches('/');
        let code = urlencoding::encode(function_key.unwrap_or_default());
        let link = |action: &str| {
            format!(
                "{}/api/approvals/{}/{}/{}?p={}&s={}&code={}",
                base, partition_key, exec_id, action, p, s, code
            )
        };

        Ok(IssuedLinks {
            approve: link("approve"),
            reject: link("reject"),
            p,
            s,
        })
    }

    /// HMAC-SHA256 over the base64url payload text, lowercase hex
    pub fn sign(p: &str, secret: &str) -> Result<String, AppError> {
        let mut mac = new_mac(secret)?;
        mac.update(p.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify a signed token against the route's exec id and the clock
    pub fn verify(
        exec_id: &str,
        p: &str,
        s: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<ApprovalPayload, TokenRejection> {
        let (p, s) = (p.trim(), s.trim());
        if p.is_empty() || s.is_empty() {
            return Err(TokenRejection::MissingParts);
        }

        let signature = hex::decode(s).map_err(|_| TokenRejection::BadSignature)?;
        let mut mac = new_mac(secret).map_err(|_| TokenRejection::BadSignature)?;
        mac.update(p.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenRejection::BadSignature)?;

        let payload = Self::decode_payload(p)
            .map_err(|e| TokenRejection::Malformed(e.to_string()))?;

        if payload.exec_id.as_deref().map(str::trim) != Some(exec_id.trim()) {
            return Err(TokenRejection::ExecIdMismatch);
        }

        let expires_at = payload
            .exp
            .as_deref()
            .map(|e| e.replace(' ', ""))
            .and_then(|e| DateTime::parse_from_rfc3339(&e).ok())
            .ok_or(TokenRejection::MissingExpiry)?;
        if now > expires_at.with_timezone(&Utc) {
            return Err(TokenRejection::Expired);
        }

        debug!("[{}] Approval token verified", exec_id);
        Ok(payload)
    }
}

/// Apply the resource info precedence; the first non-empty source wins
pub fn resolve_resource_info(
    payload: Option<Map<String, Value>>,
    column: Option<Map<String, Value>>,
    log: Option<Map<String, Value>>,
    log_response: Option<Map<String, Value>>,
) -> Map<String, Value> {
    payload
        .or(column)
        .or(log)
        .or(log_response)
        .unwrap_or_default()
}

fn new_mac(secret: &str) -> Result<HmacSha256, AppError> {
    let key = if secret.is_empty() { "default" } else { secret };
    HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| AppError::Internal(format!("invalid HMAC key: {}", e)))
}

/// `p` query parameter of an action URL
fn extract_p(url: &str) -> Option<String> {
    let parsed = Url::parse(url)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(url)))
        .ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "p")
        .map(|(_, v)| v.replace(' ', "+"))
        .filter(|p| !p.is_empty())
}

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string).filter(|s| !s.is_empty())
}

/// Object, or a string holding an object; empty objects count as absent
fn non_empty_object(value: &Value) -> Option<Map<String, Value>> {
    let map = match value {
        Value::Object(map) => map.clone(),
        Value::String(s) => match serde_json::from_str(s) {
            Ok(Value::Object(map)) => map,
            _ => return None,
        },
        _ => return None,
    };
    (!map.is_empty()).then_some(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn encode_p(payload: &Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap())
    }

    fn log_with_p(p: &str, extra: Value) -> String {
        let mut log = json!({
            "message": "Awaiting approval",
            "approve": format!("https://orch.example/api/approvals/20250915/e1/approve?p={}&s=abc&code=k", p),
            "reject": format!("https://orch.example/api/approvals/20250915/e1/reject?p={}&s=abc&code=k", p),
        });
        if let (Some(obj), Some(extra)) = (log.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
        log.to_string()
    }

    #[test]
    fn test_decode_recovers_payload_fields() {
        let p = encode_p(&json!({
            "severity": "Sev1",
            "monitorCondition": "Fired",
            "worker": "aks-pool",
            "resource_info": {"resource_name": "aks-prod", "resource_rg": "rg-prod"},
            "routing_info": {"team": "platform"}
        }));

        let links = ApprovalCodec::decode(&log_with_p(&p, json!({}))).unwrap();
        let payload = links.payload.clone().unwrap();
        assert_eq!(payload.severity.as_deref(), Some("Sev1"));
        assert_eq!(payload.monitor_condition.as_deref(), Some("Fired"));
        assert_eq!(payload.worker.as_deref(), Some("aks-pool"));
        assert_eq!(payload.routing_info.unwrap().team.as_deref(), Some("platform"));
        assert_eq!(links.resource_info.get("resource_name"), Some(&json!("aks-prod")));
        assert_eq!(links.message.as_deref(), Some("Awaiting approval"));
        assert!(links.decode_error.is_none());
    }

    #[test]
    fn test_decode_handles_non_ascii_payload() {
        let p = encode_p(&json!({"severity": "Sev2", "worker": "nodo-çà"}));
        let links = ApprovalCodec::decode(&log_with_p(&p, json!({}))).unwrap();
        assert_eq!(links.payload.unwrap().worker.as_deref(), Some("nodo-çà"));
    }

    #[test]
    fn test_malformed_p_keeps_links() {
        let links = ApprovalCodec::decode(&log_with_p("%%%not-base64", json!({}))).unwrap();
        assert!(links.payload.is_none());
        assert!(links.decode_error.is_some());
        assert!(links.approve.unwrap().contains("/approve?"));
        assert!(links.reject.unwrap().contains("/reject?"));
    }

    #[test]
    fn test_p_that_is_not_json_keeps_links() {
        let p = URL_SAFE_NO_PAD.encode(b"plain text, not json");
        let links = ApprovalCodec::decode(&log_with_p(&p, json!({}))).unwrap();
        assert!(links.payload.is_none());
        assert!(links.approve.is_some());
    }

    #[test]
    fn test_missing_urls_are_none_not_errors() {
        let links = ApprovalCodec::decode(r#"{"message":"Approved and executed"}"#).unwrap();
        assert_eq!(links.approve, None);
        assert_eq!(links.reject, None);
        assert_eq!(links.payload, None);
        assert!(links.resource_info.is_empty());
    }

    #[test]
    fn test_log_that_is_not_json_is_an_error() {
        assert!(matches!(
            ApprovalCodec::decode("Worker crashed"),
            Err(AppError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_resource_info_precedence() {
        let with_payload_ri = encode_p(&json!({"resource_info": {"from": "payload"}}));
        let without_ri = encode_p(&json!({"severity": "Sev3"}));
        let log_ri = json!({
            "resource_info": {"from": "log"},
            "response": {"resource_info": {"from": "response"}}
        });

        let links = ApprovalCodec::decode(&log_with_p(&with_payload_ri, log_ri.clone())).unwrap();
        assert_eq!(links.resource_info.get("from"), Some(&json!("payload")));

        let links = ApprovalCodec::decode(&log_with_p(&without_ri, log_ri)).unwrap();
        assert_eq!(links.resource_info.get("from"), Some(&json!("log")));

        let links = ApprovalCodec::decode(&log_with_p(
            &without_ri,
            json!({"response": {"resource_info": {"from": "response"}}}),
        ))
        .unwrap();
        assert_eq!(links.resource_info.get("from"), Some(&json!("response")));

        let links = ApprovalCodec::decode(&log_with_p(&without_ri, json!({}))).unwrap();
        assert!(links.resource_info.is_empty());
    }

    #[test]
    fn test_legacy_aks_key_is_resource_info() {
        let p = encode_p(&json!({"aks": {"aks_namespace": "payments"}}));
        let links = ApprovalCodec::decode(&log_with_p(&p, json!({}))).unwrap();
        assert_eq!(links.resource_info.get("aks_namespace"), Some(&json!("payments")));
    }

    #[test]
    fn test_decode_event_column_beats_log() {
        let event = ExecutionEvent {
            exec_id: "e1".into(),
            log: Some(json!({"approve": "https://x/approve", "resource_info": {"from": "log"}})),
            resource_info: Some(json!({"from": "column"})),
            ..Default::default()
        };
        let links = ApprovalCodec::decode_event(&event).unwrap();
        assert_eq!(links.resource_info.get("from"), Some(&json!("column")));
        assert_eq!(links.approve.as_deref(), Some("https://x/approve"));
    }

    #[test]
    fn test_build_action_request_carries_identity() {
        let request = ApprovalCodec::build_action_request("https://x/approve?p=1", "alice@example.com");
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "https://x/approve?p=1");
        assert_eq!(
            request.headers,
            vec![
                ("x-Approver".to_string(), "alice@example.com".to_string()),
                ("x-cloudo-user".to_string(), "alice@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn test_issue_then_verify() {
        let now = Utc::now();
        let payload = ApprovalPayload {
            exec_id: Some("e1".into()),
            schema_id: Some("restart-pod".into()),
            exp: Some((now + Duration::minutes(60)).to_rfc3339()),
            severity: Some("Sev2".into()),
            ..Default::default()
        };

        let issued = ApprovalCodec::issue(&payload, "s3cret", "https://orch.example/", "20250915", "e1", Some("fk"))
            .unwrap();
        assert!(issued.approve.starts_with("https://orch.example/api/approvals/20250915/e1/approve?p="));
        assert!(issued.reject.ends_with("&code=fk"));

        let verified = ApprovalCodec::verify("e1", &issued.p, &issued.s, "s3cret", now).unwrap();
        assert_eq!(verified, payload);

        // The dashboard-side decoder reads the same payload from the minted URL
        let log = json!({"approve": issued.approve, "reject": issued.reject}).to_string();
        let links = ApprovalCodec::decode(&log).unwrap();
        assert_eq!(links.payload.unwrap().severity.as_deref(), Some("Sev2"));
    }

    #[test]
    fn test_verify_rejections() {
        let now = Utc::now();
        let payload = ApprovalPayload {
            exec_id: Some("e1".into()),
            exp: Some((now + Duration::minutes(5)).to_rfc3339()),
            ..Default::default()
        };
        let issued = ApprovalCodec::issue(&payload, "s3cret", "https://o", "p", "e1", None).unwrap();

        assert_eq!(
            ApprovalCodec::verify("e1", "", &issued.s, "s3cret", now),
            Err(TokenRejection::MissingParts)
        );
        assert_eq!(
            ApprovalCodec::verify("e1", &issued.p, &issued.s, "other", now),
            Err(TokenRejection::BadSignature)
        );
        assert_eq!(
            ApprovalCodec::verify("e2", &issued.p, &issued.s, "s3cret", now),
            Err(TokenRejection::ExecIdMismatch)
        );
        assert_eq!(
            ApprovalCodec::verify("e1", &issued.p, &issued.s, "s3cret", now + Duration::minutes(6)),
            Err(TokenRejection::Expired)
        );

        let no_exp = ApprovalPayload { exec_id: Some("e1".into()), ..Default::default() };
        let issued = ApprovalCodec::issue(&no_exp, "s3cret", "https://o", "p", "e1", None).unwrap();
        assert_eq!(
            ApprovalCodec::verify("e1", &issued.p, &issued.s, "s3cret", now),
            Err(TokenRejection::MissingExpiry)
        );
    }

    #[test]
    fn test_redacted_payload_drops_secrets() {
        let payload = ApprovalPayload {
            code: Some("function-key".into()),
            routing_info: Some(RoutingInfo {
                team: Some("ops".into()),
                slack_token: Some("xoxb-1".into()),
                opsgenie_token: Some("og".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let redacted = payload.redacted();
        assert_eq!(redacted.code, None);
        let ri = redacted.routing_info.unwrap();
        assert_eq!(ri.team.as_deref(), Some("ops"));
        assert_eq!(ri.slack_token, None);
        assert_eq!(ri.opsgenie_token, None);
    }

    #[test]
    fn test_decision_parse() {
        assert_eq!(Decision::parse("Approve"), Some(Decision::Approve));
        assert_eq!(Decision::parse("rejected"), Some(Decision::Reject));
        assert_eq!(Decision::parse("maybe"), None);
    }
}
