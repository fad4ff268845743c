//! Cloudflare WAF rule toggle over the v4 REST API.
//!
//! [`CloudflareClient`] sends a single authenticated
//! `PATCH /client/v4/zones/{zone}/rulesets/{ruleset}/rules/{rule}` that flips
//! the rule's `enabled` flag. There is no retry inside the call; the next
//! scheduled run of the agent is the retry.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RuleTarget;

/// Longest response-body excerpt carried in errors and logs.
const BODY_EXCERPT_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from the Cloudflare API layer.
///
/// Transport failures and response failures are logged differently but
/// callers treat every variant as "the toggle did not happen".
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Cloudflare returned a non-2xx status code.
    #[error("Cloudflare API error ({status}): {body}")]
    Status {
        status: u16,
        /// Response body excerpt for debugging.
        body: String,
    },

    /// A 2xx response whose body was not the expected JSON envelope.
    #[error("Cloudflare API returned an unreadable body ({status}): {body}")]
    Decode { status: u16, body: String },

    /// The envelope came back with `success: false`.
    #[error("Cloudflare API reported failure ({status}): {errors}")]
    Rejected {
        status: u16,
        errors: String,
        /// Response body excerpt, including any `messages`.
        body: String,
    },
}

impl RemoteError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// PATCH body for a ruleset rule.
#[derive(Debug, Serialize)]
pub struct RulePatch<'a> {
    pub action: &'a str,
    pub description: &'a str,
    pub enabled: bool,
    pub expression: &'a str,
    pub id: &'a str,
    pub r#ref: &'a str,
}

/// Standard Cloudflare v4 response envelope. Only the fields used for
/// success detection and diagnostics are modelled.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// RuleToggle
// ---------------------------------------------------------------------------

/// Switches the protecting rule on or off.
#[async_trait]
pub trait RuleToggle: Send + Sync {
    async fn toggle_rule(&self, enabled: bool) -> Result<(), RemoteError>;
}

// ---------------------------------------------------------------------------
// CloudflareClient
// ---------------------------------------------------------------------------

/// HTTP client bound to one rule in one ruleset of one zone.
pub struct CloudflareClient {
    client: reqwest::Client,
    rule: RuleTarget,
}

impl CloudflareClient {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(rule: RuleTarget, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, rule })
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, rule: RuleTarget) -> Self {
        Self { client, rule }
    }

    /// Full URL of the target rule.
    pub fn rule_url(&self) -> String {
        format!(
            "{}/client/v4/zones/{}/rulesets/{}/rules/{}",
            self.rule.api_base_url, self.rule.zone_id, self.rule.ruleset_id, self.rule.rule_id,
        )
    }

    /// Request body for switching the rule to `enabled`.
    pub fn patch_body(&self, enabled: bool) -> RulePatch<'_> {
        RulePatch {
            action: &self.rule.action,
            description: &self.rule.description,
            enabled,
            expression: &self.rule.expression,
            id: &self.rule.rule_id,
            r#ref: &self.rule.rule_id,
        }
    }

    async fn send_patch(&self, enabled: bool) -> Result<(), RemoteError> {
        let response = self
            .client
            .patch(self.rule_url())
            .bearer_auth(&self.rule.api_token)
            .json(&self.patch_body(enabled))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: excerpt(&text),
            });
        }

        let envelope: ApiEnvelope =
            serde_json::from_str(&text).map_err(|_| RemoteError::Decode {
                status: status.as_u16(),
                body: excerpt(&text),
            })?;

        if !envelope.success {
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                errors: describe_errors(&envelope.errors),
                body: excerpt(&text),
            });
        }

        for msg in &envelope.messages {
            tracing::debug!(code = msg.code, message = %msg.message, "Cloudflare API message");
        }
        Ok(())
    }
}

#[async_trait]
impl RuleToggle for CloudflareClient {
    async fn toggle_rule(&self, enabled: bool) -> Result<(), RemoteError> {
        tracing::debug!(url = %self.rule_url(), enabled, "Patching Cloudflare rule");

        let result = self.send_patch(enabled).await;
        match &result {
            Ok(()) => {
                tracing::info!(rule_id = %self.rule.rule_id, enabled, "Cloudflare rule updated");
            }
            Err(RemoteError::Transport(e)) => {
                tracing::error!(
                    rule_id = %self.rule.rule_id,
                    enabled,
                    error = %e,
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    "Network error calling Cloudflare API",
                );
            }
            Err(RemoteError::Rejected { status, errors, body }) => {
                tracing::error!(
                    rule_id = %self.rule.rule_id,
                    enabled,
                    status,
                    errors = %errors,
                    body = %body,
                    "Cloudflare API rejected rule update",
                );
            }
            Err(e) => {
                tracing::error!(
                    rule_id = %self.rule.rule_id,
                    enabled,
                    error = %e,
                    "Cloudflare API call failed",
                );
            }
        }
        result
    }
}

/// Join envelope errors as `code: message` pairs.
fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details returned".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// First [`BODY_EXCERPT_CHARS`] characters of a response body.
fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> RuleTarget {
        RuleTarget {
            api_base_url: "https://api.cloudflare.com".into(),
            api_token: "secret".into(),
            zone_id: "z1".into(),
            ruleset_id: "rs1".into(),
            rule_id: "r1".into(),
            action: "managed_challenge".into(),
            description: "shield".into(),
            expression: "true".into(),
        }
    }

    #[test]
    fn rule_url_has_expected_path() {
        let client = CloudflareClient::with_client(reqwest::Client::new(), target());
        assert_eq!(
            client.rule_url(),
            "https://api.cloudflare.com/client/v4/zones/z1/rulesets/rs1/rules/r1"
        );
    }

    #[test]
    fn patch_body_serializes_all_fields() {
        let client = CloudflareClient::with_client(reqwest::Client::new(), target());
        let json = serde_json::to_value(client.patch_body(false)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "action": "managed_challenge",
                "description": "shield",
                "enabled": false,
                "expression": "true",
                "id": "r1",
                "ref": "r1",
            })
        );
    }

    #[test]
    fn envelope_defaults_missing_lists() {
        let env: ApiEnvelope = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(env.success);
        assert!(env.errors.is_empty());
        assert!(env.messages.is_empty());
    }

    #[test]
    fn describe_errors_joins_entries() {
        let errors = vec![
            ApiMessage { code: 10000, message: "Authentication error".into() },
            ApiMessage { code: 7003, message: "Could not route".into() },
        ];
        assert_eq!(
            describe_errors(&errors),
            "10000: Authentication error; 7003: Could not route"
        );
        assert_eq!(describe_errors(&[]), "no error details returned");
    }

    #[test]
    fn excerpt_caps_length_on_char_boundary() {
        let body = "é".repeat(600);
        assert_eq!(excerpt(&body).chars().count(), BODY_EXCERPT_CHARS);
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn status_error_display() {
        let err = RemoteError::Status { status: 403, body: "denied".into() };
        assert_eq!(err.to_string(), "Cloudflare API error (403): denied");
        assert!(!err.is_transport());
    }
}
