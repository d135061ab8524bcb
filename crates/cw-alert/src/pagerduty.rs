//! PagerDuty generic Events API (v1) client.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Ack, AlertingService, DispatchError, ResolveIncident, TriggerIncident};

pub const DEFAULT_EVENTS_BASE_URL: &str = "https://events.pagerduty.com";

const CREATE_EVENT_PATH: &str = "/generic/2010-04-15/create_event.json";

/// Longest response body kept in a [`DispatchError::Http`].
const MAX_ERROR_BODY: usize = 512;

/// Connection settings. Secrets are resolved by the caller; never log them.
#[derive(Clone)]
pub struct PagerDutyConfig {
    pub events_base_url: String,
    pub service_key: String,
    /// REST token, sent as `Authorization: Token token=...` when set.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for PagerDutyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagerDutyConfig")
            .field("events_base_url", &self.events_base_url)
            .field("service_key", &"<REDACTED>")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct EventRequest<'a> {
    service_key: &'a str,
    incident_key: &'a str,
    event_type: &'static str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_url: Option<&'a str>,
    details: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    incident_key: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PagerDutyClient {
    cfg: PagerDutyConfig,
    http: reqwest::Client,
}

impl PagerDutyClient {
    pub fn new(cfg: PagerDutyConfig) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(Self { cfg, http })
    }

    fn create_event_url(&self) -> String {
        format!(
            "{}{}",
            self.cfg.events_base_url.trim_end_matches('/'),
            CREATE_EVENT_PATH
        )
    }

    async fn send(&self, req: &EventRequest<'_>) -> Result<Ack, DispatchError> {
        let mut builder = self.http.post(self.create_event_url()).json(req);
        if let Some(key) = self.cfg.api_key.as_deref() {
            builder = builder.header(
                reqwest::header::AUTHORIZATION,
                format!("Token token={key}"),
            );
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        if !status.is_success() {
            let mut body = body;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(DispatchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EventResponse =
            serde_json::from_str(&body).map_err(|e| DispatchError::Decode(e.to_string()))?;

        if parsed.status != "success" {
            let mut msg = parsed.message;
            if !parsed.errors.is_empty() {
                msg = format!("{msg} ({})", parsed.errors.join("; "));
            }
            return Err(DispatchError::Rejected(msg));
        }

        debug!(
            incident_key = req.incident_key,
            event_type = req.event_type,
            "pagerduty accepted event"
        );
        Ok(Ack {
            status: parsed.status,
            message: parsed.message,
            incident_key: parsed.incident_key,
        })
    }
}

#[async_trait]
impl AlertingService for PagerDutyClient {
    async fn trigger_incident(&self, incident: &TriggerIncident) -> Result<Ack, DispatchError> {
        self.send(&EventRequest {
            service_key: &self.cfg.service_key,
            incident_key: &incident.incident_key,
            event_type: "trigger",
            description: &incident.description,
            client: Some(&incident.client),
            client_url: Some(&incident.client_url),
            details: &incident.details,
        })
        .await
    }

    async fn resolve_incident(&self, incident: &ResolveIncident) -> Result<Ack, DispatchError> {
        self.send(&EventRequest {
            service_key: &self.cfg.service_key,
            incident_key: &incident.incident_key,
            event_type: "resolve",
            description: &incident.description,
            client: None,
            client_url: None,
            details: &incident.details,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_keys() {
        let cfg = PagerDutyConfig {
            events_base_url: DEFAULT_EVENTS_BASE_URL.to_string(),
            service_key: "88fd1c835c374369b81ff95b9e4c07de".to_string(),
            api_key: Some("tok-123".to_string()),
            timeout: Duration::from_secs(5),
        };
        let s = format!("{cfg:?}");
        assert!(!s.contains("88fd1c83"));
        assert!(!s.contains("tok-123"));
        assert!(s.contains("<REDACTED>"));
    }

    #[test]
    fn url_tolerates_trailing_slash() {
        let client = PagerDutyClient::new(PagerDutyConfig {
            events_base_url: "http://127.0.0.1:9/".to_string(),
            service_key: "k".to_string(),
            api_key: None,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            client.create_event_url(),
            "http://127.0.0.1:9/generic/2010-04-15/create_event.json"
        );
    }
}
