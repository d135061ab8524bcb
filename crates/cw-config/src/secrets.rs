//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"CW_PAGERDUTY_SERVICE_KEY"`).
//! - At startup, callers invoke [`resolve_secrets`] once and pass the result
//!   into constructors; nothing else reads the environment for secrets.
//! - `Debug` redacts values.
//! - Error messages name the env var, never its value.
//!
//! The PagerDuty integration (service) key is required. The REST API token
//! is optional and only adds an `Authorization` header.

use anyhow::{bail, Result};

use crate::MonitorConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub pagerduty_service_key: String,
    /// `None` if the named env var was absent or blank.
    pub pagerduty_api_key: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("pagerduty_service_key", &"<REDACTED>")
            .field(
                "pagerduty_api_key",
                &self.pagerduty_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Unset or blank counts as missing.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

pub fn resolve_secrets(cfg: &MonitorConfig) -> Result<ResolvedSecrets> {
    let names = &cfg.alerting.keys_env;

    let Some(pagerduty_service_key) = resolve_env(&names.service_key) else {
        bail!(
            "SECRETS_MISSING: required env var '{}' (pagerduty service_key) is not set or empty",
            names.service_key,
        );
    };

    Ok(ResolvedSecrets {
        pagerduty_service_key,
        pagerduty_api_key: resolve_env(&names.api_key),
    })
}
