//! cw-config
//!
//! Layered YAML configuration for the monitor.
//!
//! - Documents are merged in order (later overrides earlier) into one JSON tree
//! - The canonical JSON of the merged tree is hashed so every run can log
//!   exactly which configuration it ran under
//! - Secrets never appear as literals; the tree stores env var NAMES only
//!   (see [`secrets`])

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

mod consumption;
mod monitor;
pub mod secrets;

pub use consumption::{report_unused_keys, UnusedKeyPolicy, UnusedKeyReport, SECTIONS};
pub use monitor::{
    AlertingConfig, CycleConfig, DeviceConfig, FamilyConfig, KeysEnv, LoggingConfig,
    MonitorConfig, StateConfig,
};
pub use secrets::{resolve_secrets, ResolvedSecrets};

/// Leaf string values starting with one of these abort the load with
/// CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
    "u+",         // PagerDuty REST API token
];

/// PagerDuty integration keys are 32 lowercase hex chars.
const SERVICE_KEY_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Deserialize the merged tree into the typed view.
    pub fn monitor(&self) -> Result<MonitorConfig> {
        MonitorConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let p = p.as_ref();
        let raw = fs::read_to_string(p)
            .with_context(|| format!("failed to read yaml path: {}", p.display()))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Earlier docs are base, later docs override.
    let mut merged = Value::Object(serde_json::Map::new());
    for raw in yaml_docs {
        // An empty layer parses as YAML null; it contributes nothing.
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        overlay(&mut merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Apply one layer onto the merged tree in place. Maps merge key by key;
/// anything else in the layer (lists included) replaces what was there.
fn overlay(base: &mut Value, layer: Value) {
    match layer {
        Value::Object(fields) if base.is_object() => {
            if let Value::Object(into) = base {
                for (key, value) in fields {
                    overlay(into.entry(key).or_insert(Value::Null), value);
                }
            }
        }
        other => *base = other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(&sorted_keys(v)).context("canonical json serialize failed")
}

/// Rebuild objects with keys inserted in sorted order, so the canonical form
/// does not depend on layer order even if `preserve_order` is enabled.
fn sorted_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), sorted_keys(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sorted_keys).collect()),
        other => other.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let leaked = consumption::leaves(v)
        .into_iter()
        .find(|leaf| leaf.value.as_str().is_some_and(looks_like_secret));
    match leaked {
        Some(leaf) => bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", leaf.pointer),
        None => Ok(()),
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    if SECRET_PREFIXES.iter().any(|p| t.starts_with(p)) {
        return true;
    }
    // A bare integration key pasted where an env var name belongs.
    t.len() == SERVICE_KEY_LEN && t.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_overrides_leaves_and_keeps_siblings() {
        let mut m = serde_json::json!({"state": {"dir": "/var/a", "keep": 1}, "x": [1, 2], "s": 1});
        overlay(
            &mut m,
            serde_json::json!({"state": {"dir": "/var/b"}, "x": [3], "s": {"now": "map"}}),
        );
        assert_eq!(
            m,
            serde_json::json!({"state": {"dir": "/var/b", "keep": 1}, "x": [3], "s": {"now": "map"}})
        );
    }

    #[test]
    fn raw_integration_key_is_a_secret() {
        assert!(looks_like_secret("88fd1c835c374369b81ff95b9e4c07de"));
        assert!(!looks_like_secret("CW_PAGERDUTY_SERVICE_KEY"));
        assert!(!looks_like_secret("10.16.27.20"));
    }
}
