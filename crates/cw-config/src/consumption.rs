//! Unused-key guard.
//!
//! The monitor reads a fixed set of top-level sections. Every leaf of the
//! merged tree outside them is unused, most often a typo such as
//! `famlies:` that would otherwise be ignored silently. Leaves are named by
//! JSON Pointer, e.g. `/famlies/elemental_live/enabled`.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every top-level section [`crate::MonitorConfig`] reads.
pub const SECTIONS: &[&str] = &["cycle", "logging", "state", "alerting", "reconcile", "families"];

/// Unused leaves listed in a `Fail` error.
const ERROR_PREVIEW: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Sections the check accepted (see [`SECTIONS`]).
    pub known_sections: Vec<String>,
    /// Unused leaf pointers, sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// A scalar of the merged tree and its JSON Pointer. Empty maps and lists
/// have no leaves.
pub(crate) struct Leaf<'a> {
    pub pointer: String,
    pub value: &'a Value,
}

/// All leaves of `root`, sorted by pointer.
pub(crate) fn leaves(root: &Value) -> Vec<Leaf<'_>> {
    let mut out = Vec::new();
    let mut pending = vec![(String::new(), root)];
    while let Some((pointer, value)) = pending.pop() {
        match value {
            Value::Object(map) => pending.extend(
                map.iter()
                    .map(|(k, v)| (format!("{pointer}/{}", k.replace('~', "~0").replace('/', "~1")), v)),
            ),
            Value::Array(items) => pending.extend(
                items.iter().enumerate().map(|(i, v)| (format!("{pointer}/{i}"), v)),
            ),
            _ if pointer.is_empty() => out.push(Leaf { pointer: "/".to_string(), value }),
            _ => out.push(Leaf { pointer, value }),
        }
    }
    out.sort_by(|a, b| a.pointer.cmp(&b.pointer));
    out
}

/// Top-level key a leaf pointer lives under ("" for a scalar root).
fn section_of(pointer: &str) -> &str {
    pointer
        .strip_prefix('/')
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("")
}

/// `Fail` errors when unused keys exist; `Warn` always returns the report.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let unused: Vec<String> = leaves(config_json)
        .into_iter()
        .filter(|leaf| {
            let section = section_of(&leaf.pointer);
            !SECTIONS.iter().any(|known| *known == section)
        })
        .map(|leaf| leaf.pointer)
        .collect();

    if policy == UnusedKeyPolicy::Fail && !unused.is_empty() {
        let preview: Vec<&str> = unused.iter().take(ERROR_PREVIEW).map(String::as_str).collect();
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
            Remove them or fix their spelling. First few: {}",
            unused.len(),
            preview.join(", ")
        );
    }

    Ok(UnusedKeyReport {
        known_sections: SECTIONS.iter().map(|s| s.to_string()).collect(),
        unused_leaf_pointers: unused,
    })
}
