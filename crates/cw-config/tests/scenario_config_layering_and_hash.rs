//! Scenario: layered YAML merge and config hash stability.
//!
//! # Invariants under test
//! - Later layers override earlier ones leaf by leaf
//! - Key order inside a document never changes the hash
//! - Different effective values produce different hashes
//! - The typed view picks up families, devices and policy

use cw_config::{load_layered_yaml, load_layered_yaml_from_strings};
use cw_reconcile::{DeviceFamily, DisappearancePolicy, FirstSightPolicy};

const BASE_YAML: &str = r#"
cycle:
  interval_secs: 60
state:
  dir: /var/lib/chanwatch
alerting:
  timeout_ms: 10000
families:
  elemental_live:
    devices:
      - address: 10.16.27.21
        channels: ["21", "22"]
  envivio_halo:
    timeout_ms: 8000
    devices:
      - address: 10.16.27.41
        channels: ["CNN"]
"#;

const BASE_YAML_REORDERED: &str = r#"
families:
  envivio_halo:
    devices:
      - channels: ["CNN"]
        address: 10.16.27.41
    timeout_ms: 8000
  elemental_live:
    devices:
      - channels: ["21", "22"]
        address: 10.16.27.21
alerting:
  timeout_ms: 10000
state:
  dir: /var/lib/chanwatch
cycle:
  interval_secs: 60
"#;

const OVERLAY_YAML: &str = r#"
cycle:
  interval_secs: 30
reconcile:
  first_sight: alert_if_unhealthy
  on_disappear: mark_unreachable
families:
  envivio_halo:
    enabled: false
"#;

#[test]
fn scenario_hash_is_stable_across_key_order() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    let again = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.config_hash, again.config_hash);
    assert_eq!(a.config_hash.len(), 64);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn scenario_overlay_changes_values_and_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_ne!(base.config_hash, merged.config_hash);

    let cfg = merged.monitor().unwrap();
    assert_eq!(cfg.cycle.interval_secs, 30);
    assert_eq!(cfg.reconcile.first_sight, FirstSightPolicy::AlertIfUnhealthy);
    assert_eq!(cfg.reconcile.on_disappear, DisappearancePolicy::MarkUnreachable);

    // The overlay only flipped `enabled`; the base devices survive the merge.
    let envivio = &cfg.families[&DeviceFamily::EnvivioHalo];
    assert!(!envivio.enabled);
    assert_eq!(envivio.devices.len(), 1);
    assert_eq!(envivio.timeout_ms, 8000);

    let enabled: Vec<_> = cfg.enabled_families().map(|(f, _)| f).collect();
    assert_eq!(enabled, vec![DeviceFamily::ElementalLive]);
}

#[test]
fn scenario_defaults_fill_missing_sections() {
    let loaded = load_layered_yaml_from_strings(&["", "families: {}"]).unwrap();
    let cfg = loaded.monitor().unwrap();

    assert_eq!(cfg.cycle.interval_secs, 60);
    assert_eq!(cfg.logging.level, "info");
    assert_eq!(cfg.alerting.events_base_url, "https://events.pagerduty.com");
    assert_eq!(cfg.alerting.keys_env.service_key, "CW_PAGERDUTY_SERVICE_KEY");
    assert_eq!(cfg.reconcile.first_sight, FirstSightPolicy::Baseline);
    assert_eq!(cfg.reconcile.on_disappear, DisappearancePolicy::Drop);
    assert!(cfg.families.is_empty());
}

#[test]
fn scenario_invalid_values_are_rejected() {
    let zero_interval = load_layered_yaml_from_strings(&["cycle: {interval_secs: 0}"]).unwrap();
    let err = zero_interval.monitor().unwrap_err().to_string();
    assert!(err.contains("interval_secs"), "{err}");

    let dup = r#"
families:
  elemental_conductor:
    devices:
      - address: 10.16.27.20
      - address: 10.16.27.20
"#;
    let err = load_layered_yaml_from_strings(&[dup])
        .unwrap()
        .monitor()
        .unwrap_err()
        .to_string();
    assert!(err.contains("twice"), "{err}");

    let unknown_family = "families: {mediaexcel: {devices: []}}";
    assert!(load_layered_yaml_from_strings(&[unknown_family])
        .unwrap()
        .monitor()
        .is_err());
}

#[test]
fn scenario_layers_load_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let site = dir.path().join("site.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&site, OVERLAY_YAML).unwrap();

    let from_files = load_layered_yaml(&[&base, &site]).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);

    let missing = dir.path().join("nope.yaml");
    let err = load_layered_yaml(&[&missing]).unwrap_err().to_string();
    assert!(err.contains("nope.yaml"), "{err}");
}
