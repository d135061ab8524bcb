use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Status values
// ---------------------------------------------------------------------------

/// Operational state of a channel as reported by a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusValue {
    Running,
    Started,
    Starting,
    Idle,
    Pending,
    Error,
    Unreachable,
    Stopping,
    Suspended,
    Unknown,
    Preprocessing,
    Postprocessing,
    Active,
    Complete,
}

/// Trigger/resolve classification of a [`StatusValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy,
}

impl StatusValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusValue::Running => "running",
            StatusValue::Started => "started",
            StatusValue::Starting => "starting",
            StatusValue::Idle => "idle",
            StatusValue::Pending => "pending",
            StatusValue::Error => "error",
            StatusValue::Unreachable => "unreachable",
            StatusValue::Stopping => "stopping",
            StatusValue::Suspended => "suspended",
            StatusValue::Unknown => "unknown",
            StatusValue::Preprocessing => "preprocessing",
            StatusValue::Postprocessing => "postprocessing",
            StatusValue::Active => "active",
            StatusValue::Complete => "complete",
        }
    }

    /// Case-insensitive parse. Anything unrecognised maps to `Unknown`;
    /// devices occasionally report states outside the documented set.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => StatusValue::Running,
            "started" => StatusValue::Started,
            "starting" => StatusValue::Starting,
            "idle" => StatusValue::Idle,
            "pending" => StatusValue::Pending,
            "error" => StatusValue::Error,
            "unreachable" => StatusValue::Unreachable,
            "stopping" => StatusValue::Stopping,
            "suspended" => StatusValue::Suspended,
            "preprocessing" => StatusValue::Preprocessing,
            "postprocessing" => StatusValue::Postprocessing,
            "active" => StatusValue::Active,
            "complete" => StatusValue::Complete,
            _ => StatusValue::Unknown,
        }
    }

    /// `running` / `started` are the only healthy states.
    pub fn health(&self) -> Health {
        match self {
            StatusValue::Running | StatusValue::Started => Health::Healthy,
            _ => Health::Unhealthy,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.health() == Health::Healthy
    }
}

impl std::fmt::Display for StatusValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StatusValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(StatusValue::parse(&raw))
    }
}

// ---------------------------------------------------------------------------
// Channel status (one observation)
// ---------------------------------------------------------------------------

/// Normalized status of one channel on one device, as fetched this cycle.
///
/// `details` feeds alert detail text only; it never takes part in comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelStatus {
    pub channel_id: String,
    pub device_address: String,
    pub name: String,
    pub status: StatusValue,
    /// Output type, for families whose incidents are keyed per output type.
    pub kind: Option<String>,
    /// Node that reported the channel, when the device names one.
    pub node: Option<String>,
    pub details: BTreeMap<String, String>,
}

impl ChannelStatus {
    pub fn new(
        device_address: impl Into<String>,
        channel_id: impl Into<String>,
        name: impl Into<String>,
        status: StatusValue,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            device_address: device_address.into(),
            name: name.into(),
            status,
            kind: None,
            node: None,
            details: BTreeMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn with_detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(label.into(), value.into());
        self
    }

    pub fn key(&self) -> ChannelKey {
        ChannelKey::new(&self.device_address, &self.channel_id)
    }
}

/// `(device_address, channel_id)`. Channel ids are only unique per device.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelKey {
    pub device_address: String,
    pub channel_id: String,
}

impl ChannelKey {
    pub fn new(device_address: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            device_address: device_address.into(),
            channel_id: channel_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot (what was last observed)
// ---------------------------------------------------------------------------

/// Last-known status per channel for one device family.
///
/// Serialized exactly as the persisted layout: a JSON object of
/// `device_address -> { channel_id -> status }`. Nested ordered maps make
/// `(device_address, channel_id)` unique and iteration deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    devices: BTreeMap<String, BTreeMap<String, StatusValue>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the previous status if the key was already present.
    pub fn insert(
        &mut self,
        device_address: impl Into<String>,
        channel_id: impl Into<String>,
        status: StatusValue,
    ) -> Option<StatusValue> {
        self.devices
            .entry(device_address.into())
            .or_default()
            .insert(channel_id.into(), status)
    }

    pub fn get(&self, device_address: &str, channel_id: &str) -> Option<StatusValue> {
        self.devices.get(device_address)?.get(channel_id).copied()
    }

    pub fn contains(&self, device_address: &str, channel_id: &str) -> bool {
        self.get(device_address, channel_id).is_some()
    }

    /// Number of channel entries across all devices.
    pub fn len(&self) -> usize {
        self.devices.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn device(&self, device_address: &str) -> Option<&BTreeMap<String, StatusValue>> {
        self.devices.get(device_address)
    }

    /// All entries in `(device_address, channel_id)` order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, StatusValue)> {
        self.devices.iter().flat_map(|(dev, chans)| {
            chans
                .iter()
                .map(move |(ch, st)| (dev.as_str(), ch.as_str(), *st))
        })
    }

    /// Drop every entry of one device.
    pub fn remove_device(&mut self, device_address: &str) -> Option<BTreeMap<String, StatusValue>> {
        self.devices.remove(device_address)
    }

    /// Copy every entry of `device_address` from `other`, replacing whatever
    /// this snapshot held for that device.
    pub fn carry_device_from(&mut self, other: &Snapshot, device_address: &str) {
        match other.devices.get(device_address) {
            Some(chans) => {
                self.devices
                    .insert(device_address.to_string(), chans.clone());
            }
            None => {
                self.devices.remove(device_address);
            }
        }
    }
}

impl FromIterator<(String, String, StatusValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, String, StatusValue)>>(iter: I) -> Self {
        let mut snap = Snapshot::empty();
        for (dev, ch, st) in iter {
            snap.insert(dev, ch, st);
        }
        snap
    }
}

// ---------------------------------------------------------------------------
// Observed channels (what was just fetched)
// ---------------------------------------------------------------------------

/// The current cycle's full observation, keyed by [`ChannelKey`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObservedChannels {
    channels: BTreeMap<ChannelKey, ChannelStatus>,
}

impl ObservedChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins for a repeated key; the replaced value is returned.
    pub fn insert(&mut self, status: ChannelStatus) -> Option<ChannelStatus> {
        self.channels.insert(status.key(), status)
    }

    pub fn get(&self, key: &ChannelKey) -> Option<&ChannelStatus> {
        self.channels.get(key)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelStatus> {
        self.channels.values()
    }

    /// Keep only the channels for which `keep` holds.
    pub fn retain(&mut self, mut keep: impl FnMut(&ChannelStatus) -> bool) {
        self.channels.retain(|_, st| keep(st));
    }

    /// Project to the comparable/persistable form.
    pub fn snapshot(&self) -> Snapshot {
        let mut snap = Snapshot::empty();
        for st in self.channels.values() {
            snap.insert(st.device_address.clone(), st.channel_id.clone(), st.status);
        }
        snap
    }
}

impl FromIterator<ChannelStatus> for ObservedChannels {
    fn from_iter<I: IntoIterator<Item = ChannelStatus>>(iter: I) -> Self {
        let mut obs = ObservedChannels::new();
        for st in iter {
            obs.insert(st);
        }
        obs
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// What to do with a channel seen for the first time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstSightPolicy {
    /// Record the status, never alert.
    #[default]
    Baseline,
    /// Record the status and alert if it is already unhealthy.
    AlertIfUnhealthy,
}

/// What to do with a channel that was in the previous snapshot but is no
/// longer reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisappearancePolicy {
    /// Forget the channel. No event.
    #[default]
    Drop,
    /// Keep it as `unreachable` and emit one event when it first goes missing.
    MarkUnreachable,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    #[serde(default)]
    pub first_sight: FirstSightPolicy,
    #[serde(default)]
    pub on_disappear: DisappearancePolicy,
}

// ---------------------------------------------------------------------------
// Transition events
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransitionKind {
    BecameHealthy,
    BecameUnhealthy,
    FirstSeenUnhealthy,
    Disappeared,
}

/// A status change worth telling the alerting service about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionEvent {
    pub device_address: String,
    pub channel_id: String,
    pub previous: Option<StatusValue>,
    pub current: StatusValue,
    pub channel: ChannelStatus,
    pub disappeared: bool,
}

impl TransitionEvent {
    pub fn kind(&self) -> TransitionKind {
        if self.disappeared {
            TransitionKind::Disappeared
        } else if self.previous.is_none() {
            TransitionKind::FirstSeenUnhealthy
        } else if self.current.is_healthy() {
            TransitionKind::BecameHealthy
        } else {
            TransitionKind::BecameUnhealthy
        }
    }

    pub fn key(&self) -> ChannelKey {
        ChannelKey::new(&self.device_address, &self.channel_id)
    }
}

/// Result of one [`crate::diff`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Ordered by `(device_address, channel_id)`.
    pub events: Vec<TransitionEvent>,
    /// The snapshot to persist once the cycle succeeds.
    pub next: Snapshot,
}

impl ReconcileOutcome {
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty()
    }
}
