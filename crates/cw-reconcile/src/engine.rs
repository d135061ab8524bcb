use crate::{
    ChannelKey, ChannelStatus, DisappearancePolicy, FirstSightPolicy, ObservedChannels,
    ReconcileOutcome, ReconcilePolicy, Snapshot, StatusValue, TransitionEvent,
};

fn first_sight_event(st: &ChannelStatus, policy: FirstSightPolicy) -> Option<TransitionEvent> {
    match policy {
        FirstSightPolicy::Baseline => None,
        // A healthy first sighting would resolve a key we never triggered.
        FirstSightPolicy::AlertIfUnhealthy if !st.status.is_healthy() => Some(TransitionEvent {
            device_address: st.device_address.clone(),
            channel_id: st.channel_id.clone(),
            previous: None,
            current: st.status,
            channel: st.clone(),
            disappeared: false,
        }),
        FirstSightPolicy::AlertIfUnhealthy => None,
    }
}

/// A channel that is no longer reported keeps the identity it was last
/// seen with, so its incident key matches the one used while it was
/// reported. Without a sighting the identity is rebuilt from the id:
/// `"{name}|{kind}"` ids carry both parts, anything else is its own name.
fn disappeared_identity(
    device_address: &str,
    channel_id: &str,
    last_seen: &ObservedChannels,
) -> ChannelStatus {
    let mut ch = match last_seen.get(&ChannelKey::new(device_address, channel_id)) {
        Some(seen) => seen.clone(),
        None => match channel_id.split_once('|') {
            Some((name, kind)) => {
                ChannelStatus::new(device_address, channel_id, name, StatusValue::Unreachable)
                    .with_kind(kind)
            }
            None => {
                ChannelStatus::new(device_address, channel_id, channel_id, StatusValue::Unreachable)
            }
        },
    };
    ch.status = StatusValue::Unreachable;
    ch
}

fn disappeared_event(
    device_address: &str,
    channel_id: &str,
    previous: StatusValue,
    last_seen: &ObservedChannels,
) -> TransitionEvent {
    TransitionEvent {
        device_address: device_address.to_string(),
        channel_id: channel_id.to_string(),
        previous: Some(previous),
        current: StatusValue::Unreachable,
        channel: disappeared_identity(device_address, channel_id, last_seen),
        disappeared: true,
    }
}

/// Deterministic reconciliation of one family:
/// - the current observation becomes the next baseline
/// - a status that differs from the previous one => event
/// - first sighting => baseline only (unless the policy alerts on unhealthy)
/// - missing from current => dropped (unless the policy marks it unreachable)
///
/// Events come back sorted by `(device_address, channel_id)`.
pub fn diff(
    previous: &Snapshot,
    current: &ObservedChannels,
    policy: &ReconcilePolicy,
) -> ReconcileOutcome {
    diff_with_last_seen(previous, current, &ObservedChannels::new(), policy)
}

/// [`diff`], naming disappeared channels after their entry in `last_seen`
/// (the most recent observation of each channel, from earlier cycles).
pub fn diff_with_last_seen(
    previous: &Snapshot,
    current: &ObservedChannels,
    last_seen: &ObservedChannels,
    policy: &ReconcilePolicy,
) -> ReconcileOutcome {
    let mut next = current.snapshot();
    let mut events = Vec::new();

    for st in current.iter() {
        match previous.get(&st.device_address, &st.channel_id) {
            None => events.extend(first_sight_event(st, policy.first_sight)),
            Some(prev) if prev != st.status => events.push(TransitionEvent {
                device_address: st.device_address.clone(),
                channel_id: st.channel_id.clone(),
                previous: Some(prev),
                current: st.status,
                channel: st.clone(),
                disappeared: false,
            }),
            Some(_) => {}
        }
    }

    if policy.on_disappear == DisappearancePolicy::MarkUnreachable {
        for (dev, ch, prev) in previous.iter() {
            if next.contains(dev, ch) {
                continue;
            }
            next.insert(dev, ch, StatusValue::Unreachable);
            if prev != StatusValue::Unreachable {
                events.push(disappeared_event(dev, ch, prev, last_seen));
            }
        }
    }

    // Both passes walk sorted maps; the merge needs one stable sort.
    events.sort_by(|a, b| {
        (a.device_address.as_str(), a.channel_id.as_str())
            .cmp(&(b.device_address.as_str(), b.channel_id.as_str()))
    });

    ReconcileOutcome { events, next }
}

/// [`diff`] over two plain snapshots. Channel names are unknown here, so each
/// event's channel carries its id as the name.
pub fn diff_snapshots(
    previous: &Snapshot,
    current: &Snapshot,
    policy: &ReconcilePolicy,
) -> ReconcileOutcome {
    let observed: ObservedChannels = current
        .iter()
        .map(|(dev, ch, st)| ChannelStatus::new(dev, ch, ch, st))
        .collect();
    diff(previous, &observed, policy)
}
