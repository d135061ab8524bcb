//! Wire shapes: deserialize device API payloads and normalize them to
//! [`ChannelStatus`].
//!
//! Every management API answers in XML. Each document is decoded from its
//! root element, so `RawChannel` is the content of `<channel>`,
//! `RawServices` the content of `<services>`, and so on. Attributes are
//! `@name` fields, element text under attributes is `$text`, and repeated
//! elements collect into `Vec`s (a single occurrence is a one-element list).
//!
//! Pure conversion. No IO.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use cw_reconcile::{ChannelStatus, StatusValue};

use crate::FetchError;

/// Decode one XML document. `what` names the payload in the error.
pub fn from_xml<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, FetchError> {
    quick_xml::de::from_str(body).map_err(|e| FetchError::Malformed(format!("{what}: {e}")))
}

/// Element text, whatever attributes the element carries
/// (`<id type="integer">5</id>`, `<value/>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawText {
    #[serde(rename = "$text", default)]
    pub text: String,
}

impl RawText {
    fn into_trimmed(self) -> String {
        self.text.trim().to_string()
    }
}

fn non_empty(v: Option<RawText>) -> Option<String> {
    v.map(RawText::into_trimmed).filter(|s| !s.is_empty())
}

fn require_name(name: String, what: &str, id: &str) -> Result<String, FetchError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FetchError::Malformed(format!("{what} '{id}' has no name")));
    }
    Ok(name.to_string())
}

// ---------------------------------------------------------------------------
// Channel documents (Conductor `/channels/{id}`, Delta `/contents/{id}`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RawChannel {
    #[serde(default)]
    pub id: Option<RawText>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub channel_params: Option<RawChannelParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawChannelParams {
    #[serde(default)]
    pub channel_param: Vec<RawChannelParam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawChannelParam {
    pub name: String,
    #[serde(default)]
    pub value: RawText,
}

/// `requested_id` is used when the document does not echo its own id.
pub fn normalize_channel(
    address: &str,
    requested_id: &str,
    ch: RawChannel,
) -> Result<ChannelStatus, FetchError> {
    let id = non_empty(ch.id).unwrap_or_else(|| requested_id.to_string());
    let name = require_name(ch.name, "channel", &id)?;

    let mut out = ChannelStatus::new(address, id, name, StatusValue::parse(&ch.status));
    for p in ch.channel_params.map(|p| p.channel_param).unwrap_or_default() {
        out.details.insert(p.name, p.value.into_trimmed());
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Live events (Live `/api/live_events/{id}`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RawLiveEvent {
    #[serde(default)]
    pub id: Option<RawText>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub node: Option<RawText>,
    #[serde(default)]
    pub input: Vec<RawLiveInput>,
    #[serde(default)]
    pub output_group: Vec<RawOutputGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLiveInput {
    #[serde(default)]
    pub id: Option<RawText>,
    #[serde(default)]
    pub network_input: Option<RawNetworkInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNetworkInput {
    #[serde(default)]
    pub uri: Option<RawText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOutputGroup {
    #[serde(default)]
    pub output: Vec<RawLiveOutput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLiveOutput {
    #[serde(default)]
    pub id: Option<RawText>,
    #[serde(default)]
    pub full_uri: Option<RawText>,
}

/// Details: `"Input: {id}" -> uri` and `"Output: {id}" -> full_uri`.
pub fn normalize_live_event(
    address: &str,
    requested_id: &str,
    ev: RawLiveEvent,
) -> Result<ChannelStatus, FetchError> {
    let id = non_empty(ev.id).unwrap_or_else(|| requested_id.to_string());
    let name = require_name(ev.name, "live event", &id)?;

    let mut out = ChannelStatus::new(address, id, name, StatusValue::parse(&ev.status));
    out.node = non_empty(ev.node);

    for input in ev.input {
        let Some(input_id) = non_empty(input.id) else {
            continue;
        };
        let uri = input
            .network_input
            .and_then(|n| non_empty(n.uri))
            .unwrap_or_default();
        out.details.insert(format!("Input: {input_id}"), uri);
    }
    for output in ev.output_group.into_iter().flat_map(|g| g.output) {
        let Some(output_id) = non_empty(output.id) else {
            continue;
        };
        out.details.insert(
            format!("Output: {output_id}"),
            non_empty(output.full_uri).unwrap_or_default(),
        );
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Envivio services / outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RawServices {
    #[serde(default)]
    pub service: Vec<RawServiceRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawServiceRef {
    #[serde(rename = "@title")]
    pub title: String,
    #[serde(rename = "@href")]
    pub href: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawService {
    #[serde(default)]
    pub outputs: Option<RawOutputs>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOutputs {
    #[serde(default)]
    pub output: Vec<RawOutputRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawOutputRef {
    #[serde(rename = "@href")]
    pub href: String,
    #[serde(rename = "@title", default)]
    pub title: String,
    #[serde(rename = "@type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOutputStatus {
    #[serde(default)]
    pub state: String,
}

/// Service title -> service href. First occurrence of a title wins.
pub fn services_by_title(doc: RawServices) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for s in doc.service {
        out.entry(s.title).or_insert(s.href);
    }
    out
}

pub fn service_outputs(doc: RawService) -> Vec<RawOutputRef> {
    doc.outputs.map(|o| o.output).unwrap_or_default()
}

/// One output of a monitored service. The channel id is `"{title}|{type}"`
/// so each output type of a service is tracked separately.
pub fn normalize_envivio_output(
    address: &str,
    service_title: &str,
    output: &RawOutputRef,
    status: RawOutputStatus,
) -> ChannelStatus {
    let mut out = ChannelStatus::new(
        address,
        format!("{service_title}|{}", output.kind),
        service_title,
        StatusValue::parse(&status.state),
    )
    .with_kind(output.kind.clone());
    if !output.title.is_empty() {
        out.details.insert("Output".to_string(), output.title.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conductor_channel_with_attributed_id_and_param_list() {
        let ch: RawChannel = from_xml(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <channel href="/channels/5">
              <id type="integer">5</id>
              <name>SKY21</name>
              <status>Running</status>
              <channel_params>
                <channel_param><name>hls-source</name><value>http://10.16.27.221/out/u/skymx_ch21.m3u8</value></channel_param>
                <channel_param><name>bitrate</name><value type="integer">4500</value></channel_param>
              </channel_params>
            </channel>"#,
            "channel",
        )
        .unwrap();

        let ch = normalize_channel("10.16.27.20", "5", ch).unwrap();

        assert_eq!(ch.channel_id, "5");
        assert_eq!(ch.name, "SKY21");
        assert_eq!(ch.status, StatusValue::Running);
        assert_eq!(
            ch.details["hls-source"],
            "http://10.16.27.221/out/u/skymx_ch21.m3u8"
        );
        assert_eq!(ch.details["bitrate"], "4500");
    }

    #[test]
    fn single_param_with_empty_value_is_accepted() {
        let ch: RawChannel = from_xml(
            "<channel><id>7</id><name>News</name><status>idle</status>\
             <channel_params><channel_param><name>udp-dest1</name><value/></channel_param></channel_params>\
             </channel>",
            "channel",
        )
        .unwrap();

        let ch = normalize_channel("10.0.0.1", "7", ch).unwrap();

        assert_eq!(ch.channel_id, "7");
        assert_eq!(ch.details.len(), 1);
        assert_eq!(ch.details["udp-dest1"], "");
    }

    #[test]
    fn missing_id_falls_back_to_requested_and_missing_name_is_malformed() {
        let ch: RawChannel =
            from_xml("<channel><name>News</name><status>error</status></channel>", "channel").unwrap();
        assert_eq!(normalize_channel("a", "12", ch).unwrap().channel_id, "12");

        let ch: RawChannel =
            from_xml("<channel><id>12</id><status>error</status></channel>", "channel").unwrap();
        assert!(matches!(
            normalize_channel("a", "12", ch),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn live_event_uses_event_id_and_collects_io_details() {
        let ev: RawLiveEvent = from_xml(
            "<live_event href=\"/live_events/21\">\
               <id>21</id><name>SKY21</name><status>running</status><node>enc-04</node>\
               <input><id>44</id><network_input><uri>udp://230.16.28.20:52101</uri></network_input></input>\
               <output_group>\
                 <output><id>1</id><full_uri>http://cdn/out/sky21_hi.m3u8</full_uri></output>\
                 <output><id>2</id><full_uri>http://cdn/out/sky21_lo.m3u8</full_uri></output>\
               </output_group>\
             </live_event>",
            "live event",
        )
        .unwrap();

        let ch = normalize_live_event("10.16.27.21", "21", ev).unwrap();

        // Keyed by the event id, never by the input id.
        assert_eq!(ch.channel_id, "21");
        assert_eq!(ch.node.as_deref(), Some("enc-04"));
        assert_eq!(ch.details["Input: 44"], "udp://230.16.28.20:52101");
        assert_eq!(ch.details["Output: 1"], "http://cdn/out/sky21_hi.m3u8");
        assert_eq!(ch.details["Output: 2"], "http://cdn/out/sky21_lo.m3u8");
    }

    #[test]
    fn envivio_service_listing_and_outputs() {
        let services: RawServices = from_xml(
            "<services>\
               <service title=\"CNN\" href=\"/api/services/1/\"/>\
               <service title=\"BBC\" href=\"/api/services/2/\"/>\
             </services>",
            "services",
        )
        .unwrap();
        let by_title = services_by_title(services);
        assert_eq!(by_title["CNN"], "/api/services/1/");
        assert_eq!(by_title.len(), 2);

        let service: RawService = from_xml(
            "<service><outputs>\
               <output href=\"/api/services/1/outputs/3/\" title=\"CNN HLS\" type=\"HLS\"/>\
             </outputs></service>",
            "service",
        )
        .unwrap();
        let outputs = service_outputs(service);
        assert_eq!(outputs.len(), 1);

        let status: RawOutputStatus =
            from_xml("<output><state>Started</state></output>", "output status").unwrap();
        let ch = normalize_envivio_output("10.16.27.41", "CNN", &outputs[0], status);

        assert_eq!(ch.channel_id, "CNN|HLS");
        assert_eq!(ch.name, "CNN");
        assert_eq!(ch.kind.as_deref(), Some("HLS"));
        assert_eq!(ch.status, StatusValue::Started);
        assert_eq!(ch.details["Output"], "CNN HLS");
    }

    #[test]
    fn service_without_outputs_yields_nothing() {
        let service: RawService = from_xml("<service/>", "service").unwrap();
        assert!(service_outputs(service).is_empty());
    }
}
