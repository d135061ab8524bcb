use std::time::Duration;

use async_trait::async_trait;
use cw_reconcile::{ChannelStatus, DeviceFamily};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::wire::{
    from_xml, normalize_channel, normalize_envivio_output, normalize_live_event, service_outputs,
    services_by_title, RawChannel, RawLiveEvent, RawOutputStatus, RawService, RawServices,
};
use crate::{ChannelStatusSource, FetchError, FetchOutcome};

/// Media type each family's API expects on requests. Every family answers
/// in XML.
fn vendor_content_type(family: DeviceFamily) -> &'static str {
    match family {
        DeviceFamily::ElementalConductor => "application/vnd.elemental+xml;version=3.0.3",
        DeviceFamily::ElementalDelta => "application/vnd.elemental+xml;version=1.6.1.34713",
        DeviceFamily::ElementalLive => "application/vnd.elemental+xml;version=2.8.1",
        DeviceFamily::EnvivioHalo => "application/xml",
    }
}

/// One device and the channels to watch on it.
///
/// `channels` holds channel/event/content ids, or service titles for
/// Envivio devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub address: String,
    pub channels: Vec<String>,
}

impl DeviceTarget {
    pub fn new(address: impl Into<String>, channels: Vec<String>) -> Self {
        Self {
            address: address.into(),
            channels,
        }
    }
}

/// Polls every configured device of one family over the management API.
///
/// Devices are polled one after another. A device fails as a whole when any
/// of its requests fails; other devices are unaffected.
#[derive(Debug, Clone)]
pub struct HttpChannelSource {
    family: DeviceFamily,
    targets: Vec<DeviceTarget>,
    http: reqwest::Client,
}

impl HttpChannelSource {
    pub fn new(
        family: DeviceFamily,
        targets: Vec<DeviceTarget>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            family,
            targets,
            http,
        })
    }

    pub fn targets(&self) -> &[DeviceTarget] {
        &self.targets
    }

    /// `http://{address}`, plus the family's API port unless the address
    /// already names one.
    fn base_url(&self, address: &str) -> String {
        match self.family.api_port() {
            Some(port) if !address.contains(':') => format!("http://{address}:{port}"),
            _ => format!("http://{address}"),
        }
    }

    fn join(&self, address: &str, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        let base = self.base_url(address);
        if href.starts_with('/') {
            format!("{base}{href}")
        } else {
            format!("{base}/{href}")
        }
    }

    async fn get_xml<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .header(ACCEPT, "application/xml")
            .header(CONTENT_TYPE, vendor_content_type(self.family))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        from_xml(&body, url)
    }

    async fn fetch_device(&self, target: &DeviceTarget) -> Result<Vec<ChannelStatus>, FetchError> {
        match self.family {
            DeviceFamily::ElementalConductor => self.fetch_channels(target, "channels", true).await,
            DeviceFamily::ElementalDelta => self.fetch_channels(target, "contents", false).await,
            DeviceFamily::ElementalLive => self.fetch_live_events(target).await,
            DeviceFamily::EnvivioHalo => self.fetch_envivio(target).await,
        }
    }

    async fn fetch_channels(
        &self,
        target: &DeviceTarget,
        collection: &str,
        metacounts: bool,
    ) -> Result<Vec<ChannelStatus>, FetchError> {
        let query: &[(&str, &str)] = if metacounts {
            &[("metacounts", "true")]
        } else {
            &[]
        };
        let mut out = Vec::with_capacity(target.channels.len());
        for id in &target.channels {
            let url = format!("{}/{collection}/{id}", self.base_url(&target.address));
            let doc: RawChannel = self.get_xml(&url, query).await?;
            out.push(normalize_channel(&target.address, id, doc)?);
        }
        Ok(out)
    }

    async fn fetch_live_events(&self, target: &DeviceTarget) -> Result<Vec<ChannelStatus>, FetchError> {
        let mut out = Vec::with_capacity(target.channels.len());
        for id in &target.channels {
            let url = format!("{}/api/live_events/{id}", self.base_url(&target.address));
            let doc: RawLiveEvent = self.get_xml(&url, &[]).await?;
            out.push(normalize_live_event(&target.address, id, doc)?);
        }
        Ok(out)
    }

    async fn fetch_envivio(&self, target: &DeviceTarget) -> Result<Vec<ChannelStatus>, FetchError> {
        let url = format!("{}/api/services", self.base_url(&target.address));
        let listing: RawServices = self.get_xml(&url, &[]).await?;
        let services = services_by_title(listing);

        let mut out = Vec::new();
        for title in &target.channels {
            let Some(href) = services.get(title) else {
                warn!(address = %target.address, service = %title, "service not listed by device");
                continue;
            };
            let service: RawService = self.get_xml(&self.join(&target.address, href), &[]).await?;
            for output in service_outputs(service) {
                let status_url = self.join(&target.address, &format!("{}status", output.href));
                let status: RawOutputStatus = self.get_xml(&status_url, &[]).await?;
                out.push(normalize_envivio_output(&target.address, title, &output, status));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ChannelStatusSource for HttpChannelSource {
    fn family(&self) -> DeviceFamily {
        self.family
    }

    async fn fetch(&self) -> Result<FetchOutcome, FetchError> {
        let mut outcome = FetchOutcome::new();
        for target in &self.targets {
            let res = self.fetch_device(target).await;
            match &res {
                Ok(chans) => debug!(family = %self.family, address = %target.address, channels = chans.len(), "device fetched"),
                Err(e) => warn!(family = %self.family, address = %target.address, error = %e, "device fetch failed"),
            }
            outcome.insert(target.address.clone(), res);
        }
        Ok(outcome)
    }
}
