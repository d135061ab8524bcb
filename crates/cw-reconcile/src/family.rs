use serde::{Deserialize, Serialize};

/// A class of appliances sharing one status-reporting protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFamily {
    ElementalConductor,
    ElementalLive,
    ElementalDelta,
    EnvivioHalo,
}

/// How incident keys and descriptions are worded for a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingScheme {
    /// `"{name} state change"`; one incident per channel name.
    ChannelName,
    /// `"{name}({kind}) state change on {address}"`; one incident per output
    /// type of a service on one device.
    OutputOnDevice,
}

impl DeviceFamily {
    pub const ALL: [DeviceFamily; 4] = [
        DeviceFamily::ElementalConductor,
        DeviceFamily::ElementalLive,
        DeviceFamily::ElementalDelta,
        DeviceFamily::EnvivioHalo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceFamily::ElementalConductor => "elemental_conductor",
            DeviceFamily::ElementalLive => "elemental_live",
            DeviceFamily::ElementalDelta => "elemental_delta",
            DeviceFamily::EnvivioHalo => "envivio_halo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let norm = s.trim().to_ascii_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        Self::ALL.into_iter().find(|f| f.as_str() == norm)
    }

    /// File name of the persisted snapshot for this family.
    pub fn state_file_name(&self) -> &'static str {
        match self {
            DeviceFamily::ElementalConductor => "conductor.json",
            DeviceFamily::ElementalLive => "live.json",
            DeviceFamily::ElementalDelta => "delta.json",
            DeviceFamily::EnvivioHalo => "envivio.json",
        }
    }

    pub fn naming(&self) -> NamingScheme {
        match self {
            DeviceFamily::EnvivioHalo => NamingScheme::OutputOnDevice,
            _ => NamingScheme::ChannelName,
        }
    }

    /// Port the management API listens on, if not the scheme default.
    pub fn api_port(&self) -> Option<u16> {
        match self {
            DeviceFamily::ElementalDelta | DeviceFamily::EnvivioHalo => Some(8080),
            DeviceFamily::ElementalConductor | DeviceFamily::ElementalLive => None,
        }
    }

    /// Administrative URL attached to triggered incidents.
    pub fn management_url(&self, address: &str) -> String {
        match self {
            DeviceFamily::EnvivioHalo => format!("http://{address}:8080"),
            _ => format!("http://{address}"),
        }
    }
}

impl std::fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_loose_spellings() {
        assert_eq!(
            DeviceFamily::parse("Elemental-Conductor"),
            Some(DeviceFamily::ElementalConductor)
        );
        assert_eq!(
            DeviceFamily::parse("envivio halo"),
            Some(DeviceFamily::EnvivioHalo)
        );
        assert_eq!(DeviceFamily::parse("mediaexcel"), None);
    }

    #[test]
    fn state_files_are_distinct() {
        let mut names: Vec<_> = DeviceFamily::ALL
            .iter()
            .map(|f| f.state_file_name())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), DeviceFamily::ALL.len());
    }

    #[test]
    fn envivio_urls_carry_the_api_port() {
        assert_eq!(
            DeviceFamily::EnvivioHalo.management_url("10.16.27.41"),
            "http://10.16.27.41:8080"
        );
        assert_eq!(
            DeviceFamily::ElementalLive.management_url("10.16.27.21"),
            "http://10.16.27.21"
        );
    }
}
