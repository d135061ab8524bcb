use async_trait::async_trait;

use crate::{DispatchError, ResolveIncident, TriggerIncident};

/// Acknowledgement of an accepted event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ack {
    pub status: String,
    pub message: String,
    pub incident_key: Option<String>,
}

/// External incident service contract.
///
/// Implementations must be object-safe so the runtime can hold an
/// `Arc<dyn AlertingService>`.
#[async_trait]
pub trait AlertingService: Send + Sync {
    async fn trigger_incident(&self, incident: &TriggerIncident) -> Result<Ack, DispatchError>;

    async fn resolve_incident(&self, incident: &ResolveIncident) -> Result<Ack, DispatchError>;
}
