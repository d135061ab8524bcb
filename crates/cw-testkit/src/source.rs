use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use cw_reconcile::{ChannelStatus, DeviceFamily, StatusValue};
use cw_source::{ChannelStatusSource, FetchError, FetchOutcome};

/// Builds one [`FetchOutcome`].
#[derive(Debug, Default)]
pub struct OutcomeBuilder {
    outcome: FetchOutcome,
}

impl OutcomeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that answered. Each channel is `(id, name, status)`.
    pub fn device(mut self, address: &str, channels: &[(&str, &str, StatusValue)]) -> Self {
        let chans = channels
            .iter()
            .map(|(id, name, st)| ChannelStatus::new(address, *id, *name, *st))
            .collect();
        self.outcome.insert(address.to_string(), Ok(chans));
        self
    }

    /// A device that answered with fully built statuses.
    pub fn device_with(mut self, address: &str, channels: Vec<ChannelStatus>) -> Self {
        self.outcome.insert(address.to_string(), Ok(channels));
        self
    }

    /// A device that did not answer.
    pub fn unreachable(mut self, address: &str) -> Self {
        self.outcome.insert(
            address.to_string(),
            Err(FetchError::Transport(format!("connect {address}: connection refused"))),
        );
        self
    }

    pub fn build(self) -> FetchOutcome {
        self.outcome
    }
}

/// Replays queued fetch results in order. Once the queue is drained the last
/// result is repeated, so a stable world needs only one entry.
pub struct ScriptedSource {
    family: DeviceFamily,
    queue: Mutex<VecDeque<Result<FetchOutcome, FetchError>>>,
    last: Mutex<Option<Result<FetchOutcome, FetchError>>>,
}

impl ScriptedSource {
    pub fn new(family: DeviceFamily) -> Self {
        Self {
            family,
            queue: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
        }
    }

    pub fn push(&self, outcome: FetchOutcome) -> &Self {
        self.queue.lock().unwrap().push_back(Ok(outcome));
        self
    }

    pub fn push_failure(&self, err: FetchError) -> &Self {
        self.queue.lock().unwrap().push_back(Err(err));
        self
    }
}

#[async_trait]
impl ChannelStatusSource for ScriptedSource {
    fn family(&self) -> DeviceFamily {
        self.family
    }

    async fn fetch(&self) -> Result<FetchOutcome, FetchError> {
        let next = self.queue.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(next) = next {
            *last = Some(next);
        }
        last.clone()
            .unwrap_or_else(|| Err(FetchError::Transport("no scripted outcome".to_string())))
    }
}
