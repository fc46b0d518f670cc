//! Scripted failures and artificial latency shared by the simulated providers.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::ProviderError;

/// Queue of errors handed out one per call.
#[derive(Debug, Default)]
pub(crate) struct FailureScript {
    queue: Mutex<VecDeque<ProviderError>>,
}

impl FailureScript {
    pub(crate) fn push(&self, error: ProviderError) {
        self.queue.lock().push_back(error);
    }

    pub(crate) fn take(&self) -> Option<ProviderError> {
        self.queue.lock().pop_front()
    }
}

pub(crate) async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}
