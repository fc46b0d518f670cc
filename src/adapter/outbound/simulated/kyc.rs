//! Simulated identity verification.

use async_trait::async_trait;
use dashmap::DashMap;

use super::script::FailureScript;
use crate::domain::UserId;
use crate::error::ProviderError;
use crate::port::{KycProvider, KycStatus};

/// Reports a fixed status for unknown users and remembers overrides.
#[derive(Debug)]
pub struct SimulatedKyc {
    default_status: KycStatus,
    statuses: DashMap<UserId, KycStatus>,
    failures: FailureScript,
}

impl SimulatedKyc {
    /// Every user is verified unless overridden.
    #[must_use]
    pub fn verified() -> Self {
        Self::with_default(KycStatus::Verified)
    }

    #[must_use]
    pub fn with_default(default_status: KycStatus) -> Self {
        Self {
            default_status,
            statuses: DashMap::new(),
            failures: FailureScript::default(),
        }
    }

    pub fn set_status(&self, user: &UserId, status: KycStatus) {
        self.statuses.insert(user.clone(), status);
    }

    #[must_use]
    pub fn status(&self, user: &UserId) -> KycStatus {
        self.statuses
            .get(user)
            .map_or(self.default_status, |status| *status)
    }

    pub fn fail_next(&self, error: ProviderError) {
        self.failures.push(error);
    }
}

#[async_trait]
impl KycProvider for SimulatedKyc {
    async fn check_status(&self, user: &UserId) -> Result<KycStatus, ProviderError> {
        if let Some(error) = self.failures.take() {
            return Err(error);
        }
        Ok(self.status(user))
    }

    async fn start_verification(
        &self,
        user: &UserId,
        _context: &str,
    ) -> Result<KycStatus, ProviderError> {
        if let Some(error) = self.failures.take() {
            return Err(error);
        }
        self.set_status(user, KycStatus::Pending);
        Ok(KycStatus::Pending)
    }
}
