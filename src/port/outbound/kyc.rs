//! Identity verification port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::UserId;
use crate::error::ProviderError;

/// Verification state of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotStarted,
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            KycStatus::NotStarted => "not_started",
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        }
    }

    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, KycStatus::Verified)
    }
}

/// Checks and starts identity verification.
#[async_trait]
pub trait KycProvider: Send + Sync {
    async fn check_status(&self, user: &UserId) -> Result<KycStatus, ProviderError>;

    /// Begin verification. `context` names the operation that required it.
    async fn start_verification(
        &self,
        user: &UserId,
        context: &str,
    ) -> Result<KycStatus, ProviderError>;
}
