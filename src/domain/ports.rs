use crate::domain::model::{LedgerEntry, Member};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Delivers notices to the group. Delivery failures never feed back into the
/// negotiation state.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_prompt(&self, candidate: &Member) -> Result<()>;
    async fn send_confirmation(&self, hosted_by: &Member) -> Result<()>;
    async fn send_rebuff(&self) -> Result<()>;

    /// Whether there is somewhere to send prompts yet.
    fn is_ready(&self) -> bool {
        true
    }
}

pub trait RosterProvider: Send + Sync {
    /// Ordered roster with the initial weeks-since-hosted count of each member.
    fn roster(&self) -> Vec<LedgerEntry>;
}
