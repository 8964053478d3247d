pub mod fixture;
pub mod opensearch;

use crate::config::Window;
use crate::error::Result;
use crate::models::{Job, StepEvent, UsageEvent};
use async_trait::async_trait;

/// Source of the raw records a report is built from. Every query covers the
/// half-open window `[from, to)`.
#[async_trait]
pub trait Querier: Send + Sync {
    async fn query_jobs(&self, window: Window) -> Result<Vec<Job>>;

    /// Packet-setup step events of allow-listed repositories only.
    async fn query_packet_setup_step_events(&self, window: Window) -> Result<Vec<StepEvent>>;

    async fn query_usage_events(&self, window: Window) -> Result<Vec<UsageEvent>>;
}
