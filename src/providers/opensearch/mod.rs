mod client;
mod queries;

use async_trait::async_trait;
use log::info;

use super::Querier;
use crate::auth::Credentials;
use crate::config::{ReportConfig, Window};
use crate::error::Result;
use crate::models::{Job, JobEvent, StepEvent, UsageEvent};

pub use client::OpenSearchClient;

/// Index base names. Each is queried through its `<name>-*` pattern so dated
/// indices are all covered.
#[derive(Debug, Clone)]
pub struct Indices {
    pub jobs: String,
    pub steps: String,
    pub usages: String,
}

fn index_pattern(name: &str) -> String {
    format!("{name}-*")
}

pub struct OpenSearchQuerier {
    client: OpenSearchClient,
    indices: Indices,
    config: ReportConfig,
}

impl OpenSearchQuerier {
    pub fn new(
        url: &str,
        credentials: Option<Credentials>,
        indices: Indices,
        config: ReportConfig,
    ) -> Result<Self> {
        Ok(Self {
            client: OpenSearchClient::new(url, credentials)?,
            indices,
            config,
        })
    }
}

#[async_trait]
impl Querier for OpenSearchQuerier {
    async fn query_jobs(&self, window: Window) -> Result<Vec<Job>> {
        let index = index_pattern(&self.indices.jobs);
        let events: Vec<JobEvent> = self
            .client
            .search_all(&index, &queries::jobs_query(window))
            .await?;

        info!("Queried {} jobs from {index}", events.len());
        Ok(events.into_iter().map(|event| event.job).collect())
    }

    async fn query_packet_setup_step_events(&self, window: Window) -> Result<Vec<StepEvent>> {
        let index = index_pattern(&self.indices.steps);
        let steps: Vec<StepEvent> = self
            .client
            .search_all(
                &index,
                &queries::packet_setup_steps_query(window, &self.config),
            )
            .await?;

        info!("Queried {} packet-setup steps from {index}", steps.len());
        Ok(steps)
    }

    async fn query_usage_events(&self, window: Window) -> Result<Vec<UsageEvent>> {
        let index = index_pattern(&self.indices.usages);
        let usages: Vec<UsageEvent> = self
            .client
            .search_all(&index, &queries::usages_query(window))
            .await?;

        info!("Queried {} usage events from {index}", usages.len());
        Ok(usages)
    }
}
