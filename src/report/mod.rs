mod filters;
pub(crate) mod metrics;
mod top_n;

use chrono::{DateTime, Utc};
use futures::future::try_join3;
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::{ReportConfig, Window};
use crate::error::Result;
use crate::models::{Job, JobState, JobType, StepEvent, UsageEvent};
use crate::providers::Querier;

pub use filters::{
    is_assisted_repository, is_e2e_or_subsystem_class, is_packet_setup, is_rehearsal,
};
pub use metrics::{compute_job_metrics, UsageIndex};
pub use top_n::{flaky_jobs, most_expensive, most_triggered, top_failing, IdentifiedJobMetrics};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobsReport {
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub success_rate: Option<f64>,
    pub top_10_failing: Vec<IdentifiedJobMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresubmitJobsReport {
    #[serde(flatten)]
    pub jobs: JobsReport,
    pub rehearsals: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquinixUsageReport {
    pub total_machines_leased: usize,
    pub successful_machine_leases: usize,
    pub unsuccessful_machine_leases: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquinixCostReport {
    pub total_equinix_machines_cost: f64,
    /// Plan name to summed cost, in first-seen order, bandwidth included.
    pub cost_by_machine_type: IndexMap<String, f64>,
    pub cost_by_job_type: IndexMap<String, f64>,
    pub top_5_most_expensive_jobs: Vec<IdentifiedJobMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub periodics_report: JobsReport,
    pub presubmits_report: PresubmitJobsReport,
    pub postsubmits_report: JobsReport,
    pub top_5_most_triggered_e2e_or_subsystem_jobs: Vec<IdentifiedJobMetrics>,
    pub equinix_usage_report: EquinixUsageReport,
    pub equinix_cost_report: EquinixCostReport,
    pub flaky_jobs: Vec<IdentifiedJobMetrics>,
}

/// Assembles a `Report` from already-queried records. Pure and deterministic:
/// the same inputs always produce an equal report.
pub fn build_report(
    config: &ReportConfig,
    window: Window,
    jobs: &[Job],
    steps: &[StepEvent],
    usages: &[UsageEvent],
) -> Report {
    let usage_index = UsageIndex::new(usages);

    // allow-listed repositories only
    let assisted: Vec<&Job> = jobs
        .iter()
        .filter(|job| is_assisted_repository(job, config))
        .collect();

    let assisted_of_class = |job_type: JobType| {
        assisted
            .iter()
            .copied()
            .filter(|job| job.job_type == job_type && is_e2e_or_subsystem_class(job, config))
            .collect::<Vec<_>>()
    };

    // bucket by job type
    let periodics = assisted_of_class(JobType::Periodic);
    let presubmits = assisted_of_class(JobType::Presubmit);
    let postsubmits: Vec<&Job> = assisted
        .iter()
        .copied()
        .filter(|job| job.job_type == JobType::Postsubmit)
        .collect();

    // rehearsals live in the release repository, outside the allow-list
    let rehearsals = jobs.iter().filter(|job| is_rehearsal(job, config)).count();

    debug!(
        "Bucketed {} jobs: {} assisted, {} periodic, {} presubmit, {} postsubmit, {} rehearsals",
        jobs.len(),
        assisted.len(),
        periodics.len(),
        presubmits.len(),
        postsubmits.len(),
        rehearsals
    );

    Report {
        from_date: window.from,
        to_date: window.to,
        periodics_report: jobs_report(JobType::Periodic, &periodics, &usage_index, config),
        presubmits_report: PresubmitJobsReport {
            jobs: jobs_report(JobType::Presubmit, &presubmits, &usage_index, config),
            rehearsals,
        },
        postsubmits_report: jobs_report(JobType::Postsubmit, &postsubmits, &usage_index, config),
        top_5_most_triggered_e2e_or_subsystem_jobs: most_triggered(
            &presubmits,
            &usage_index,
            config.top_triggered,
        ),
        equinix_usage_report: equinix_usage_report(steps, config),
        equinix_cost_report: equinix_cost_report(jobs, &assisted, usages, &usage_index, config),
        flaky_jobs: flaky_jobs(
            &periodics,
            &usage_index,
            config.top_flaky,
            &config.flakiness,
        ),
    }
}

fn jobs_report(
    job_type: JobType,
    jobs: &[&Job],
    usages: &UsageIndex<'_>,
    config: &ReportConfig,
) -> JobsReport {
    let successes = jobs.iter().filter(|job| job.is_success()).count();
    let aggregate = compute_job_metrics(jobs, usages);

    JobsReport {
        job_type,
        total: jobs.len(),
        successes,
        failures: jobs.len() - successes,
        success_rate: aggregate.success_rate(),
        top_10_failing: top_failing(jobs, usages, config.top_failing),
    }
}

fn equinix_usage_report(steps: &[StepEvent], config: &ReportConfig) -> EquinixUsageReport {
    let leases: Vec<_> = steps
        .iter()
        .filter(|step| is_packet_setup(step, config))
        .collect();
    let successful = leases
        .iter()
        .filter(|step| step.step.state == JobState::Success)
        .count();

    EquinixUsageReport {
        total_machines_leased: leases.len(),
        successful_machine_leases: successful,
        unsuccessful_machine_leases: leases.len() - successful,
    }
}

fn equinix_cost_report(
    jobs: &[Job],
    assisted: &[&Job],
    usages: &[UsageEvent],
    usage_index: &UsageIndex<'_>,
    config: &ReportConfig,
) -> EquinixCostReport {
    // every usage event counts toward the total
    let total_equinix_machines_cost = usages.iter().map(|event| event.usage.total).sum();
    let bandwidth = usages
        .iter()
        .filter(|event| event.usage.is_bandwidth())
        .count();
    let total = usages.len();
    debug!("{bandwidth} of {total} usage events are bandwidth charges");

    // sum cost per machine plan
    let cost_by_machine_type = usages.iter().fold(IndexMap::new(), |mut acc, event| {
        *acc.entry(event.usage.plan.clone()).or_insert(0.0) += event.usage.total;
        acc
    });

    // later executions of a build id overwrite earlier ones
    let type_by_build_id: HashMap<&str, JobType> = jobs
        .iter()
        .filter_map(|job| job.build_id.as_deref().map(|id| (id, job.job_type)))
        .collect();

    // sum cost per job type of the correlated execution
    let cost_by_job_type = usages.iter().fold(IndexMap::new(), |mut acc, event| {
        if let Some(job_type) = type_by_build_id.get(event.job.build_id.as_str()) {
            *acc.entry(job_type.as_str().to_string()).or_insert(0.0) += event.usage.total;
        }
        acc
    });

    EquinixCostReport {
        total_equinix_machines_cost,
        cost_by_machine_type,
        cost_by_job_type,
        top_5_most_expensive_jobs: most_expensive(assisted, usage_index, config.top_expensive),
    }
}

/// Fetches a window's records through a `Querier` and assembles the report.
pub struct Reporter<Q> {
    querier: Q,
    config: ReportConfig,
}

impl<Q: Querier> Reporter<Q> {
    pub fn new(querier: Q, config: ReportConfig) -> Self {
        Self { querier, config }
    }

    pub async fn get_report(&self, window: Window) -> Result<Report> {
        info!("Building report for {} -> {}", window.from, window.to);

        let (jobs, steps, usages) = try_join3(
            self.querier.query_jobs(window),
            self.querier.query_packet_setup_step_events(window),
            self.querier.query_usage_events(window),
        )
        .await?;

        info!(
            "Fetched {} jobs, {} packet-setup steps and {} usage events",
            jobs.len(),
            steps.len(),
            usages.len()
        );

        Ok(build_report(&self.config, window, &jobs, &steps, &usages))
    }
}
