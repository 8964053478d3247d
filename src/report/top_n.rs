use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::metrics::{compute_job_metrics, JobMetrics, UsageIndex};
use crate::config::FlakinessPolicy;
use crate::models::{Job, JobIdentifier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedJobMetrics {
    pub job_identifier: JobIdentifier,
    pub metrics: JobMetrics,
}

impl IdentifiedJobMetrics {
    pub fn name(&self) -> &str {
        &self.job_identifier.name
    }
}

/// Groups executions by job name, in first-seen order. The identifier of a
/// group is built from its first execution.
pub fn group_by_name<'a>(jobs: &[&'a Job]) -> IndexMap<&'a str, (JobIdentifier, Vec<&'a Job>)> {
    jobs.iter().fold(IndexMap::new(), |mut groups, &job| {
        groups
            .entry(job.name.as_str())
            .or_insert_with(|| (job.identifier(), Vec::new()))
            .1
            .push(job);
        groups
    })
}

pub fn identified_metrics(jobs: &[&Job], usages: &UsageIndex<'_>) -> Vec<IdentifiedJobMetrics> {
    group_by_name(jobs)
        .into_values()
        .map(|(job_identifier, executions)| IdentifiedJobMetrics {
            job_identifier,
            metrics: compute_job_metrics(&executions, usages),
        })
        .collect()
}

/// Ranks job groups by `compare` (an ascending key ordering that ends with a
/// name tie-break), keeps the `n` largest and returns them smallest first.
pub fn select_top_n<F>(
    jobs: &[&Job],
    usages: &UsageIndex<'_>,
    n: usize,
    compare: F,
) -> Vec<IdentifiedJobMetrics>
where
    F: Fn(&IdentifiedJobMetrics, &IdentifiedJobMetrics) -> Ordering,
{
    let mut ranked = identified_metrics(jobs, usages);
    ranked.sort_by(|a, b| compare(b, a));
    ranked.truncate(n);
    ranked.reverse();
    ranked
}

fn compare_rates(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

/// Key `(failure_rate, failures, name)`.
pub fn by_failure_rate(a: &IdentifiedJobMetrics, b: &IdentifiedJobMetrics) -> Ordering {
    compare_rates(a.metrics.failure_rate(), b.metrics.failure_rate())
        .then_with(|| a.metrics.failures.cmp(&b.metrics.failures))
        .then_with(|| a.name().cmp(b.name()))
}

/// Key `(total, name)`.
pub fn by_trigger_count(a: &IdentifiedJobMetrics, b: &IdentifiedJobMetrics) -> Ordering {
    a.metrics
        .total()
        .cmp(&b.metrics.total())
        .then_with(|| a.name().cmp(b.name()))
}

/// Key `(cost, name)`.
pub fn by_cost(a: &IdentifiedJobMetrics, b: &IdentifiedJobMetrics) -> Ordering {
    a.metrics
        .cost
        .total_cmp(&b.metrics.cost)
        .then_with(|| a.name().cmp(b.name()))
}

pub fn top_failing(jobs: &[&Job], usages: &UsageIndex<'_>, n: usize) -> Vec<IdentifiedJobMetrics> {
    select_top_n(jobs, usages, n, by_failure_rate)
        .into_iter()
        .filter(|item| item.metrics.failures > 0)
        .collect()
}

pub fn most_triggered(
    jobs: &[&Job],
    usages: &UsageIndex<'_>,
    n: usize,
) -> Vec<IdentifiedJobMetrics> {
    select_top_n(jobs, usages, n, by_trigger_count)
}

pub fn most_expensive(
    jobs: &[&Job],
    usages: &UsageIndex<'_>,
    n: usize,
) -> Vec<IdentifiedJobMetrics> {
    select_top_n(jobs, usages, n, by_cost)
        .into_iter()
        .filter(|item| item.metrics.cost > 0.0)
        .collect()
}

/// Flaky groups, flakiest first. Unlike the other rankings the result is
/// not reversed.
pub fn flaky_jobs(
    jobs: &[&Job],
    usages: &UsageIndex<'_>,
    n: usize,
    policy: &FlakinessPolicy,
) -> Vec<IdentifiedJobMetrics> {
    let mut flaky: Vec<_> = identified_metrics(jobs, usages)
        .into_iter()
        .filter(|item| item.metrics.is_flaky_under(policy))
        .collect();

    flaky.sort_by(|a, b| {
        compare_rates(b.metrics.flakiness, a.metrics.flakiness)
            .then_with(|| a.name().cmp(b.name()))
    });
    flaky.truncate(n);
    flaky
}
