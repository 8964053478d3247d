use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::FlakinessPolicy;
use crate::models::{Job, UsageEvent};

const FIRST_TRANSITION_WEIGHT: f64 = 0.1;
const LAST_TRANSITION_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetrics {
    pub successes: usize,
    pub failures: usize,
    pub cost: f64,
    pub flakiness: Option<f64>,
}

impl JobMetrics {
    pub fn empty() -> Self {
        Self {
            successes: 0,
            failures: 0,
            cost: 0.0,
            flakiness: None,
        }
    }

    pub fn total(&self) -> usize {
        self.successes + self.failures
    }

    /// Percentage in `[0, 100]`, `None` when there are no executions.
    pub fn failure_rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let rate = (self.failures as f64 / total as f64) * 100.0;
        Some(rate)
    }

    pub fn success_rate(&self) -> Option<f64> {
        self.failure_rate().map(|rate| 100.0 - rate)
    }

    pub fn is_flaky_under(&self, policy: &FlakinessPolicy) -> bool {
        self.flakiness
            .is_some_and(|score| score > policy.threshold && self.total() >= policy.min_samples)
    }
}

/// Usage totals summed per build id, built once per report.
#[derive(Debug, Default)]
pub struct UsageIndex<'a> {
    cost_by_build_id: HashMap<&'a str, f64>,
}

impl<'a> UsageIndex<'a> {
    pub fn new(usages: &'a [UsageEvent]) -> Self {
        // sum every usage row of a build
        let cost_by_build_id = usages.iter().fold(HashMap::new(), |mut acc, event| {
            *acc.entry(event.job.build_id.as_str()).or_insert(0.0) += event.usage.total;
            acc
        });

        Self { cost_by_build_id }
    }

    pub fn cost_of(&self, build_id: &str) -> f64 {
        self.cost_by_build_id.get(build_id).copied().unwrap_or(0.0)
    }
}

pub fn compute_job_metrics(jobs: &[&Job], usages: &UsageIndex<'_>) -> JobMetrics {
    if jobs.is_empty() {
        return JobMetrics::empty();
    }

    let successes = jobs.iter().filter(|job| job.is_success()).count();

    // executions without a build id carry no cost
    let cost = jobs
        .iter()
        .filter_map(|job| job.build_id.as_deref())
        .map(|build_id| usages.cost_of(build_id))
        .sum();

    JobMetrics {
        successes,
        failures: jobs.len() - successes,
        cost,
        flakiness: flakiness_score(jobs),
    }
}

/// Recency-weighted share of consecutive runs that flipped state.
///
/// Executions without a start time are left out entirely. No timestamped
/// executions gives `None`, a single one gives `0.0`. Otherwise each
/// transition is weighted linearly from 0.1 (oldest) to 1.0 (newest) and the
/// weighted average of the flips is returned, always within `[0, 1]`.
pub fn flakiness_score(jobs: &[&Job]) -> Option<f64> {
    let mut timeline: Vec<_> = jobs
        .iter()
        .filter_map(|job| job.start_time.map(|start| (start, job.is_success())))
        .collect();

    // stable: equal start times keep input order
    timeline.sort_by_key(|(start, _)| *start);

    match timeline.len() {
        0 => None,
        1 => Some(0.0),
        _ => {
            let flips: Vec<f64> = timeline
                .windows(2)
                .map(|pair| if pair[0].1 == pair[1].1 { 0.0 } else { 1.0 })
                .collect();

            let weights = transition_weights(flips.len());
            let weight_sum: f64 = weights.iter().sum();
            let weighted: f64 = flips.iter().zip(&weights).map(|(f, w)| f * w).sum();

            Some(weighted / weight_sum)
        }
    }
}

fn transition_weights(count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![LAST_TRANSITION_WEIGHT];
    }

    #[allow(clippy::cast_precision_loss)]
    let step = (LAST_TRANSITION_WEIGHT - FIRST_TRANSITION_WEIGHT) / (count - 1) as f64;

    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let weight = FIRST_TRANSITION_WEIGHT + step * i as f64;
            weight
        })
        .collect()
}
