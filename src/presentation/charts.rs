use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::{is_bandwidth_plan, JobIdentifier};
use crate::report::IdentifiedJobMetrics;

pub const OTHERS: &str = "Others";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    StackedBar,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Renderer-agnostic chart: one label per bar/slice, one value per label in
/// every series. Bars are listed in drawing order, top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub title: String,
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

/// Costs are shown as whole units, truncated.
pub fn floor_cost(cost: f64) -> u64 {
    if cost.is_finite() && cost > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let floored = cost.trunc() as u64;
        floored
    } else {
        0
    }
}

fn display_names(jobs: &[IdentifiedJobMetrics]) -> Vec<String> {
    let show_variant = JobIdentifier::variants_differ(jobs.iter().map(|job| &job.job_identifier));

    jobs.iter()
        .map(|job| job.job_identifier.display_name(show_variant))
        .collect()
}

fn counts<F>(jobs: &[IdentifiedJobMetrics], value: F) -> Vec<f64>
where
    F: Fn(&IdentifiedJobMetrics) -> usize,
{
    #[allow(clippy::cast_precision_loss)]
    let values = jobs.iter().map(|job| value(job) as f64).collect();
    values
}

pub fn failing_jobs_chart(title: &str, jobs: &[IdentifiedJobMetrics]) -> Chart {
    Chart {
        title: title.to_string(),
        kind: ChartKind::StackedBar,
        labels: display_names(jobs),
        series: vec![
            Series {
                name: "succeeded".to_string(),
                values: counts(jobs, |job| job.metrics.successes),
            },
            Series {
                name: "failed".to_string(),
                values: counts(jobs, |job| job.metrics.failures),
            },
        ],
    }
}

pub fn triggered_jobs_chart(title: &str, jobs: &[IdentifiedJobMetrics]) -> Chart {
    Chart {
        title: title.to_string(),
        kind: ChartKind::Bar,
        labels: display_names(jobs),
        series: vec![Series {
            name: "Quantity".to_string(),
            values: counts(jobs, |job| job.metrics.total()),
        }],
    }
}

pub fn expensive_jobs_chart(title: &str, jobs: &[IdentifiedJobMetrics]) -> Chart {
    #[allow(clippy::cast_precision_loss)]
    let costs = jobs
        .iter()
        .map(|job| floor_cost(job.metrics.cost) as f64)
        .collect();

    Chart {
        title: title.to_string(),
        kind: ChartKind::Bar,
        labels: display_names(jobs),
        series: vec![Series {
            name: "Cost".to_string(),
            values: costs,
        }],
    }
}

pub fn flaky_jobs_chart(title: &str, jobs: &[IdentifiedJobMetrics]) -> Chart {
    Chart {
        title: title.to_string(),
        kind: ChartKind::Bar,
        labels: display_names(jobs),
        series: vec![Series {
            name: "Flakiness".to_string(),
            values: jobs
                .iter()
                .map(|job| job.metrics.flakiness.unwrap_or_default())
                .collect(),
        }],
    }
}

pub fn pie_chart(title: &str, (labels, values): (Vec<String>, Vec<u64>)) -> Chart {
    #[allow(clippy::cast_precision_loss)]
    let values = values.into_iter().map(|value| value as f64).collect();

    Chart {
        title: title.to_string(),
        kind: ChartKind::Pie,
        labels,
        series: vec![Series {
            name: "Cost".to_string(),
            values,
        }],
    }
}

/// Labels and floored costs for a pie chart. Entries whose share of the
/// whole breakdown is at or below `threshold` are summed into a leading
/// "Others" slice; entries that floor to zero are dropped.
fn cost_breakdown<L>(
    metrics: &IndexMap<String, f64>,
    threshold: f64,
    skip: impl Fn(&str) -> bool,
    label: L,
) -> (Vec<String>, Vec<u64>)
where
    L: Fn(&str) -> String,
{
    let total: f64 = metrics.values().sum();
    let mut labels = Vec::new();
    let mut costs = Vec::new();
    let mut others: Option<u64> = None;

    for (name, &cost) in metrics {
        let floored = floor_cost(cost);
        if floored == 0 || skip(name) {
            continue;
        }

        if cost / total <= threshold {
            *others.get_or_insert(0) += floored;
        } else {
            labels.push(label(name));
            costs.push(floored);
        }
    }

    if let Some(others) = others {
        labels.insert(0, OTHERS.to_string());
        costs.insert(0, others);
    }

    (labels, costs)
}

fn plan_label(plan: &str) -> String {
    plan.replace('.', " ")
}

/// Bandwidth plans are left out; plan names are shown with spaces for dots.
pub fn machine_type_breakdown(
    metrics: &IndexMap<String, f64>,
    threshold: f64,
) -> (Vec<String>, Vec<u64>) {
    cost_breakdown(metrics, threshold, is_bandwidth_plan, plan_label)
}

pub fn job_type_breakdown(
    metrics: &IndexMap<String, f64>,
    threshold: f64,
) -> (Vec<String>, Vec<u64>) {
    cost_breakdown(metrics, threshold, |_| false, str::to_string)
}
