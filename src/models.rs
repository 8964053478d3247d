use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const BANDWIDTH: &str = "Bandwidth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Periodic,
    Presubmit,
    Postsubmit,
    Batch,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Periodic => "periodic",
            Self::Presubmit => "presubmit",
            Self::Postsubmit => "postsubmit",
            Self::Batch => "batch",
        }
    }
}

/// Terminal states only; anything else fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRefs {
    pub org: String,
    pub repo: String,
    pub base_ref: String,
    #[serde(default)]
    pub pull: Option<String>,
}

/// One CI execution attempt. `build_id` is not unique across retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub build_id: Option<String>,
    pub name: String,
    pub refs: JobRefs,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub state: JobState,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Job {
    pub fn is_success(&self) -> bool {
        self.state == JobState::Success
    }

    pub fn identifier(&self) -> JobIdentifier {
        JobIdentifier {
            name: self.name.clone(),
            repository: Some(self.refs.repo.clone()),
            base_ref: Some(self.refs.base_ref.clone()),
            context: self.context.clone(),
            variant: self.variant.clone(),
        }
    }
}

/// Stored job document shape: `{"job": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEvent {
    pub job: Job,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDetails {
    pub name: String,
    pub state: JobState,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub job: Job,
    pub step: StepDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageJob {
    pub build_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub name: String,
    pub plan: String,
    pub total: f64,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl Usage {
    pub fn is_bandwidth(&self) -> bool {
        is_bandwidth_plan(&self.plan)
    }
}

pub fn is_bandwidth_plan(plan: &str) -> bool {
    plan.contains(BANDWIDTH)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub job: UsageJob,
    pub usage: Usage,
}

/// Display metadata for a logical job. Grouping is done by `name` alone
/// (see `report::top_n::group_by_name`); the other fields are taken from the
/// first execution seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobIdentifier {
    pub name: String,
    pub repository: Option<String>,
    pub base_ref: Option<String>,
    pub context: Option<String>,
    pub variant: Option<String>,
}

impl JobIdentifier {
    pub fn display_name(&self, show_variant: bool) -> String {
        let Some(context) = &self.context else {
            return self.name.clone();
        };

        let repository = self.repository.as_deref().unwrap_or_default();
        let base_ref = self.base_ref.as_deref().unwrap_or_default();

        match &self.variant {
            Some(variant) if show_variant => {
                format!("{repository}/{base_ref}\n{variant}-{context}")
            }
            _ => format!("{repository}/{base_ref}\n{context}"),
        }
    }

    /// Variants are worth showing only when they actually differ.
    pub fn variants_differ<'a, I>(identifiers: I) -> bool
    where
        I: IntoIterator<Item = &'a JobIdentifier>,
    {
        identifiers
            .into_iter()
            .map(|identifier| identifier.variant.as_deref())
            .collect::<HashSet<_>>()
            .len()
            != 1
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::{Duration, TimeZone};

    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()
    }

    pub fn job(name: &str, job_type: JobType, state: JobState) -> Job {
        Job {
            build_id: Some(format!("{name}-build")),
            name: name.to_string(),
            refs: JobRefs {
                org: "openshift".to_string(),
                repo: "assisted-service".to_string(),
                base_ref: "master".to_string(),
                pull: None,
            },
            job_type,
            state,
            start_time: Some(base_time()),
            duration: 2053,
            context: Some("edge-e2e-metal-assisted".to_string()),
            variant: Some("test".to_string()),
            url: None,
        }
    }

    pub fn in_repo(mut job: Job, org: &str, repo: &str) -> Job {
        job.refs.org = org.to_string();
        job.refs.repo = repo.to_string();
        job
    }

    pub fn with_build_id(mut job: Job, build_id: &str) -> Job {
        job.build_id = Some(build_id.to_string());
        job
    }

    pub fn started_at(mut job: Job, hours: i64) -> Job {
        job.start_time = Some(base_time() + Duration::hours(hours));
        job
    }

    /// Same name, one execution per state, timestamped one hour apart.
    pub fn history(name: &str, job_type: JobType, states: &[JobState]) -> Vec<Job> {
        states
            .iter()
            .enumerate()
            .map(|(i, &state)| {
                let hours = i64::try_from(i).unwrap();
                with_build_id(
                    started_at(job(name, job_type, state), hours),
                    &format!("{name}-{i}"),
                )
            })
            .collect()
    }

    pub fn usage(build_id: &str, plan: &str, total: f64) -> UsageEvent {
        UsageEvent {
            job: UsageJob {
                build_id: build_id.to_string(),
            },
            usage: Usage {
                name: format!("ipi-ci-op-{build_id}"),
                plan: plan.to_string(),
                total,
                start_date: base_time(),
                end_date: None,
            },
        }
    }

    pub fn step(name: &str, state: JobState) -> StepEvent {
        StepEvent {
            job: job("lease-job", JobType::Presubmit, JobState::Success),
            step: StepDetails {
                name: name.to_string(),
                state,
                duration: 456,
                details: None,
            },
        }
    }
}
