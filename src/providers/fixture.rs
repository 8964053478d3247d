use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use std::path::Path;

use super::Querier;
use crate::config::{ReportConfig, Window};
use crate::error::{ReportError, Result};
use crate::models::{Job, JobEvent, StepEvent, UsageEvent};
use crate::report::{is_assisted_repository, is_packet_setup};

/// Dump of the three indices, one array of raw documents each.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FixtureData {
    pub jobs: Vec<JobEvent>,
    pub steps: Vec<StepEvent>,
    pub usages: Vec<UsageEvent>,
}

/// Serves records from a JSON dump, filtered the way the search store
/// queries filter them.
pub struct FixtureQuerier {
    data: FixtureData,
    config: ReportConfig,
}

fn started_within(job: &Job, window: Window) -> bool {
    job.start_time.is_some_and(|start| window.contains(start))
}

impl FixtureQuerier {
    pub fn new(data: FixtureData, config: ReportConfig) -> Self {
        Self { data, config }
    }

    pub fn load(path: &Path, config: ReportConfig) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("Failed to read fixture {}: {e}", path.display()))
        })?;
        let data: FixtureData = serde_json::from_str(&raw)?;

        info!(
            "Loaded fixture with {} jobs, {} steps and {} usages",
            data.jobs.len(),
            data.steps.len(),
            data.usages.len()
        );
        Ok(Self::new(data, config))
    }
}

#[async_trait]
impl Querier for FixtureQuerier {
    async fn query_jobs(&self, window: Window) -> Result<Vec<Job>> {
        Ok(self
            .data
            .jobs
            .iter()
            .filter(|event| started_within(&event.job, window))
            .map(|event| event.job.clone())
            .collect())
    }

    async fn query_packet_setup_step_events(&self, window: Window) -> Result<Vec<StepEvent>> {
        Ok(self
            .data
            .steps
            .iter()
            .filter(|event| {
                started_within(&event.job, window)
                    && is_packet_setup(event, &self.config)
                    && is_assisted_repository(&event.job, &self.config)
            })
            .cloned()
            .collect())
    }

    async fn query_usage_events(&self, window: Window) -> Result<Vec<UsageEvent>> {
        Ok(self
            .data
            .usages
            .iter()
            .filter(|event| window.contains(event.usage.start_date))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use crate::models::{JobState, JobType};
    use chrono::Duration;

    fn window() -> Window {
        Window {
            from: fixtures::base_time(),
            to: fixtures::base_time() + Duration::hours(24),
        }
    }

    fn periodic_at(name: &str, state: JobState, hours: i64) -> Job {
        fixtures::started_at(fixtures::job(name, JobType::Periodic, state), hours)
    }

    fn querier() -> FixtureQuerier {
        let inside = periodic_at("in-e2e", JobState::Success, 2);
        let before = periodic_at("old-e2e", JobState::Success, -1);
        let at_end = periodic_at("end-e2e", JobState::Failure, 24);
        let mut unstarted = fixtures::job("pending-e2e", JobType::Periodic, JobState::Failure);
        unstarted.start_time = None;

        let mut foreign_step = fixtures::step("baremetalds-packet-setup", JobState::Success);
        foreign_step.job = fixtures::in_repo(foreign_step.job, "openshift", "release");

        let mut late_usage = fixtures::usage("2", "c3.medium.x86", 3.0);
        late_usage.usage.start_date = fixtures::base_time() + Duration::days(2);

        FixtureQuerier::new(
            FixtureData {
                jobs: [inside, before, at_end, unstarted]
                    .into_iter()
                    .map(|job| JobEvent { job })
                    .collect(),
                steps: vec![
                    fixtures::step("baremetalds-packet-setup", JobState::Failure),
                    fixtures::step("baremetalds-devscripts-gather", JobState::Success),
                    foreign_step,
                ],
                usages: vec![fixtures::usage("1", "c3.medium.x86", 1.0), late_usage],
            },
            ReportConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_jobs_filtered_to_half_open_window() {
        let jobs = querier().query_jobs(window()).await.unwrap();

        let names: Vec<_> = jobs.iter().map(|job| job.name.as_str()).collect();
        assert_eq!(names, vec!["in-e2e"]);
    }

    #[tokio::test]
    async fn test_steps_scoped_like_store_query() {
        let steps = querier()
            .query_packet_setup_step_events(window())
            .await
            .unwrap();

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].step.state, JobState::Failure);
    }

    #[tokio::test]
    async fn test_usages_filtered_by_start_date() {
        let usages = querier().query_usage_events(window()).await.unwrap();

        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].job.build_id, "1");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let name = format!("prowreport-fixture-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        let document = serde_json::json!({
            "jobs": [{
                "job": {
                    "build_id": "42",
                    "name": "periodic-ci-openshift-assisted-service-master-edge-e2e-metal-assisted",
                    "refs": {
                        "org": "openshift",
                        "repo": "assisted-service",
                        "base_ref": "master"
                    },
                    "type": "periodic",
                    "state": "success",
                    "start_time": "2024-03-10T06:00:00Z",
                    "duration": 3600
                }
            }],
            "usages": []
        });
        std::fs::write(&path, document.to_string()).unwrap();

        let querier = FixtureQuerier::load(&path, ReportConfig::default()).unwrap();
        std::fs::remove_file(&path).unwrap();

        let jobs = querier.query_jobs(window()).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].build_id.as_deref(), Some("42"));
        let steps = querier
            .query_packet_setup_step_events(window())
            .await
            .unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let missing = Path::new("/nonexistent/fixture.json");

        let result = FixtureQuerier::load(missing, ReportConfig::default());

        assert!(matches!(result, Err(ReportError::Config(_))));
    }
}
