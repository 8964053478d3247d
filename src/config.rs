use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReportError, Result};

const ASSISTED_REPOSITORIES: [&str; 6] = [
    "assisted-service",
    "assisted-installer",
    "assisted-installer-agent",
    "assisted-image-service",
    "assisted-test-infra",
    "cluster-api-provider-agent",
];

/// Thresholds deciding when a job is labelled flaky.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlakinessPolicy {
    /// Scores strictly above this are flaky.
    pub threshold: f64,
    /// Executions required before a score is trusted.
    pub min_samples: usize,
}

impl Default for FlakinessPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_samples: 5,
        }
    }
}

/// Everything the report assembler and presentation need besides the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub assisted_repositories: Vec<String>,
    pub organization: String,
    pub release_repository: String,
    pub rehearsal_marker: String,
    pub job_class_markers: Vec<String>,
    pub packet_setup_step: String,
    pub top_failing: usize,
    pub top_triggered: usize,
    pub top_expensive: usize,
    pub top_flaky: usize,
    pub flakiness: FlakinessPolicy,
    /// Share of a cost breakdown at or below which an entry folds into "Others".
    pub others_threshold: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            assisted_repositories: Vec::from(ASSISTED_REPOSITORIES.map(String::from)),
            organization: "openshift".to_string(),
            release_repository: "release".to_string(),
            rehearsal_marker: "rehearse".to_string(),
            job_class_markers: vec!["e2e".to_string(), "subsystem".to_string()],
            packet_setup_step: "packet-setup".to_string(),
            top_failing: 10,
            top_triggered: 5,
            top_expensive: 5,
            top_flaky: 10,
            flakiness: FlakinessPolicy::default(),
            others_threshold: 0.01,
        }
    }
}

impl ReportConfig {
    /// Reads overrides from a JSON file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.assisted_repositories.is_empty() {
            return Err(ReportError::Config(
                "At least one assisted repository is required".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.others_threshold) {
            return Err(ReportError::Config(format!(
                "others_threshold must be within [0, 1], got {}",
                self.others_threshold
            )));
        }

        Ok(())
    }
}

/// Gates which sections the sink renders. Never affects report computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub success_rates: bool,
    pub equinix_usage: bool,
    pub equinix_cost: bool,
    pub trends: bool,
    pub flakiness_rates: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            success_rates: true,
            equinix_usage: true,
            equinix_cost: true,
            trends: true,
            flakiness_rates: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportInterval {
    Week,
    Month,
}

/// Half-open `[from, to)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Window {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant < self.to
    }
}

impl ReportInterval {
    pub fn length(self) -> Duration {
        match self {
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
        }
    }

    /// Window ending at `now`.
    pub fn current(self, now: DateTime<Utc>) -> Window {
        Window {
            from: now - self.length(),
            to: now,
        }
    }

    /// Window immediately preceding the current one, same length.
    pub fn previous(self, now: DateTime<Utc>) -> Window {
        let current = self.current(now);
        Window {
            from: current.from - self.length(),
            to: current.from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReportConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.assisted_repositories.len(), 6);
        assert_eq!(config.organization, "openshift");
        assert_eq!(config.flakiness.min_samples, 5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let raw = r#"{"top_failing": 3, "flakiness": {"threshold": 0.7}}"#;
        let config: ReportConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.top_failing, 3);
        assert_eq!(config.top_triggered, 5);
        assert!((config.flakiness.threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.flakiness.min_samples, 5);
    }

    #[test]
    fn test_validate_rejects_empty_allow_list() {
        let config = ReportConfig {
            assisted_repositories: vec![],
            ..ReportConfig::default()
        };

        assert!(matches!(config.validate(), Err(ReportError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let config = ReportConfig {
            others_threshold: 1.5,
            ..ReportConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_weekly_windows_are_adjacent() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let week_ago = Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap();
        let two_weeks_ago = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let current = ReportInterval::Week.current(now);
        let previous = ReportInterval::Week.previous(now);

        assert_eq!(current.to, now);
        assert_eq!(current.from, week_ago);
        assert_eq!(previous.to, current.from);
        assert_eq!(previous.from, two_weeks_ago);
    }

    #[test]
    fn test_monthly_window_length() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let current = ReportInterval::Month.current(now);

        assert_eq!(current.to - current.from, Duration::days(30));
    }

    #[test]
    fn test_window_is_half_open() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let window = ReportInterval::Week.current(now);

        assert!(window.contains(window.from));
        assert!(!window.contains(window.to));
    }
}
