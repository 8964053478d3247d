use crate::config::ReportConfig;
use crate::models::{Job, JobType, StepEvent};

/// Repository on the allow-list, owned by the configured organization.
pub fn is_assisted_repository(job: &Job, config: &ReportConfig) -> bool {
    job.refs.org == config.organization
        && config
            .assisted_repositories
            .iter()
            .any(|repo| *repo == job.refs.repo)
}

/// Name carries one of the class markers (`e2e`, `subsystem`).
pub fn is_e2e_or_subsystem_class(job: &Job, config: &ReportConfig) -> bool {
    config
        .job_class_markers
        .iter()
        .any(|marker| job.name.contains(marker.as_str()))
}

/// Presubmit in `<org>/release` exercising a config change.
pub fn is_rehearsal(job: &Job, config: &ReportConfig) -> bool {
    job.name.contains(config.rehearsal_marker.as_str())
        && job.job_type == JobType::Presubmit
        && job.refs.repo == config.release_repository
        && job.refs.org == config.organization
}

pub fn is_packet_setup(step: &StepEvent, config: &ReportConfig) -> bool {
    step.step.name.contains(config.packet_setup_step.as_str())
}
