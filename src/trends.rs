use serde::{Deserialize, Serialize};

use crate::report::Report;

/// Field-wise `current - previous` of the headline report numbers. Rates are
/// `None` unless both reports carry one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trends {
    pub number_of_e2e_or_subsystem_periodic_jobs: i64,
    pub success_rate_for_e2e_or_subsystem_periodic_jobs: Option<f64>,
    pub number_of_e2e_or_subsystem_presubmit_jobs: i64,
    pub success_rate_for_e2e_or_subsystem_presubmit_jobs: Option<f64>,
    pub number_of_rehearsal_jobs: i64,
    pub number_of_postsubmit_jobs: i64,
    pub success_rate_for_postsubmit_jobs: Option<f64>,
    pub total_number_of_machine_leased: i64,
    pub number_of_unsuccessful_machine_leases: i64,
    pub total_equinix_machines_cost: f64,
}

fn count_delta(current: usize, previous: usize) -> i64 {
    let current = i64::try_from(current).unwrap_or(i64::MAX);
    let previous = i64::try_from(previous).unwrap_or(i64::MAX);
    current.saturating_sub(previous)
}

fn rate_delta(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    Some(current? - previous?)
}

pub fn detect_trends(previous: &Report, current: &Report) -> Trends {
    Trends {
        number_of_e2e_or_subsystem_periodic_jobs: count_delta(
            current.periodics_report.total,
            previous.periodics_report.total,
        ),
        success_rate_for_e2e_or_subsystem_periodic_jobs: rate_delta(
            current.periodics_report.success_rate,
            previous.periodics_report.success_rate,
        ),
        number_of_e2e_or_subsystem_presubmit_jobs: count_delta(
            current.presubmits_report.jobs.total,
            previous.presubmits_report.jobs.total,
        ),
        success_rate_for_e2e_or_subsystem_presubmit_jobs: rate_delta(
            current.presubmits_report.jobs.success_rate,
            previous.presubmits_report.jobs.success_rate,
        ),
        number_of_rehearsal_jobs: count_delta(
            current.presubmits_report.rehearsals,
            previous.presubmits_report.rehearsals,
        ),
        number_of_postsubmit_jobs: count_delta(
            current.postsubmits_report.total,
            previous.postsubmits_report.total,
        ),
        success_rate_for_postsubmit_jobs: rate_delta(
            current.postsubmits_report.success_rate,
            previous.postsubmits_report.success_rate,
        ),
        total_number_of_machine_leased: count_delta(
            current.equinix_usage_report.total_machines_leased,
            previous.equinix_usage_report.total_machines_leased,
        ),
        number_of_unsuccessful_machine_leases: count_delta(
            current.equinix_usage_report.unsuccessful_machine_leases,
            previous.equinix_usage_report.unsuccessful_machine_leases,
        ),
        total_equinix_machines_cost: current.equinix_cost_report.total_equinix_machines_cost
            - previous.equinix_cost_report.total_equinix_machines_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReportConfig, Window};
    use crate::models::fixtures;
    use crate::report::build_report;

    fn empty_report() -> Report {
        let window = Window {
            from: fixtures::base_time(),
            to: fixtures::base_time(),
        };
        build_report(&ReportConfig::default(), window, &[], &[], &[])
    }

    fn with_numbers(
        periodic: (usize, Option<f64>),
        presubmit: (usize, Option<f64>, usize),
        postsubmit: (usize, Option<f64>),
        leases: (usize, usize),
        cost: f64,
    ) -> Report {
        let mut report = empty_report();
        report.periodics_report.total = periodic.0;
        report.periodics_report.success_rate = periodic.1;
        report.presubmits_report.jobs.total = presubmit.0;
        report.presubmits_report.jobs.success_rate = presubmit.1;
        report.presubmits_report.rehearsals = presubmit.2;
        report.postsubmits_report.total = postsubmit.0;
        report.postsubmits_report.success_rate = postsubmit.1;
        report.equinix_usage_report.total_machines_leased = leases.0;
        report.equinix_usage_report.unsuccessful_machine_leases = leases.1;
        report.equinix_cost_report.total_equinix_machines_cost = cost;
        report
    }

    #[test]
    fn test_detect_trends_differences_and_null_propagation() {
        let previous = with_numbers(
            (20, Some(75.0)),
            (10, Some(80.0), 4),
            (0, None),
            (16, 0),
            1000.0,
        );
        let current = with_numbers(
            (0, None),
            (10, Some(80.0), 4),
            (16, Some(50.0)),
            (16, 3),
            1250.5,
        );

        let trends = detect_trends(&previous, &current);

        assert_eq!(trends.number_of_e2e_or_subsystem_periodic_jobs, -20);
        assert_eq!(trends.success_rate_for_e2e_or_subsystem_periodic_jobs, None);
        assert_eq!(trends.number_of_e2e_or_subsystem_presubmit_jobs, 0);
        assert_eq!(
            trends.success_rate_for_e2e_or_subsystem_presubmit_jobs,
            Some(0.0)
        );
        assert_eq!(trends.number_of_rehearsal_jobs, 0);
        assert_eq!(trends.number_of_postsubmit_jobs, 16);
        assert_eq!(trends.success_rate_for_postsubmit_jobs, None);
        assert_eq!(trends.total_number_of_machine_leased, 0);
        assert_eq!(trends.number_of_unsuccessful_machine_leases, 3);
        assert!((trends.total_equinix_machines_cost - 250.5).abs() < 1e-9);
    }

    #[test]
    fn test_rate_delta_requires_both_sides() {
        assert_eq!(rate_delta(None, Some(10.0)), None);
        assert_eq!(rate_delta(Some(10.0), None), None);
        assert_eq!(rate_delta(None, None), None);
        assert_eq!(rate_delta(Some(82.5), Some(80.0)), Some(2.5));
    }

    #[test]
    fn test_identical_reports_have_no_trend() {
        let report = with_numbers(
            (5, Some(60.0)),
            (3, Some(100.0), 1),
            (2, Some(50.0)),
            (4, 1),
            12.0,
        );

        let trends = detect_trends(&report, &report);

        assert_eq!(trends.number_of_e2e_or_subsystem_periodic_jobs, 0);
        assert_eq!(
            trends.success_rate_for_e2e_or_subsystem_periodic_jobs,
            Some(0.0)
        );
        assert_eq!(trends.success_rate_for_postsubmit_jobs, Some(0.0));
        assert!(trends.total_equinix_machines_cost.abs() < f64::EPSILON);
    }
}
