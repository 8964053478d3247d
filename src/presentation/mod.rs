pub mod charts;

use serde::Serialize;

use crate::config::FeatureFlags;
use crate::report::{EquinixCostReport, EquinixUsageReport, JobsReport, Report};
use crate::trends::Trends;
use charts::{
    expensive_jobs_chart, failing_jobs_chart, flaky_jobs_chart, floor_cost, job_type_breakdown,
    machine_type_breakdown, pie_chart, triggered_jobs_chart, Chart,
};

pub const SUCCESS_EMOJI: &str = ":done-circle-check:";
pub const FAILURE_EMOJI: &str = ":x:";

pub const TOP_10_FAILED_PERIODIC_JOBS_TITLE: &str = "Top 10 Failed Periodic Jobs";
pub const TOP_10_FAILED_PRESUBMIT_JOBS_TITLE: &str = "Top 10 Failed Presubmit Jobs";
pub const TOP_5_TRIGGERED_PRESUBMIT_JOBS_TITLE: &str = "Top 5 Triggered Presubmit Jobs";
pub const TOP_10_FAILED_POSTSUBMIT_JOBS_TITLE: &str = "Top 10 Failed Postsubmit Jobs";
pub const PERIODIC_FLAKY_JOBS_TITLE: &str = "Periodic Flaky Jobs";
pub const TOP_5_MOST_EXPENSIVE_JOBS_TITLE: &str = "Top 5 Most Expensive Jobs";
pub const COST_BY_MACHINE_TYPE_TITLE: &str = "Cost by Machine Type";
pub const COST_BY_JOB_TYPE_TITLE: &str = "Cost by Job Type";

/// Markdown-flavoured message block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: String },
    Section { text: String },
    Divider,
}

/// One entry of the report thread: either a text message or a chart upload.
/// The first post is the thread root; everything after it is a reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "post", rename_all = "snake_case")]
pub enum Post {
    Message { blocks: Vec<Block> },
    Chart(Chart),
}

fn section(text: impl Into<String>) -> Block {
    Block::Section { text: text.into() }
}

fn header_message(report: &Report) -> Post {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    Post::Message {
        blocks: vec![
            Block::Header {
                text: "CI Report".to_string(),
            },
            section(format!(
                "*{} UTC\t:arrow_right:\t{} UTC*\n",
                report.from_date.format(FORMAT),
                report.to_date.format(FORMAT)
            )),
        ],
    }
}

fn bucket_text(jobs: &JobsReport) -> String {
    let mut text = format!(
        "•\t _{}_ in total\n \t\t *-* {SUCCESS_EMOJI} {} succeeded\n \t\t *-* {FAILURE_EMOJI} {} failed\n",
        jobs.total, jobs.successes, jobs.failures
    );
    if let Some(rate) = jobs.success_rate {
        text.push_str(&format!(" \t  _{rate:.2}%_ *success rate*\n"));
    }
    text
}

fn count_line(delta: i64, subject: &str) -> String {
    format!("•\t _{delta:+}_ {subject} compared to the previous period")
}

fn rate_line(delta: Option<f64>, subject: &str) -> Option<String> {
    delta.map(|delta| format!("•\t _{delta:+.2}%_ {subject} compared to the previous period"))
}

fn cost_line(delta: f64) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let delta = delta.trunc() as i64;
    format!("•\t _{delta:+}_ $ total cost compared to the previous period")
}

fn push_trends(blocks: &mut Vec<Block>, lines: Vec<String>) {
    if !lines.is_empty() {
        blocks.push(section(lines.join("\n")));
    }
}

fn periodic_message(jobs: &JobsReport, trends: Option<&Trends>) -> Post {
    let mut blocks = vec![
        section("*Periodic e2e/subsystem jobs*\n"),
        section(bucket_text(jobs)),
    ];

    if let Some(trends) = trends {
        let mut lines = vec![count_line(
            trends.number_of_e2e_or_subsystem_periodic_jobs,
            "periodic jobs",
        )];
        lines.extend(rate_line(
            trends.success_rate_for_e2e_or_subsystem_periodic_jobs,
            "success rate",
        ));
        push_trends(&mut blocks, lines);
    }

    Post::Message { blocks }
}

fn presubmit_message(jobs: &JobsReport, rehearsals: usize, trends: Option<&Trends>) -> Post {
    let mut blocks = vec![
        Block::Divider,
        section("*Presubmit e2e/subsystem jobs*\n"),
        section(bucket_text(jobs)),
        section(format!("•\t _{rehearsals}_ rehearsal jobs triggered")),
    ];

    if let Some(trends) = trends {
        let mut lines = vec![count_line(
            trends.number_of_e2e_or_subsystem_presubmit_jobs,
            "presubmit jobs",
        )];
        lines.extend(rate_line(
            trends.success_rate_for_e2e_or_subsystem_presubmit_jobs,
            "success rate",
        ));
        lines.push(count_line(trends.number_of_rehearsal_jobs, "rehearsal jobs"));
        push_trends(&mut blocks, lines);
    }

    Post::Message { blocks }
}

fn postsubmit_message(jobs: &JobsReport, trends: Option<&Trends>) -> Post {
    let mut blocks = vec![
        Block::Divider,
        section("*Postsubmit jobs*\n"),
        section(bucket_text(jobs)),
    ];

    if let Some(trends) = trends {
        let mut lines = vec![count_line(trends.number_of_postsubmit_jobs, "postsubmit jobs")];
        lines.extend(rate_line(trends.success_rate_for_postsubmit_jobs, "success rate"));
        push_trends(&mut blocks, lines);
    }

    Post::Message { blocks }
}

fn equinix_message(
    usage: &EquinixUsageReport,
    cost: &EquinixCostReport,
    flags: FeatureFlags,
    trends: Option<&Trends>,
) -> Post {
    let mut blocks = vec![Block::Divider, section("*Equinix*")];

    if flags.equinix_usage {
        blocks.push(section(format!(
            "•\t _{}_ machine lease attempts\n \t\t *-* {SUCCESS_EMOJI} {} succeeded\n \t\t *-* {FAILURE_EMOJI} {} failed\n",
            usage.total_machines_leased,
            usage.successful_machine_leases,
            usage.unsuccessful_machine_leases
        )));
    }
    if flags.equinix_cost {
        blocks.push(section(format!(
            "•\t Total cost: *_{}_ $*",
            floor_cost(cost.total_equinix_machines_cost)
        )));
    }

    if let Some(trends) = trends {
        let mut lines = Vec::new();
        if flags.equinix_usage {
            lines.push(count_line(
                trends.total_number_of_machine_leased,
                "machine lease attempts",
            ));
            lines.push(count_line(
                trends.number_of_unsuccessful_machine_leases,
                "failed machine leases",
            ));
        }
        if flags.equinix_cost {
            lines.push(cost_line(trends.total_equinix_machines_cost));
        }
        push_trends(&mut blocks, lines);
    }

    Post::Message { blocks }
}

fn success_rate_posts(report: &Report, trends: Option<&Trends>, posts: &mut Vec<Post>) {
    let periodics = &report.periodics_report;
    if periodics.success_rate.is_some() {
        posts.push(periodic_message(periodics, trends));
        if periodics.failures > 0 {
            posts.push(Post::Chart(failing_jobs_chart(
                TOP_10_FAILED_PERIODIC_JOBS_TITLE,
                &periodics.top_10_failing,
            )));
        }
    }

    let presubmits = &report.presubmits_report;
    if presubmits.jobs.success_rate.is_some() {
        posts.push(presubmit_message(&presubmits.jobs, presubmits.rehearsals, trends));
        if presubmits.jobs.failures > 0 {
            posts.push(Post::Chart(failing_jobs_chart(
                TOP_10_FAILED_PRESUBMIT_JOBS_TITLE,
                &presubmits.jobs.top_10_failing,
            )));
        }
        posts.push(Post::Chart(triggered_jobs_chart(
            TOP_5_TRIGGERED_PRESUBMIT_JOBS_TITLE,
            &report.top_5_most_triggered_e2e_or_subsystem_jobs,
        )));
    }

    let postsubmits = &report.postsubmits_report;
    if postsubmits.success_rate.is_some() {
        posts.push(postsubmit_message(postsubmits, trends));
        if postsubmits.failures > 0 {
            posts.push(Post::Chart(failing_jobs_chart(
                TOP_10_FAILED_POSTSUBMIT_JOBS_TITLE,
                &postsubmits.top_10_failing,
            )));
        }
    }
}

/// Lays a report out as a thread of posts. Flags only decide what is shown;
/// `trends` are attached when given and the `trends` flag is on.
pub fn render(
    report: &Report,
    trends: Option<&Trends>,
    flags: FeatureFlags,
    others_threshold: f64,
) -> Vec<Post> {
    let trends = trends.filter(|_| flags.trends);
    let mut posts = vec![header_message(report)];

    if flags.success_rates {
        success_rate_posts(report, trends, &mut posts);
    }

    if flags.flakiness_rates && !report.flaky_jobs.is_empty() {
        let chart = flaky_jobs_chart(PERIODIC_FLAKY_JOBS_TITLE, &report.flaky_jobs);
        posts.push(Post::Chart(chart));
    }

    let cost = &report.equinix_cost_report;
    if (flags.equinix_usage || flags.equinix_cost) && cost.total_equinix_machines_cost > 0.0 {
        posts.push(equinix_message(&report.equinix_usage_report, cost, flags, trends));

        if flags.equinix_cost {
            posts.push(Post::Chart(expensive_jobs_chart(
                TOP_5_MOST_EXPENSIVE_JOBS_TITLE,
                &cost.top_5_most_expensive_jobs,
            )));
            posts.push(Post::Chart(pie_chart(
                COST_BY_MACHINE_TYPE_TITLE,
                machine_type_breakdown(&cost.cost_by_machine_type, others_threshold),
            )));
            posts.push(Post::Chart(pie_chart(
                COST_BY_JOB_TYPE_TITLE,
                job_type_breakdown(&cost.cost_by_job_type, others_threshold),
            )));
        }
    }

    posts
}
