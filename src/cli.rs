use anyhow::Result;
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;

use crate::auth::Credentials;
use crate::config::{FeatureFlags, ReportConfig, ReportInterval};
use crate::presentation::render;
use crate::providers::fixture::FixtureQuerier;
use crate::providers::opensearch::{Indices, OpenSearchQuerier};
use crate::providers::Querier;
use crate::report::Reporter;
use crate::sink::{JsonSink, ReportDocument, Sink};
use crate::trends::detect_trends;

#[derive(Parser)]
#[command(name = "prowreport")]
#[command(author, version, about = "Prow CI report aggregator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the report from an OpenSearch cluster
    Opensearch {
        /// OpenSearch URL
        #[arg(short, long, env = "ES_URL")]
        url: String,

        #[arg(long, env = "ES_USER")]
        user: Option<String>,

        #[arg(long, env = "ES_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Base name of the job event indices
        #[arg(long, env = "ES_JOB_INDEX", default_value = "jobs")]
        job_index: String,

        /// Base name of the step event indices
        #[arg(long, env = "ES_STEP_INDEX", default_value = "steps")]
        step_index: String,

        /// Base name of the usage event indices
        #[arg(long, env = "ES_USAGE_INDEX", default_value = "usages")]
        usage_index: String,

        #[command(flatten)]
        report: ReportArgs,
    },
    /// Build the report from a JSON dump of the indices
    Fixture {
        /// Path to a `{jobs, steps, usages}` JSON file
        path: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },
}

#[derive(Args)]
struct ReportArgs {
    /// Length of the reported period
    #[arg(
        short,
        long,
        value_enum,
        env = "REPORT_INTERVAL",
        default_value = "week"
    )]
    interval: ReportInterval,

    /// Channel the rendered messages are addressed to
    #[arg(long, env = "SLACK_CHANNEL_ID")]
    channel: Option<String>,

    /// JSON file overriding report settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, env = "FEATURE_FLAG_SUCCESS_RATES", default_value_t = true, action = ArgAction::Set)]
    success_rates: bool,

    #[arg(long, env = "FEATURE_FLAG_EQUINIX_USAGE", default_value_t = true, action = ArgAction::Set)]
    equinix_usage: bool,

    #[arg(long, env = "FEATURE_FLAG_EQUINIX_COST", default_value_t = true, action = ArgAction::Set)]
    equinix_cost: bool,

    /// Compare against the previous period
    #[arg(long, env = "FEATURE_FLAG_TRENDS", default_value_t = true, action = ArgAction::Set)]
    trends: bool,

    #[arg(long, env = "FEATURE_FLAG_FLAKINESS_RATES", default_value_t = true, action = ArgAction::Set)]
    flakiness_rates: bool,
}

impl ReportArgs {
    fn report_config(&self) -> Result<ReportConfig> {
        match &self.config {
            Some(path) => {
                info!("Loading report settings from {}", path.display());
                Ok(ReportConfig::load(path)?)
            }
            None => Ok(ReportConfig::default()),
        }
    }

    fn feature_flags(&self) -> FeatureFlags {
        FeatureFlags {
            success_rates: self.success_rates,
            equinix_usage: self.equinix_usage,
            equinix_cost: self.equinix_cost,
            trends: self.trends,
            flakiness_rates: self.flakiness_rates,
        }
    }
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Opensearch {
                url,
                user,
                password,
                job_index,
                step_index,
                usage_index,
                report,
            } => {
                info!("Collecting Prow events from OpenSearch at {url}");

                let config = report.report_config()?;
                let credentials = Credentials::from_parts(user.as_deref(), password.as_deref());
                if credentials.is_none() {
                    warn!("No OpenSearch credentials given, querying anonymously");
                }

                let indices = Indices {
                    jobs: job_index.clone(),
                    steps: step_index.clone(),
                    usages: usage_index.clone(),
                };
                let querier = OpenSearchQuerier::new(url, credentials, indices, config.clone())?;
                self.run(querier, config, report).await
            }
            Commands::Fixture { path, report } => {
                info!("Collecting Prow events from {}", path.display());

                let config = report.report_config()?;
                let querier = FixtureQuerier::load(path, config.clone())?;
                self.run(querier, config, report).await
            }
        }
    }

    async fn run<Q: Querier>(
        &self,
        querier: Q,
        config: ReportConfig,
        args: &ReportArgs,
    ) -> Result<()> {
        let flags = args.feature_flags();
        let others_threshold = config.others_threshold;
        let now = Utc::now();
        let reporter = Reporter::new(querier, config);

        let (report, trends) = if flags.trends {
            let (current, previous) = tokio::join!(
                reporter.get_report(args.interval.current(now)),
                reporter.get_report(args.interval.previous(now)),
            );
            let (current, previous) = (current?, previous?);
            let trends = detect_trends(&previous, &current);
            (current, Some(trends))
        } else {
            (reporter.get_report(args.interval.current(now)).await?, None)
        };

        let messages = render(&report, trends.as_ref(), flags, others_threshold);
        info!("Rendered {} posts", messages.len());

        let document = ReportDocument::new(
            args.channel.as_deref(),
            flags,
            &report,
            trends.as_ref(),
            &messages,
        );
        JsonSink::new(self.output.clone(), self.pretty).publish(&document)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_flags_default_on_and_can_be_disabled() {
        let cli = Cli::try_parse_from([
            "prowreport",
            "fixture",
            "dump.json",
            "--trends",
            "false",
            "--interval",
            "month",
        ])
        .unwrap();

        let Commands::Fixture { path, report } = &cli.command else {
            panic!("expected fixture command");
        };
        assert_eq!(path, &PathBuf::from("dump.json"));
        assert_eq!(report.interval, ReportInterval::Month);

        let flags = report.feature_flags();
        assert!(!flags.trends);
        assert!(flags.success_rates && flags.equinix_usage);
        assert!(flags.equinix_cost && flags.flakiness_rates);
    }

    #[test]
    fn test_opensearch_index_defaults() {
        let cli = Cli::try_parse_from([
            "prowreport",
            "opensearch",
            "--url",
            "http://localhost:9200",
        ])
        .unwrap();

        let Commands::Opensearch { url, job_index, .. } = &cli.command else {
            panic!("expected opensearch command");
        };
        assert_eq!(url, "http://localhost:9200");
        assert_eq!(job_index, "jobs");
    }

    #[tokio::test]
    async fn test_fixture_run_writes_document() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("prowreport-cli-in-{}.json", std::process::id()));
        let output = dir.join(format!("prowreport-cli-out-{}.json", std::process::id()));
        std::fs::write(&input, r#"{"jobs": [], "steps": [], "usages": []}"#).unwrap();

        let cli = Cli::try_parse_from([
            "prowreport",
            "fixture",
            input.to_str().unwrap(),
            "--channel",
            "C012AB3CD",
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap();
        cli.execute().await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        std::fs::remove_file(&input).unwrap();
        std::fs::remove_file(&output).unwrap();

        assert_eq!(written["channel"], "C012AB3CD");
        assert_eq!(written["trends"]["number_of_postsubmit_jobs"], 0);
        assert_eq!(written["messages"].as_array().unwrap().len(), 1);
    }
}
