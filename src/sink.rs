use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::config::FeatureFlags;
use crate::error::Result;
use crate::presentation::Post;
use crate::report::Report;
use crate::trends::Trends;

/// Everything a consumer needs to publish one report run.
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub channel: Option<&'a str>,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub feature_flags: FeatureFlags,
    pub report: &'a Report,
    pub trends: Option<&'a Trends>,
    pub messages: &'a [Post],
}

impl<'a> ReportDocument<'a> {
    pub fn new(
        channel: Option<&'a str>,
        feature_flags: FeatureFlags,
        report: &'a Report,
        trends: Option<&'a Trends>,
        messages: &'a [Post],
    ) -> Self {
        Self {
            channel,
            from_date: report.from_date,
            to_date: report.to_date,
            feature_flags,
            report,
            trends,
            messages,
        }
    }
}

pub trait Sink {
    fn publish(&self, document: &ReportDocument<'_>) -> Result<()>;
}

/// Writes the document as JSON to a file, or stdout when no path is set.
pub struct JsonSink {
    output: Option<PathBuf>,
    pretty: bool,
}

impl JsonSink {
    pub fn new(output: Option<PathBuf>, pretty: bool) -> Self {
        Self { output, pretty }
    }

    fn render(&self, document: &ReportDocument<'_>) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(document)?
        } else {
            serde_json::to_string(document)?
        };
        Ok(json)
    }
}

impl Sink for JsonSink {
    fn publish(&self, document: &ReportDocument<'_>) -> Result<()> {
        let json = self.render(document)?;

        if let Some(path) = &self.output {
            std::fs::write(path, json)?;
            info!("Report written to: {}", path.display());
        } else {
            println!("{json}");
        }

        Ok(())
    }
}
