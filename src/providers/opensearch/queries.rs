use chrono::SecondsFormat;
use serde_json::{json, Map, Value};

use crate::config::{ReportConfig, Window};

/// Documents fetched per scroll page.
pub const PAGE_SIZE: usize = 1000;

fn window_range(field: &str, window: Window) -> Value {
    let bounds = json!({
        "gte": window.from.to_rfc3339_opts(SecondsFormat::Secs, true),
        "lt": window.to.to_rfc3339_opts(SecondsFormat::Secs, true),
    });

    let mut range = Map::new();
    range.insert(field.to_string(), bounds);
    json!({ "range": range })
}

fn filtered(filters: Vec<Value>) -> Value {
    json!({
        "size": PAGE_SIZE,
        "query": {
            "bool": {
                "filter": filters,
            }
        }
    })
}

/// Finished jobs started inside the window.
pub fn jobs_query(window: Window) -> Value {
    filtered(vec![
        window_range("job.start_time", window),
        json!({ "terms": { "job.state": ["success", "failure"] } }),
    ])
}

/// Packet-setup steps of jobs started inside the window, scoped to the
/// organization's allow-listed repositories.
pub fn packet_setup_steps_query(window: Window, config: &ReportConfig) -> Value {
    filtered(vec![
        window_range("job.start_time", window),
        json!({
            "wildcard": {
                "step.name": { "value": format!("*{}*", config.packet_setup_step) }
            }
        }),
        json!({ "term": { "job.refs.org": config.organization } }),
        json!({ "terms": { "job.refs.repo": config.assisted_repositories } }),
    ])
}

pub fn usages_query(window: Window) -> Value {
    filtered(vec![window_range("usage.start_date", window)])
}
