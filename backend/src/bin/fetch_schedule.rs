//! Fetch the published schedule page and emit or push the extracted snapshot.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::io;
use std::time::Duration;

use clap::Parser;
use mockable::{Clock, DefaultClock};
use reqwest::Url;
use schedule_watch::domain::{
    ScheduleExtractor, ScheduleFormat, ScheduleValidationError, fetch_snapshot,
};
use schedule_watch::inbound::http::schedule::ScheduleSnapshotPayload;
use schedule_watch::outbound::schedule_page::HttpSchedulePageSource;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `fetch-schedule` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fetch-schedule",
    about = "Extract the outage schedule table and print it or post it to a running server",
    version
)]
struct CliArgs {
    /// Page carrying the schedule table.
    #[arg(long = "page", value_name = "url", env = "SCHEDULE_WATCH_SCHEDULE_PAGE_URL")]
    page: Url,
    /// `/update` endpoint of a running server; the snapshot is printed when omitted.
    #[arg(long = "endpoint", value_name = "url", env = "SCHEDULE_WATCH_UPDATE_ENDPOINT")]
    endpoint: Option<Url>,
    /// Request timeout in seconds for both the fetch and the push.
    #[arg(long = "timeout-secs", value_name = "seconds", default_value_t = 30)]
    timeout_secs: u64,
    /// `chrono` format of the dates in the first column.
    #[arg(
        long = "date-format",
        value_name = "format",
        default_value = "%d.%m.%Y",
        value_parser = parse_date_format
    )]
    date_format: String,
    /// Character joining windows in the emitted payload.
    #[arg(long = "separator", value_name = "char", default_value_t = ';')]
    separator: char,
}

fn parse_date_format(raw: &str) -> Result<String, ScheduleValidationError> {
    ScheduleFormat::validate_date_format(raw)?;
    Ok(raw.to_owned())
}

impl CliArgs {
    fn schedule_format(&self) -> ScheduleFormat {
        ScheduleFormat {
            date_format: self.date_format.clone(),
            separator: self.separator,
            ..ScheduleFormat::default()
        }
    }
}

fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let timeout = Duration::from_secs(args.timeout_secs);
    let format = args.schedule_format();

    let source = HttpSchedulePageSource::new(args.page.clone(), timeout)
        .map_err(|error| io::Error::other(format!("create page client: {error}")))?;
    let extractor = ScheduleExtractor::new(format);
    let snapshot = fetch_snapshot(&source, &extractor, DefaultClock.utc())
        .await
        .map_err(|error| io::Error::other(format!("extract schedule: {error}")))?;
    info!(queues = snapshot.queues.len(), "schedule extracted");

    let payload = ScheduleSnapshotPayload::from_snapshot(&snapshot, args.separator);
    match args.endpoint {
        Some(endpoint) => push_snapshot(endpoint, &payload, timeout).await,
        None => {
            let rendered = serde_json::to_string_pretty(&payload)
                .map_err(|error| io::Error::other(format!("encode snapshot: {error}")))?;
            println!("{rendered}");
            Ok(())
        }
    }
}

async fn push_snapshot(
    endpoint: Url,
    payload: &ScheduleSnapshotPayload,
    timeout: Duration,
) -> io::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| io::Error::other(format!("create push client: {error}")))?;
    let response = client
        .post(endpoint)
        .json(payload)
        .send()
        .await
        .map_err(|error| io::Error::other(format!("post snapshot: {error}")))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|error| io::Error::other(format!("read server response: {error}")))?;
    if !status.is_success() {
        return Err(io::Error::other(format!(
            "server rejected snapshot with status {}: {body}",
            status.as_u16()
        )));
    }
    println!("{body}");
    Ok(())
}
