use crate::{
    api::{self, state::AppState},
    cli::telemetry,
    negotiate::{SessionCookies, UpstreamCaller, UpstreamConfig},
};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub upstream: UpstreamConfig,
    pub cookies: SessionCookies,
    pub bulk_concurrency: usize,
    pub bulk_max_queries: usize,
    pub frontend_origin: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the HTTP client cannot be built or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    info!("{}", startup_summary(&args));

    let caller = UpstreamCaller::new(args.upstream).context("failed to build upstream client")?;
    let state = AppState::new(caller, args.cookies)
        .with_bulk_concurrency(args.bulk_concurrency)
        .with_bulk_max_queries(args.bulk_max_queries);

    let result = api::new(args.port, state, args.frontend_origin.as_deref()).await;

    telemetry::shutdown_tracer();

    result
}

fn startup_summary(args: &Args) -> String {
    let upstream = &args.upstream;
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("api_base", upstream.base_url().to_string()),
        ("origin", upstream.origin().to_string()),
        ("consumer", upstream.consumer().to_string()),
        ("timeout", format!("{}s", upstream.timeout().as_secs())),
        ("api_bearer_set", upstream.api_bearer().is_some().to_string()),
        (
            "api_key_header",
            upstream
                .api_key()
                .map_or_else(|| "none".to_string(), |(header, _)| header.to_string()),
        ),
        ("cookie_secure", args.cookies.secure().to_string()),
        ("session_ttl", format!("{}s", args.cookies.ttl_seconds())),
        ("bulk_concurrency", args.bulk_concurrency.to_string()),
        (
            "frontend_origin",
            args.frontend_origin
                .clone()
                .unwrap_or_else(|| "same-origin".to_string()),
        ),
    ];

    let width = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} ({})\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let _ = write!(message, "\n  {key:<width$} {value}");
    }
    message
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
