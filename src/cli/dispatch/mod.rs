use crate::cli::{
    actions::{server::Args, Action},
    commands::{server, upstream},
};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if the upstream configuration cannot be assembled.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(server::ARG_PORT)
        .copied()
        .unwrap_or(8080);

    let upstream = upstream::parse(matches).context("invalid upstream configuration")?;
    let cookies = server::cookies(matches);

    let bulk_concurrency = matches
        .get_one::<u16>(server::ARG_BULK_CONCURRENCY)
        .map_or(crate::api::state::DEFAULT_BULK_CONCURRENCY, |v| usize::from(*v));
    let bulk_max_queries = matches
        .get_one::<u16>(server::ARG_BULK_MAX_QUERIES)
        .map_or(crate::api::state::DEFAULT_BULK_MAX_QUERIES, |v| usize::from(*v));

    let frontend_origin = matches
        .get_one::<String>(server::ARG_FRONTEND_ORIGIN)
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty());

    Ok(Action::Server(Args {
        port,
        upstream,
        cookies,
        bulk_concurrency,
        bulk_max_queries,
        frontend_origin,
    }))
}
