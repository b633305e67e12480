use crate::negotiate::SessionCookies;
use clap::{builder::BoolishValueParser, Arg, ArgMatches, Command};

pub const ARG_PORT: &str = "port";
pub const ARG_SESSION_TTL: &str = "session-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_BULK_CONCURRENCY: &str = "bulk-concurrency";
pub const ARG_BULK_MAX_QUERIES: &str = "bulk-max-queries";
pub const ARG_FRONTEND_ORIGIN: &str = "frontend-origin";

/// Cookie attributes for the browser session.
#[must_use]
pub fn cookies(matches: &ArgMatches) -> SessionCookies {
    let ttl = matches
        .get_one::<i64>(ARG_SESSION_TTL)
        .copied()
        .unwrap_or(crate::negotiate::relay::DEFAULT_SESSION_TTL_SECONDS);
    let secure = matches
        .get_one::<bool>(ARG_COOKIE_SECURE)
        .copied()
        .unwrap_or(true);
    SessionCookies::new(ttl, secure)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("SMV_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Lifetime of the session cookies in seconds")
                .default_value("28800")
                .env("SMV_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark session cookies Secure (disable only for plain-http development)")
                .default_value("true")
                .env("SMV_COOKIE_SECURE")
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_BULK_CONCURRENCY)
                .long(ARG_BULK_CONCURRENCY)
                .help("Maximum concurrent upstream searches per bulk-search request")
                .default_value("4")
                .env("SMV_BULK_CONCURRENCY")
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new(ARG_BULK_MAX_QUERIES)
                .long(ARG_BULK_MAX_QUERIES)
                .help("Maximum number of queries accepted by bulk-search")
                .default_value("200")
                .env("SMV_BULK_MAX_QUERIES")
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new(ARG_FRONTEND_ORIGIN)
                .long(ARG_FRONTEND_ORIGIN)
                .help("Dashboard origin allowed by CORS (omit for same-origin deployments)")
                .env("SMV_FRONTEND_ORIGIN"),
        )
}
