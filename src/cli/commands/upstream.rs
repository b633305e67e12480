use crate::negotiate::{
    config::{
        DEFAULT_API_BASE, DEFAULT_BULK_UPDATE_PATH, DEFAULT_CHECK_USER_PATH, DEFAULT_CONSUMER,
        DEFAULT_ORDERS_SEARCH_PATH, DEFAULT_ORIGIN, DEFAULT_SEARCH_PATH, DEFAULT_SEND_OTP_PATH,
        DEFAULT_TIMEOUT_SECONDS, DEFAULT_UPDATE_STATUS_PATH, DEFAULT_VERIFY_OTP_PATH,
    },
    UpstreamConfig, UpstreamPaths,
};
use anyhow::{Context, Result};
use clap::{builder::BoolishValueParser, Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_API_BASE: &str = "api-base";
pub const ARG_CHECK_USER_PATH: &str = "check-user-path";
pub const ARG_SEND_OTP_PATH: &str = "send-otp-path";
pub const ARG_VERIFY_OTP_PATH: &str = "verify-otp-path";
pub const ARG_SEARCH_PATH: &str = "search-path";
pub const ARG_SEARCH_ORDER_PATH: &str = "search-order-path";
pub const ARG_SEARCH_PASSPORT_PATH: &str = "search-passport-path";
pub const ARG_BULK_UPDATE_PATH: &str = "bulk-update-path";
pub const ARG_UPDATE_STATUS_PATH: &str = "update-status-path";
pub const ARG_CONSUMER: &str = "consumer";
pub const ARG_DEFAULT_RETRY: &str = "default-retry";
pub const ARG_ORIGIN: &str = "origin";
pub const ARG_API_BEARER: &str = "api-bearer";
pub const ARG_API_KEY_HEADER: &str = "api-key-header";
pub const ARG_API_KEY: &str = "api-key";
pub const ARG_UPSTREAM_TIMEOUT: &str = "upstream-timeout-seconds";

// (id, env, default, help) for every per-operation path.
const PATH_ARGS: [(&str, &str, &str, &str); 8] = [
    (
        ARG_CHECK_USER_PATH,
        "SMV_CHECK_USER_PATH",
        DEFAULT_CHECK_USER_PATH,
        "Upstream path for check-user",
    ),
    (
        ARG_SEND_OTP_PATH,
        "SMV_SEND_OTP_PATH",
        DEFAULT_SEND_OTP_PATH,
        "Upstream path for send-otp",
    ),
    (
        ARG_VERIFY_OTP_PATH,
        "SMV_VERIFY_OTP_PATH",
        DEFAULT_VERIFY_OTP_PATH,
        "Upstream path for verify-otp",
    ),
    (
        ARG_SEARCH_PATH,
        "SMV_SEARCH_PATH",
        DEFAULT_SEARCH_PATH,
        "Upstream path for free-text search",
    ),
    (
        ARG_SEARCH_ORDER_PATH,
        "SMV_SEARCH_ORDER_PATH",
        DEFAULT_ORDERS_SEARCH_PATH,
        "Upstream path for order search",
    ),
    (
        ARG_SEARCH_PASSPORT_PATH,
        "SMV_SEARCH_PASSPORT_PATH",
        DEFAULT_ORDERS_SEARCH_PATH,
        "Upstream path for passport search",
    ),
    (
        ARG_BULK_UPDATE_PATH,
        "SMV_BULK_UPDATE_PATH",
        DEFAULT_BULK_UPDATE_PATH,
        "Upstream path for bulk status update",
    ),
    (
        ARG_UPDATE_STATUS_PATH,
        "SMV_UPDATE_STATUS_PATH",
        DEFAULT_UPDATE_STATUS_PATH,
        "Upstream path for single status update",
    ),
];

/// Build the upstream configuration from parsed arguments.
///
/// # Errors
/// Returns an error if a defaulted argument is somehow absent.
pub fn parse(matches: &ArgMatches) -> Result<UpstreamConfig> {
    let read = |id: &str| -> Result<String> {
        matches
            .get_one::<String>(id)
            .cloned()
            .with_context(|| format!("missing required argument: --{id}"))
    };
    let secret = |id: &str| {
        matches
            .get_one::<String>(id)
            .filter(|value| !value.trim().is_empty())
            .map(|value| SecretString::from(value.clone()))
    };

    let paths = UpstreamPaths {
        check_user: read(ARG_CHECK_USER_PATH)?,
        send_otp: read(ARG_SEND_OTP_PATH)?,
        verify_otp: read(ARG_VERIFY_OTP_PATH)?,
        search: read(ARG_SEARCH_PATH)?,
        search_order: read(ARG_SEARCH_ORDER_PATH)?,
        search_passport: read(ARG_SEARCH_PASSPORT_PATH)?,
        bulk_update: read(ARG_BULK_UPDATE_PATH)?,
        update_status: read(ARG_UPDATE_STATUS_PATH)?,
    };

    let api_key = matches
        .get_one::<String>(ARG_API_KEY_HEADER)
        .filter(|header| !header.trim().is_empty())
        .and_then(|header| secret(ARG_API_KEY).map(|key| (header.trim().to_string(), key)));

    let timeout = matches
        .get_one::<u64>(ARG_UPSTREAM_TIMEOUT)
        .copied()
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

    Ok(UpstreamConfig::new(read(ARG_API_BASE)?)
        .with_paths(paths)
        .with_consumer(read(ARG_CONSUMER)?)
        .with_default_retry(
            matches
                .get_one::<bool>(ARG_DEFAULT_RETRY)
                .copied()
                .unwrap_or(true),
        )
        .with_origin(read(ARG_ORIGIN)?)
        .with_api_bearer(secret(ARG_API_BEARER))
        .with_api_key(api_key)
        .with_timeout(Duration::from_secs(timeout)))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = command
        .arg(
            Arg::new(ARG_API_BASE)
                .long(ARG_API_BASE)
                .help("Upstream API base URL")
                .env("SMV_API_BASE")
                .default_value(DEFAULT_API_BASE),
        )
        .arg(
            Arg::new(ARG_CONSUMER)
                .long(ARG_CONSUMER)
                .help("Consumer identifier sent in OTP bodies and the x-consumer header")
                .env("SMV_CONSUMER")
                .default_value(DEFAULT_CONSUMER),
        )
        .arg(
            Arg::new(ARG_DEFAULT_RETRY)
                .long(ARG_DEFAULT_RETRY)
                .help("Value of the retry flag sent with send-otp")
                .env("SMV_DEFAULT_RETRY")
                .default_value("true")
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_ORIGIN)
                .long(ARG_ORIGIN)
                .help("Origin/Referer presented upstream when the browser sends none")
                .env("SMV_ORIGIN")
                .default_value(DEFAULT_ORIGIN),
        )
        .arg(
            Arg::new(ARG_API_BEARER)
                .long(ARG_API_BEARER)
                .help("Service bearer used when the caller has no session token")
                .env("SMV_API_BEARER")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_API_KEY_HEADER)
                .long(ARG_API_KEY_HEADER)
                .help("Header name carrying the upstream API key")
                .env("SMV_API_KEY_HEADER"),
        )
        .arg(
            Arg::new(ARG_API_KEY)
                .long(ARG_API_KEY)
                .help("Upstream API key")
                .env("SMV_API_KEY")
                .hide_env_values(true)
                .requires(ARG_API_KEY_HEADER),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_TIMEOUT)
                .long(ARG_UPSTREAM_TIMEOUT)
                .help("Per-attempt upstream timeout in seconds")
                .env("SMV_UPSTREAM_TIMEOUT_SECONDS")
                .default_value("15")
                .value_parser(clap::value_parser!(u64).range(1..)),
        );

    PATH_ARGS
        .into_iter()
        .fold(command, |command, (id, env, default, help)| {
            command.arg(
                Arg::new(id)
                    .long(id)
                    .help(help)
                    .env(env)
                    .default_value(default),
            )
        })
}
