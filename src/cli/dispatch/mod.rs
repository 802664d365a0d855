//! Map validated CLI matches to the action the binary executes.

use crate::{
    api::RuntimeMode,
    cli::{
        actions::{server::Args, Action},
        commands::{self, auth},
    },
};
use anyhow::{anyhow, Result};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);
    let dsn = matches.get_one::<String>(commands::ARG_DSN).cloned();

    let environment = matches
        .get_one::<String>(commands::ARG_ENVIRONMENT)
        .map_or(Ok(RuntimeMode::default()), |value| {
            value.parse::<RuntimeMode>().map_err(|err| anyhow!(err))
        })?;

    let cors_origins = matches
        .get_many::<String>(commands::ARG_CORS_ORIGINS)
        .map(|origins| {
            origins
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        environment,
        cors_origins,
        base_url: auth_opts.base_url,
        auth_secret: auth_opts.secret,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        admin_emails: auth_opts.admin_emails,
    }))
}
