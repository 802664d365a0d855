use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_AUTH_SECRET: &str = "auth-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_ADMIN_EMAILS: &str = "admin-emails";
pub const ARG_BASE_URL: &str = "base-url";

#[derive(Debug)]
pub struct Options {
    pub secret: SecretString,
    pub session_ttl_seconds: i64,
    pub admin_emails: Vec<String>,
    pub base_url: String,
}

impl Options {
    /// # Errors
    /// Returns an error if the auth secret is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret = matches
            .get_one::<String>(ARG_AUTH_SECRET)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --auth-secret")?;

        Ok(Self {
            secret,
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(crate::auth::DEFAULT_SESSION_TTL_SECONDS),
            admin_emails: matches
                .get_many::<String>(ARG_ADMIN_EMAILS)
                .map(|emails| emails.cloned().collect())
                .unwrap_or_default(),
            base_url: matches
                .get_one::<String>(ARG_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_SECRET)
                .long("auth-secret")
                .help("Server secret used to pepper password hashes")
                .env("DOCSBOX_AUTH_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_BASE_URL)
                .long("base-url")
                .help("Public base URL; https enables Secure session cookies")
                .env("DOCSBOX_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long("session-ttl-seconds")
                .help("Session TTL in seconds")
                .env("DOCSBOX_SESSION_TTL_SECONDS")
                .default_value("259200")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_ADMIN_EMAILS)
                .long("admin-emails")
                .help("Comma separated emails that sign up with the admin role")
                .env("DOCSBOX_ADMIN_EMAILS")
                .value_delimiter(','),
        )
}
