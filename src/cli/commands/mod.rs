pub mod auth;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_CORS_ORIGINS: &str = "cors-origins";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("docsbox")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("DOCSBOX_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .long_help(
                    "Postgres connection string. When omitted, an in-memory store seeded with demo posts is used.",
                )
                .env("DOCSBOX_DSN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .short('e')
                .long("environment")
                .help("Runtime mode; production hides stack traces in error responses")
                .env("DOCSBOX_ENV")
                .default_value("development")
                .value_parser(["development", "test", "production"]),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGINS)
                .long("cors-origins")
                .help("Comma separated list of allowed CORS origins")
                .env("DOCSBOX_CORS_ORIGINS")
                .default_value("http://localhost:3000")
                .value_delimiter(','),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}
