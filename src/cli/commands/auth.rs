use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_AUTH_URL: &str = "auth-url";
pub const ARG_AUTH_API_KEY: &str = "auth-api-key";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub auth_url: Option<String>,
    pub auth_api_key: Option<SecretString>,
    pub session_ttl_seconds: u64,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if `--auth-url` is given without `--auth-api-key`.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let auth_url = non_empty(ARG_AUTH_URL);
        let auth_api_key = non_empty(ARG_AUTH_API_KEY).map(SecretString::from);
        if auth_url.is_some() && auth_api_key.is_none() {
            anyhow::bail!("missing required argument: --{ARG_AUTH_API_KEY} (required with --{ARG_AUTH_URL})");
        }

        Ok(Self {
            frontend_base_url: non_empty(ARG_FRONTEND_BASE_URL)
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            auth_url,
            auth_api_key,
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(3600),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Portal base URL, its origin is the only one allowed by CORS")
                .env("SAHAY_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_AUTH_URL)
                .long(ARG_AUTH_URL)
                .help("Hosted auth service URL, example: https://<project>.supabase.co/auth/v1")
                .long_help(
                    "Hosted auth service URL. When absent, accounts and sessions are kept in memory.",
                )
                .env("SAHAY_AUTH_URL"),
        )
        .arg(
            Arg::new(ARG_AUTH_API_KEY)
                .long(ARG_AUTH_API_KEY)
                .help("API key sent to the hosted auth service")
                .env("SAHAY_AUTH_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Access token TTL in seconds for the in-memory auth provider")
                .env("SAHAY_SESSION_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
}
