//! Maps parsed CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, chat, ARG_DSN, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if arguments are inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8000);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .map(|dsn| dsn.trim().to_string())
        .filter(|dsn| !dsn.is_empty());

    let auth_opts = auth::Options::parse(matches)?;
    let chat_opts = chat::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: auth_opts.frontend_base_url,
        auth_url: auth_opts.auth_url,
        auth_api_key: auth_opts.auth_api_key,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        gemini_api_key: chat_opts.api_key,
        gemini_model: chat_opts.model,
        gemini_base_url: chat_opts.base_url,
    }))
}
