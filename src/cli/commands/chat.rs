use crate::chat::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_GEMINI_API_KEY: &str = "gemini-api-key";
pub const ARG_GEMINI_MODEL: &str = "gemini-model";
pub const ARG_GEMINI_BASE_URL: &str = "gemini-base-url";

/// Checked in order when `--gemini-api-key` is not given.
const FALLBACK_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug)]
pub struct Options {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let api_key = matches
            .get_one::<String>(ARG_GEMINI_API_KEY)
            .cloned()
            .or_else(|| {
                FALLBACK_KEY_VARS
                    .iter()
                    .find_map(|name| std::env::var(name).ok())
            })
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(SecretString::from);

        Self {
            api_key,
            model: matches
                .get_one::<String>(ARG_GEMINI_MODEL)
                .cloned()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: matches
                .get_one::<String>(ARG_GEMINI_BASE_URL)
                .cloned()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GEMINI_API_KEY)
                .long(ARG_GEMINI_API_KEY)
                .help("Gemini API key; falls back to GEMINI_API_KEY or GOOGLE_API_KEY")
                .long_help(
                    "Gemini API key. Falls back to GEMINI_API_KEY, then GOOGLE_API_KEY. Without a key the chat endpoints answer 503.",
                )
                .env("SAHAY_GEMINI_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GEMINI_MODEL)
                .long(ARG_GEMINI_MODEL)
                .help("Gemini model name")
                .env("SAHAY_GEMINI_MODEL")
                .default_value(DEFAULT_MODEL),
        )
        .arg(
            Arg::new(ARG_GEMINI_BASE_URL)
                .long(ARG_GEMINI_BASE_URL)
                .help("Gemini API base URL")
                .env("SAHAY_GEMINI_BASE_URL")
                .default_value(DEFAULT_BASE_URL),
        )
}
