use crate::{
    api::{self, Services},
    chat::{gemini::GeminiModel, Assistant},
    cli::telemetry,
    identity::{gotrue::GoTrueProvider, memory::MemoryProvider, SharedIdentityProvider},
    tickets::{memory::MemoryTicketStore, postgres::PgTicketStore, SharedTicketStore},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub frontend_base_url: String,
    pub auth_url: Option<String>,
    pub auth_api_key: Option<SecretString>,
    pub session_ttl_seconds: u64,
    pub gemini_api_key: Option<SecretString>,
    pub gemini_model: String,
    pub gemini_base_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a backend cannot be configured or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let services = Services {
        tickets: ticket_store(args.dsn.as_deref()).await?,
        identity: identity_provider(&args)?,
        assistant: Arc::new(assistant(&args)?),
    };

    let result = api::new(args.port, services, &args.frontend_base_url).await;
    telemetry::shutdown_tracer();
    result
}

async fn ticket_store(dsn: Option<&str>) -> Result<SharedTicketStore> {
    let Some(dsn) = dsn else {
        warn!("No DSN configured, tickets are kept in memory");
        return Ok(Arc::new(MemoryTicketStore::new()));
    };

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    let store = PgTicketStore::new(pool);
    store
        .ensure_schema()
        .await
        .context("Failed to apply ticket schema")?;
    Ok(Arc::new(store))
}

fn identity_provider(args: &Args) -> Result<SharedIdentityProvider> {
    match (&args.auth_url, &args.auth_api_key) {
        (Some(url), Some(key)) => Ok(Arc::new(
            GoTrueProvider::new(url, key.clone()).context("Invalid auth service configuration")?,
        )),
        _ => {
            warn!("No auth service configured, accounts are kept in memory");
            Ok(Arc::new(MemoryProvider::new(Duration::from_secs(
                args.session_ttl_seconds,
            ))))
        }
    }
}

fn assistant(args: &Args) -> Result<Assistant> {
    let Some(key) = &args.gemini_api_key else {
        warn!("No Gemini API key configured, chat endpoints will answer 503");
        return Ok(Assistant::unconfigured());
    };
    let model = GeminiModel::new(&args.gemini_base_url, &args.gemini_model, key.clone())
        .context("Invalid Gemini configuration")?;
    Ok(Assistant::new(Arc::new(model)))
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "dsn",
            args.dsn
                .as_deref()
                .map_or_else(|| "none (memory)".to_string(), redact_dsn),
        ),
        ("frontend_base_url", args.frontend_base_url.clone()),
        (
            "auth_url",
            args.auth_url
                .clone()
                .unwrap_or_else(|| "none (memory)".to_string()),
        ),
        ("auth_api_key_set", args.auth_api_key.is_some().to_string()),
        ("session_ttl_seconds", args.session_ttl_seconds.to_string()),
        ("gemini_model", args.gemini_model.clone()),
        ("gemini_api_key_set", args.gemini_api_key.is_some().to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "sahay {} - {}\n\n{title}:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
