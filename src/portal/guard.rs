//! Navigation guard for protected views. This is a UX redirect only; the API
//! enforces access on its own.

use super::{
    routes::{RouteTable, LOGIN_PATH},
    AuthSession, ClientError,
};
use async_trait::async_trait;
use tracing::error;

/// Anything that can report the current session.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn get_session(&self) -> Result<Option<AuthSession>, ClientError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(String),
}

/// Decide whether navigation to `to` may proceed. The session is only fetched
/// for routes that require auth.
pub async fn before_each(table: &RouteTable, to: &str, sessions: &dyn SessionSource) -> Navigation {
    let Some(route) = table.resolve(to) else {
        return Navigation::Proceed;
    };
    if !route.requires_auth {
        return Navigation::Proceed;
    }

    match sessions.get_session().await {
        Ok(Some(_)) => Navigation::Proceed,
        Ok(None) => Navigation::Redirect(LOGIN_PATH.to_string()),
        Err(err) => {
            error!("failed to fetch session for {}: {err}", route.path);
            Navigation::Redirect(LOGIN_PATH.to_string())
        }
    }
}
