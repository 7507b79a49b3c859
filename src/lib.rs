//! # Sahay (Employee Ticketing Portal)
//!
//! `sahay` serves the employee helpdesk portal: ticket intake and tracking, a
//! chatbot backed by a hosted language model, and an auth-gated dashboard.
//!
//! ## Authentication
//!
//! Credential verification and session issuance are delegated to a hosted auth
//! service (see [`identity::gotrue`]). The service only forwards sign-in,
//! sign-out and session calls and resolves bearer tokens into a principal.
//! Without an upstream configured, [`identity::memory`] provides the same
//! surface in-process for local development.
//!
//! ## Tickets
//!
//! Tickets are numbered `TKT-<yymmdd>-<nnnn>`, carry an SLA deadline derived
//! from their priority, and are stored in Postgres or, when no DSN is given,
//! in memory.
//!
//! ## Portal
//!
//! [`portal`] holds the client half: the route table, the route guard that
//! sends anonymous visitors of protected views to the login page, and the
//! reactive session state mirrored from auth events.

pub mod api;
pub mod chat;
pub mod cli;
pub mod identity;
pub mod portal;
pub mod tickets;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
