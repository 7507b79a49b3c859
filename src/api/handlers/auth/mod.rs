//! Auth endpoints under `/api/v1/auth`.
//!
//! Credentials never stop here: registration, sign-in, refresh, recovery and
//! sign-out are forwarded to the configured identity provider, and bearer
//! tokens are resolved through it on every protected request.

pub mod password;
pub mod principal;
pub mod session;
pub mod types;

pub use principal::{require_auth, Principal};

#[cfg(test)]
mod tests;
