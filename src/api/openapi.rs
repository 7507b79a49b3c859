use super::handlers::{admin, auth, chat, health, tickets};
use utoipa::{
    openapi::{Contact, Info, InfoBuilder, License},
    OpenApi,
};

/// Every documented route. Add new handlers here so they appear in `/docs`.
/// `/` and `OPTIONS /health` are served but not documented.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::session::register,
        auth::session::login,
        auth::session::refresh,
        auth::session::me,
        auth::session::session,
        auth::session::logout,
        auth::password::forgot_password,
        auth::password::reset_password,
        admin::dashboard,
        tickets::create_ticket,
        tickets::list_tickets,
        tickets::get_ticket,
        tickets::get_ticket_by_number,
        tickets::update_ticket,
        tickets::delete_ticket,
        tickets::ticket_summary,
        tickets::search_tickets,
        chat::chat,
        chat::chatbot,
    ),
    tags(
        (name = "health", description = "Service and dependency status"),
        (name = "auth", description = "Sign-up, sign-in and sessions via the identity provider"),
        (name = "admin", description = "Employee dashboard"),
        (name = "tickets", description = "Helpdesk ticket intake and tracking"),
        (name = "chat", description = "SAHAY assistant"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();
    doc
}

fn cargo_info() -> Info {
    // Use Cargo.toml metadata instead of the utoipa crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();
    info
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Sahay Team"));
            assert_eq!(contact.email.as_deref(), Some("sahay-team@example.com"));
        }

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        for name in ["health", "auth", "admin", "tickets", "chat"] {
            assert!(tags.iter().any(|tag| tag.name == name), "{name}");
        }
        for path in [
            "/health",
            "/api/v1/auth/login",
            "/api/v1/auth/session",
            "/api/v1/ticket/",
            "/api/v1/ticket/{ticket_id}",
            "/api/v1/ticket/search/{keyword}",
            "/api/chat",
            "/api/v1/chatbot",
        ] {
            assert!(spec.paths.paths.contains_key(path), "{path}");
        }
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Sahay Team <sahay-team@example.com>"),
            (Some("Sahay Team"), Some("sahay-team@example.com"))
        );
        assert_eq!(parse_author("Sahay Team"), (Some("Sahay Team"), None));
        assert_eq!(parse_author("<ops@example.com>"), (None, Some("ops@example.com")));
    }
}
