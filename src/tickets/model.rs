//! Ticket payloads shared by storage backends, handlers and `OpenAPI` generation.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::TicketError;

const TITLE_MIN_CHARS: usize = 5;
const TITLE_MAX_CHARS: usize = 200;
const DESCRIPTION_MIN_CHARS: usize = 10;

/// Declares a closed set of snake_case wire values backed by a Rust enum.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the canonical string used in API payloads and SQL writes.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = TicketError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(TicketError::Validation(format!(
                        "invalid {}: {other}",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

wire_enum! {
    /// Lifecycle state of a ticket.
    pub enum TicketStatus {
        Open => "open",
        InProgress => "in_progress",
        Resolved => "resolved",
        Closed => "closed",
        PendingCustomer => "pending_customer",
        PendingVendor => "pending_vendor",
    }
}

wire_enum! {
    pub enum TicketPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

wire_enum! {
    /// Channel the ticket was raised through.
    pub enum TicketSource {
        Chatbot => "chatbot",
        Email => "email",
        Glpi => "glpi",
        Solman => "solman",
        Manual => "manual",
        Phone => "phone",
    }
}

wire_enum! {
    pub enum TicketCategory {
        PasswordReset => "password_reset",
        VpnAccess => "vpn_access",
        Hardware => "hardware",
        Software => "software",
        Network => "network",
        EmailIssues => "email_issues",
        AccessRights => "access_rights",
        Other => "other",
    }
}

impl Default for TicketStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl Default for TicketPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl TicketStatus {
    /// Resolved and closed tickets carry a `resolved_at` timestamp.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl TicketPriority {
    /// Time allowed between intake and resolution.
    #[must_use]
    pub fn sla_window(self) -> Duration {
        match self {
            Self::Critical => Duration::hours(4),
            Self::High => Duration::hours(8),
            Self::Medium => Duration::hours(24),
            Self::Low => Duration::hours(72),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub source: TicketSource,
    pub status: TicketStatus,
    pub assigned_team: Option<String>,
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
    pub requester_email: String,
    pub requester_name: String,
    pub department: Option<String>,
    pub contact_number: Option<String>,
    pub related_assets: Option<Vec<String>>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub sla_due_date: Option<DateTime<Utc>>,
    pub ai_classification_confidence: Option<f64>,
    pub suggested_knowledge_base_articles: Vec<String>,
    pub is_self_service_resolved: bool,
    #[schema(value_type = Vec<Object>)]
    pub chat_history: Vec<serde_json::Value>,
}

impl Ticket {
    /// Build a freshly opened ticket from an intake request.
    #[must_use]
    pub fn open(request: NewTicket, ticket_number: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_number,
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            category: request.category,
            priority: request.priority,
            source: request.source,
            status: TicketStatus::Open,
            assigned_team: request.assigned_team,
            assigned_to: request.assigned_to,
            tags: request.tags,
            requester_email: request.requester_email.trim().to_lowercase(),
            requester_name: request.requester_name.trim().to_string(),
            department: request.department,
            contact_number: request.contact_number,
            related_assets: request.related_assets,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            sla_due_date: Some(now + request.priority.sla_window()),
            ai_classification_confidence: None,
            suggested_knowledge_base_articles: Vec::new(),
            is_self_service_resolved: false,
            chat_history: Vec::new(),
        }
    }

    /// Apply a partial update in place.
    ///
    /// Entering a terminal status stamps `resolved_at` once; reopening clears it.
    /// A priority change moves the SLA deadline relative to `created_at`.
    pub fn apply(&mut self, update: &TicketUpdate, now: DateTime<Utc>) {
        if let Some(status) = update.status {
            if status.is_terminal() {
                if self.resolved_at.is_none() {
                    self.resolved_at = Some(now);
                }
            } else {
                self.resolved_at = None;
            }
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
            self.sla_due_date = Some(self.created_at + priority.sla_window());
        }
        if let Some(team) = &update.assigned_team {
            self.assigned_team = Some(team.clone());
        }
        if let Some(assignee) = &update.assigned_to {
            self.assigned_to = Some(assignee.clone());
        }
        if let Some(notes) = &update.resolution_notes {
            self.resolution_notes = Some(notes.clone());
        }
        if let Some(tags) = &update.tags {
            self.tags = tags.clone();
        }
        self.updated_at = now;
    }

    /// Case-insensitive substring match on title or description.
    #[must_use]
    pub fn mentions(&self, keyword_lowercase: &str) -> bool {
        self.title.to_lowercase().contains(keyword_lowercase)
            || self.description.to_lowercase().contains(keyword_lowercase)
    }
}

/// Intake payload for `POST /api/v1/ticket`.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    #[serde(default)]
    pub priority: TicketPriority,
    pub source: TicketSource,
    pub assigned_team: Option<String>,
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub requester_email: String,
    pub requester_name: String,
    pub department: Option<String>,
    pub contact_number: Option<String>,
    pub related_assets: Option<Vec<String>>,
}

impl NewTicket {
    /// Check the field constraints the intake form promises.
    ///
    /// # Errors
    /// Returns `TicketError::Validation` describing the first offending field.
    pub fn validate(&self) -> Result<(), TicketError> {
        let title_chars = self.title.trim().chars().count();
        if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&title_chars) {
            return Err(TicketError::Validation(format!(
                "title must be between {TITLE_MIN_CHARS} and {TITLE_MAX_CHARS} characters"
            )));
        }
        if self.description.trim().chars().count() < DESCRIPTION_MIN_CHARS {
            return Err(TicketError::Validation(format!(
                "description must be at least {DESCRIPTION_MIN_CHARS} characters"
            )));
        }
        if self.requester_name.trim().is_empty() {
            return Err(TicketError::Validation(
                "requester_name must not be empty".to_string(),
            ));
        }
        if !valid_email(self.requester_email.trim()) {
            return Err(TicketError::Validation(
                "requester_email is not a valid email address".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update payload for `PUT /api/v1/ticket/{id}`; absent fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_team: Option<String>,
    pub assigned_to: Option<String>,
    pub resolution_notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TicketSummary {
    pub total_tickets: i64,
    pub open_tickets: i64,
    pub in_progress_tickets: i64,
    pub resolved_tickets: i64,
    pub high_priority_tickets: i64,
    pub critical_tickets: i64,
}

impl TicketSummary {
    /// Fold one ticket into the counters.
    pub fn record(&mut self, ticket: &Ticket) {
        self.total_tickets += 1;
        match ticket.status {
            TicketStatus::Open => self.open_tickets += 1,
            TicketStatus::InProgress => self.in_progress_tickets += 1,
            TicketStatus::Resolved => self.resolved_tickets += 1,
            _ => {}
        }
        match ticket.priority {
            TicketPriority::High => self.high_priority_tickets += 1,
            TicketPriority::Critical => self.critical_tickets += 1,
            _ => {}
        }
    }
}

/// Lightweight email sanity check.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}
