//! Ticket domain: model, validation, numbering and storage backends.
//!
//! Ticket numbers have the form `TKT-<yymmdd>-<nnnn>` where `nnnn` is drawn
//! from `1000..=9999`. Numbers are unique per store; a collision on insert is
//! retried with a fresh draw a bounded number of times.

pub mod memory;
mod model;
pub mod postgres;
mod store;

pub use model::{
    valid_email, NewTicket, Ticket, TicketCategory, TicketPriority, TicketSource, TicketStatus,
    TicketSummary, TicketUpdate,
};
pub use store::{
    Page, SharedTicketStore, TicketFilter, TicketStore, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{instrument, warn};

const TICKET_NUMBER_ATTEMPTS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Ticket not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("ticket number {0} already exists")]
    DuplicateNumber(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Draw a ticket number for the given creation instant.
pub fn generate_ticket_number<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    format!("TKT-{}-{}", now.format("%y%m%d"), rng.gen_range(1000..=9999))
}

/// Validate an intake request, number it, and persist it.
///
/// # Errors
/// Returns `TicketError::Validation` for invalid input, or a storage error when the
/// store fails or no free ticket number was found.
#[instrument(skip_all, fields(category = %request.category, priority = %request.priority))]
pub async fn open_ticket(
    store: &dyn TicketStore,
    request: NewTicket,
) -> Result<Ticket, TicketError> {
    request.validate()?;

    let now = Utc::now();
    for attempt in 1..=TICKET_NUMBER_ATTEMPTS {
        let ticket_number = generate_ticket_number(now, &mut rand::thread_rng());
        let ticket = Ticket::open(request.clone(), ticket_number, now);

        match store.insert(&ticket).await {
            Ok(()) => return Ok(ticket),
            Err(TicketError::DuplicateNumber(number)) => {
                warn!(attempt, ticket_number = %number, "ticket number collision");
            }
            Err(err) => return Err(err),
        }
    }

    Err(TicketError::Storage(anyhow!(
        "failed to allocate a unique ticket number after {TICKET_NUMBER_ATTEMPTS} attempts"
    )))
}
