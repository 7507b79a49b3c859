//! Storage seam for tickets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    Ticket, TicketCategory, TicketError, TicketPriority, TicketStatus, TicketSummary, TicketUpdate,
};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

pub type SharedTicketStore = Arc<dyn TicketStore>;

/// Equality filters for listing; `None` fields do not constrain the result.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub assigned_to: Option<String>,
}

impl TicketFilter {
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.map_or(true, |status| ticket.status == status)
            && self
                .priority
                .map_or(true, |priority| ticket.priority == priority)
            && self
                .category
                .map_or(true, |category| ticket.category == category)
            && self
                .assigned_to
                .as_deref()
                .map_or(true, |assignee| ticket.assigned_to.as_deref() == Some(assignee))
    }
}

/// One-based page window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    page: u32,
    page_size: u32,
}

impl Page {
    /// Build a page window.
    ///
    /// # Errors
    /// Returns `TicketError::Validation` when `page` is zero or `page_size` is outside `1..=100`.
    pub fn new(page: u32, page_size: u32) -> Result<Self, TicketError> {
        if page == 0 {
            return Err(TicketError::Validation(
                "page must be greater than or equal to 1".to_string(),
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(TicketError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page, page_size })
    }

    #[must_use]
    pub const fn limit(self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Persistence for tickets. Listing and search return newest tickets first.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Persist a new ticket; a taken ticket number yields `TicketError::DuplicateNumber`.
    async fn insert(&self, ticket: &Ticket) -> Result<(), TicketError>;

    async fn get(&self, id: Uuid) -> Result<Option<Ticket>, TicketError>;

    async fn get_by_number(&self, ticket_number: &str) -> Result<Option<Ticket>, TicketError>;

    /// Apply a partial update, returning `None` when the ticket does not exist.
    async fn update(
        &self,
        id: Uuid,
        update: &TicketUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, TicketError>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, TicketError>;

    async fn list(&self, filter: &TicketFilter, page: Page) -> Result<Vec<Ticket>, TicketError>;

    /// Case-insensitive keyword search over title and description.
    async fn search(&self, keyword: &str, page: Page) -> Result<Vec<Ticket>, TicketError>;

    async fn summary(&self) -> Result<TicketSummary, TicketError>;

    /// Cheap reachability check for the health endpoint.
    async fn ping(&self) -> Result<(), TicketError>;

    /// Short backend label reported by `/health`.
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds() {
        assert!(Page::new(0, 10).is_err());
        assert!(Page::new(1, 0).is_err());
        assert!(Page::new(1, 101).is_err());
        assert!(Page::new(1, 100).is_ok());

        let page = Page::new(3, 20);
        assert_eq!(page.ok().map(Page::offset), Some(40));
        assert_eq!(Page::default().limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(Page::default().offset(), 0);
    }
}
