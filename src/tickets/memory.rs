//! In-process ticket store used when no database is configured and in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Page, Ticket, TicketError, TicketFilter, TicketStore, TicketSummary, TicketUpdate};

#[derive(Clone, Debug, Default)]
pub struct MemoryTicketStore {
    tickets: Arc<RwLock<HashMap<Uuid, Ticket>>>,
}

impl MemoryTicketStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; ticket number breaks ties between identical timestamps.
fn newest_first(mut tickets: Vec<Ticket>, page: Page) -> Vec<Ticket> {
    tickets.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.ticket_number.cmp(&a.ticket_number))
    });
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    tickets
        .into_iter()
        .skip(offset)
        .take(page.limit() as usize)
        .collect()
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn insert(&self, ticket: &Ticket) -> Result<(), TicketError> {
        let mut tickets = self.tickets.write().await;
        if tickets
            .values()
            .any(|existing| existing.ticket_number == ticket.ticket_number)
        {
            return Err(TicketError::DuplicateNumber(ticket.ticket_number.clone()));
        }
        tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Ticket>, TicketError> {
        Ok(self.tickets.read().await.get(&id).cloned())
    }

    async fn get_by_number(&self, ticket_number: &str) -> Result<Option<Ticket>, TicketError> {
        Ok(self
            .tickets
            .read()
            .await
            .values()
            .find(|ticket| ticket.ticket_number == ticket_number)
            .cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        update: &TicketUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, TicketError> {
        let mut tickets = self.tickets.write().await;
        Ok(tickets.get_mut(&id).map(|ticket| {
            ticket.apply(update, now);
            ticket.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, TicketError> {
        Ok(self.tickets.write().await.remove(&id).is_some())
    }

    async fn list(&self, filter: &TicketFilter, page: Page) -> Result<Vec<Ticket>, TicketError> {
        let matching = self
            .tickets
            .read()
            .await
            .values()
            .filter(|ticket| filter.matches(ticket))
            .cloned()
            .collect();
        Ok(newest_first(matching, page))
    }

    async fn search(&self, keyword: &str, page: Page) -> Result<Vec<Ticket>, TicketError> {
        let needle = keyword.to_lowercase();
        let matching = self
            .tickets
            .read()
            .await
            .values()
            .filter(|ticket| ticket.mentions(&needle))
            .cloned()
            .collect();
        Ok(newest_first(matching, page))
    }

    async fn summary(&self) -> Result<TicketSummary, TicketError> {
        let mut summary = TicketSummary::default();
        for ticket in self.tickets.read().await.values() {
            summary.record(ticket);
        }
        Ok(summary)
    }

    async fn ping(&self) -> Result<(), TicketError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::{NewTicket, TicketCategory, TicketPriority, TicketSource, TicketStatus};
    use chrono::{Duration, TimeZone};

    fn ticket(number: &str, title: &str, minutes: i64) -> Ticket {
        let base = Utc
            .with_ymd_and_hms(2025, 6, 2, 9, 0, 0)
            .single()
            .unwrap_or_default();
        let request = NewTicket {
            title: title.to_string(),
            description: "Reported through the employee portal intake form.".to_string(),
            category: TicketCategory::Software,
            priority: TicketPriority::Low,
            source: TicketSource::Manual,
            assigned_team: None,
            assigned_to: None,
            tags: Vec::new(),
            requester_email: "kiran@example.com".to_string(),
            requester_name: "Kiran".to_string(),
            department: None,
            contact_number: None,
            related_assets: None,
        };
        Ticket::open(
            request,
            number.to_string(),
            base + Duration::minutes(minutes),
        )
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_numbers() {
        let store = MemoryTicketStore::new();
        assert!(store.insert(&ticket("TKT-250602-1000", "First ticket", 0)).await.is_ok());
        let duplicate = store
            .insert(&ticket("TKT-250602-1000", "Second ticket", 1))
            .await;
        assert!(matches!(
            duplicate,
            Err(TicketError::DuplicateNumber(number)) if number == "TKT-250602-1000"
        ));
    }

    #[tokio::test]
    async fn list_is_newest_first_filtered_and_paged() -> Result<(), TicketError> {
        let store = MemoryTicketStore::new();
        for minute in 0..5 {
            let mut t = ticket(&format!("TKT-250602-100{minute}"), "Laptop slow", minute);
            if minute % 2 == 0 {
                t.status = TicketStatus::InProgress;
                t.assigned_to = Some("bob@example.com".to_string());
            }
            store.insert(&t).await?;
        }

        let all = store.list(&TicketFilter::default(), Page::default()).await?;
        let numbers: Vec<_> = all.iter().map(|t| t.ticket_number.as_str()).collect();
        assert_eq!(
            numbers,
            [
                "TKT-250602-1004",
                "TKT-250602-1003",
                "TKT-250602-1002",
                "TKT-250602-1001",
                "TKT-250602-1000"
            ]
        );

        let filter = TicketFilter {
            status: Some(TicketStatus::InProgress),
            assigned_to: Some("bob@example.com".to_string()),
            ..TicketFilter::default()
        };
        let second_page = store.list(&filter, Page::new(2, 2)?).await?;
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].ticket_number, "TKT-250602-1000");
        Ok(())
    }

    #[tokio::test]
    async fn search_matches_title_or_description() -> Result<(), TicketError> {
        let store = MemoryTicketStore::new();
        store.insert(&ticket("TKT-250602-2000", "SAP login fails", 0)).await?;
        store.insert(&ticket("TKT-250602-2001", "Monitor flickers", 1)).await?;

        let hits = store.search("sap", Page::default()).await?;
        assert_eq!(hits.len(), 1);

        let hits = store.search("PORTAL", Page::default()).await?;
        assert_eq!(hits.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn update_and_delete_missing_ticket() -> Result<(), TicketError> {
        let store = MemoryTicketStore::new();
        let missing = store
            .update(Uuid::new_v4(), &TicketUpdate::default(), Utc::now())
            .await?;
        assert!(missing.is_none());
        assert!(!store.delete(Uuid::new_v4()).await?);

        let t = ticket("TKT-250602-3000", "Keyboard missing keys", 0);
        store.insert(&t).await?;
        let update = TicketUpdate {
            assigned_team: Some("Desk-side".to_string()),
            ..TicketUpdate::default()
        };
        let updated = store.update(t.id, &update, Utc::now()).await?;
        assert_eq!(
            updated.and_then(|t| t.assigned_team).as_deref(),
            Some("Desk-side")
        );
        assert!(store.delete(t.id).await?);
        assert!(store.get(t.id).await?.is_none());
        Ok(())
    }
}
