use crate::tickets::{
    Page, TicketCategory, TicketError, TicketFilter, TicketPriority, TicketStatus,
    DEFAULT_PAGE_SIZE,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Filter by status
    pub status: Option<TicketStatus>,
    /// Filter by priority
    pub priority: Option<TicketPriority>,
    /// Filter by category
    pub category: Option<TicketCategory>,
    /// Filter by assigned person
    pub assigned_to: Option<String>,
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1 to 100)
    pub page_size: Option<u32>,
}

impl ListParams {
    pub fn into_parts(self) -> Result<(TicketFilter, Page), TicketError> {
        let page = page(self.page, self.page_size)?;
        let filter = TicketFilter {
            status: self.status,
            priority: self.priority,
            category: self.category,
            assigned_to: self.assigned_to.filter(|assignee| !assignee.is_empty()),
        };
        Ok((filter, page))
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1 to 100)
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn page(&self) -> Result<Page, TicketError> {
        page(self.page, self.page_size)
    }
}

fn page(page: Option<u32>, page_size: Option<u32>) -> Result<Page, TicketError> {
    Page::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub message: String,
}
