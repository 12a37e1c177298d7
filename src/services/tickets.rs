//! Accessible-ticket resolution and ticket search

use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    config::TicketsConfig,
    error::AppResult,
    models::ticket::{TicketRecord, TicketSearchQuery},
    repository::TicketStore,
    tickets::{access_sources, build_search_filters, organize_ticket_families, serialize_ticket, AccessScope},
};

#[derive(Clone)]
pub struct TicketsService {
    store: Arc<dyn TicketStore>,
    restrict_when_empty: bool,
}

impl TicketsService {
    pub fn new(store: Arc<dyn TicketStore>, config: &TicketsConfig) -> Self {
        Self {
            store,
            restrict_when_empty: config.restrict_when_empty,
        }
    }

    /// Union of the tickets visible to a user through every access source
    pub async fn resolve_accessible_ticket_ids(&self, user_id: i32) -> AppResult<HashSet<i32>> {
        let ctx = self.store.access_context(user_id).await?;

        let mut ids = HashSet::new();
        for source in access_sources(&ctx) {
            ids.extend(self.store.ticket_ids_for(&source).await?);
        }

        tracing::debug!(user_id, count = ids.len(), "Resolved accessible tickets");
        Ok(ids)
    }

    /// Search the tickets a user may see, ordered as families
    pub async fn resolve_tickets(
        &self,
        user_id: i32,
        query: &TicketSearchQuery,
    ) -> AppResult<Vec<TicketRecord>> {
        let ctx = self.store.access_context(user_id).await?;

        let mut accessible = HashSet::new();
        for source in access_sources(&ctx) {
            accessible.extend(self.store.ticket_ids_for(&source).await?);
        }

        let scope = AccessScope::new(&accessible, &ctx.reporting_user_ids);
        let filter = build_search_filters(query, &scope, self.restrict_when_empty);

        let (rows, relations) = self.store.search(&filter).await?;
        let records = organize_ticket_families(rows)
            .iter()
            .map(|row| serialize_ticket(row, &relations))
            .collect();

        Ok(records)
    }
}
