use crate::domain::ticket::{SupportTicket, TicketCategory, TicketPriority, TicketStatus};
use crate::domain::ports::TicketStoreBox;
use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};

const MAX_TITLE_LEN: usize = 200;

pub struct SupportDesk {
    tickets: TicketStoreBox,
}

impl SupportDesk {
    pub fn new(tickets: TicketStoreBox) -> Self {
        Self { tickets }
    }

    /// Files a ticket with the default priority and status.
    pub async fn file_ticket(
        &self,
        user: &str,
        category: TicketCategory,
        title: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<SupportTicket> {
        let title = title.trim();
        let description = description.trim();
        if user.trim().is_empty() {
            return Err(BookingError::ValidationError("user is required".into()));
        }
        if title.is_empty() || description.is_empty() {
            return Err(BookingError::ValidationError(
                "title and description are required".into(),
            ));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(BookingError::ValidationError(format!(
                "title longer than {MAX_TITLE_LEN} characters"
            )));
        }

        let ticket = SupportTicket {
            id: self.tickets.next_id().await?,
            user: user.to_string(),
            category,
            title: title.to_string(),
            description: description.to_string(),
            priority: TicketPriority::default(),
            status: TicketStatus::default(),
            created_at: now,
        };
        self.tickets.store(ticket.clone()).await?;
        tracing::info!(ticket = ticket.id, user, category = ?category, "support ticket filed");
        Ok(ticket)
    }

    pub async fn tickets_for(&self, user: &str) -> Result<Vec<SupportTicket>> {
        self.tickets.for_user(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryTicketStore;
    use chrono::TimeZone;

    fn desk() -> SupportDesk {
        SupportDesk::new(Box::new(InMemoryTicketStore::new()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 3, 15, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_file_ticket_defaults() {
        let desk = desk();
        let ticket = desk
            .file_ticket(
                "s1",
                TicketCategory::Billing,
                "  Charged twice ",
                "Card shows two charges for lesson 7",
                now(),
            )
            .await
            .unwrap();

        assert_eq!(ticket.id, 1);
        assert_eq!(ticket.title, "Charged twice");
        assert_eq!(ticket.priority, TicketPriority::Medium);
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(desk.tickets_for("s1").await.unwrap(), vec![ticket]);
        assert!(desk.tickets_for("s2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_ticket_requires_text() {
        let desk = desk();
        let result = desk
            .file_ticket("s1", TicketCategory::Technical, "", "video froze", now())
            .await;
        assert!(matches!(result, Err(BookingError::ValidationError(_))));

        let result = desk
            .file_ticket("s1", TicketCategory::Technical, "Video", "   ", now())
            .await;
        assert!(matches!(result, Err(BookingError::ValidationError(_))));
    }
}
