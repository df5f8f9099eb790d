// Data source traits and the per-subject fetch session
//
// These traits allow the engine to be used with different transports:
// - reqwest-backed implementations for production (chronicle-client)
// - in-memory implementations for examples and testing (memory module)

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;
use crate::event::EventPage;
use crate::ticket::Ticket;

/// The identity whose timeline is displayed: a contact plus an optional
/// ticket filter. Changing the subject destroys and rebuilds all engine
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub contact: Uuid,
    pub ticket: Option<Uuid>,
}

impl Subject {
    pub fn contact(contact: Uuid) -> Self {
        Self {
            contact,
            ticket: None,
        }
    }

    pub fn with_ticket(mut self, ticket: Uuid) -> Self {
        self.ticket = Some(ticket);
        self
    }
}

/// Parameters for one page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub subject: Subject,
    /// Fetch events strictly older than this microsecond cursor
    pub before: Option<i64>,
    /// Fetch events strictly newer than this microsecond cursor
    pub after: Option<i64>,
}

impl PageQuery {
    /// Initial load: no cursors, the server returns the newest page
    pub fn initial(subject: Subject) -> Self {
        Self {
            subject,
            before: None,
            after: None,
        }
    }

    /// Backward pagination bounded by a before cursor
    pub fn older(subject: Subject, before: Option<i64>) -> Self {
        Self {
            subject,
            before,
            after: None,
        }
    }

    /// Forward poll bounded by an after cursor
    pub fn newer(subject: Subject, after: Option<i64>) -> Self {
        Self {
            subject,
            before: None,
            after,
        }
    }
}

/// Trait for fetching timeline pages
///
/// Implementations return events newest-first with the server-issued
/// cursor pair; the engine handles reversal, dedup, and exhaustion.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page of events for the query
    async fn fetch_page(&self, query: &PageQuery) -> Result<EventPage>;
}

/// Trait for the ticket endpoints
#[async_trait]
pub trait TicketApi: Send + Sync {
    /// List tickets for a contact, optionally narrowed to one ticket
    async fn list_tickets(&self, contact: Uuid, ticket: Option<Uuid>) -> Result<Vec<Ticket>>;

    /// Close a ticket. Failures are surfaced to the caller, not swallowed.
    async fn close_ticket(&self, uuid: Uuid) -> Result<()>;
}

/// Owns the cancellation scope for all in-flight requests of the current
/// subject. `reset()` cancels and replaces the token wholesale; results
/// carrying a cancelled token are discarded at merge time, so a page from
/// a previous subject can never land in the new subject's timeline.
#[derive(Debug)]
pub struct FetchSession {
    token: CancellationToken,
}

impl Default for FetchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchSession {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Token handed to spawned fetch tasks
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Abort everything in flight and start a fresh scope
    pub fn reset(&mut self) {
        self.token.cancel();
        self.token = CancellationToken::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_cancels_the_old_scope_but_not_the_new_one() {
        let mut session = FetchSession::new();
        let old = session.token();
        assert!(!old.is_cancelled());

        session.reset();

        assert!(old.is_cancelled());
        assert!(!session.is_cancelled());
    }
}
