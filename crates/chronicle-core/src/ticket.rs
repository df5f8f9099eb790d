// Ticket entities and the per-subject ticket cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Ticket lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

/// A support ticket associated with the contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub uuid: Uuid,
    pub status: TicketStatus,
    pub opened_on: DateTime<Utc>,
    #[serde(default)]
    pub closed_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee: Option<String>,
}

impl Ticket {
    pub fn is_open(&self) -> bool {
        self.status == TicketStatus::Open
    }
}

/// Cache lifecycle per subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Loading,
    Populated,
}

/// Holds the tickets associated with the current subject
///
/// Refreshes merge additively: closed tickets are pruned from sticky
/// display by the caller but stay in the cache so historical "ticket
/// opened" markers can still be rendered. A subject change resets the
/// cache entirely.
#[derive(Debug)]
pub struct TicketCache {
    state: CacheState,
    tickets: HashMap<Uuid, Ticket>,
}

impl Default for TicketCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketCache {
    pub fn new() -> Self {
        Self {
            state: CacheState::Empty,
            tickets: HashMap::new(),
        }
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Ticket> {
        self.tickets.get(&uuid)
    }

    pub fn tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.values()
    }

    /// Uuids of all currently open tickets, the sticky eligibility set
    pub fn open_tickets(&self) -> HashSet<Uuid> {
        self.tickets
            .values()
            .filter(|t| t.is_open())
            .map(|t| t.uuid)
            .collect()
    }

    /// Full reset on subject change
    pub fn reset(&mut self) {
        self.state = CacheState::Empty;
        self.tickets.clear();
    }

    /// Mark a refresh in flight
    pub fn begin_refresh(&mut self) {
        self.state = CacheState::Loading;
    }

    /// A refresh failed; fall back to whatever we already had
    pub fn refresh_failed(&mut self) {
        self.state = if self.tickets.is_empty() {
            CacheState::Empty
        } else {
            CacheState::Populated
        };
    }

    /// Merge a refreshed ticket list additively. Returns the uuids of
    /// tickets that transitioned open → closed in this refresh, so the
    /// caller can forcibly unpin them.
    pub fn apply(&mut self, refreshed: Vec<Ticket>) -> Vec<Uuid> {
        let mut newly_closed = Vec::new();
        for ticket in refreshed {
            let was_open = self
                .tickets
                .get(&ticket.uuid)
                .map(|t| t.is_open())
                .unwrap_or(false);
            if was_open && !ticket.is_open() {
                newly_closed.push(ticket.uuid);
            }
            self.tickets.insert(ticket.uuid, ticket);
        }
        self.state = CacheState::Populated;
        newly_closed
    }

    /// Derive the current ticket: a pinned one wins, otherwise the
    /// most-recently-opened still-open ticket.
    pub fn current_ticket(&self, pinned: Option<Uuid>) -> Option<&Ticket> {
        if let Some(uuid) = pinned {
            if let Some(ticket) = self.tickets.get(&uuid) {
                if ticket.is_open() {
                    return Some(ticket);
                }
            }
        }
        self.tickets
            .values()
            .filter(|t| t.is_open())
            .max_by_key(|t| t.opened_on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ticket(status: TicketStatus, opened_s: i64) -> Ticket {
        Ticket {
            uuid: Uuid::new_v4(),
            status,
            opened_on: Utc.timestamp_opt(opened_s, 0).unwrap(),
            closed_on: None,
            assignee: None,
        }
    }

    #[test]
    fn state_machine_empty_loading_populated() {
        let mut cache = TicketCache::new();
        assert_eq!(cache.state(), CacheState::Empty);

        cache.begin_refresh();
        assert_eq!(cache.state(), CacheState::Loading);

        cache.apply(vec![ticket(TicketStatus::Open, 100)]);
        assert_eq!(cache.state(), CacheState::Populated);

        cache.reset();
        assert_eq!(cache.state(), CacheState::Empty);
        assert_eq!(cache.tickets().count(), 0);
    }

    #[test]
    fn refresh_is_additive_and_reports_newly_closed() {
        let mut cache = TicketCache::new();
        let open = ticket(TicketStatus::Open, 100);
        let uuid = open.uuid;
        cache.apply(vec![open.clone()]);

        let mut closed = open;
        closed.status = TicketStatus::Closed;
        closed.closed_on = Some(Utc.timestamp_opt(200, 0).unwrap());

        let newly_closed = cache.apply(vec![closed, ticket(TicketStatus::Open, 150)]);

        assert_eq!(newly_closed, vec![uuid]);
        // Closed ticket is retained for historical marker rendering
        assert!(cache.get(uuid).is_some());
        assert_eq!(cache.open_tickets().len(), 1);
    }

    #[test]
    fn current_ticket_prefers_pinned_then_most_recently_opened() {
        let mut cache = TicketCache::new();
        let older = ticket(TicketStatus::Open, 100);
        let newer = ticket(TicketStatus::Open, 200);
        let older_uuid = older.uuid;
        let newer_uuid = newer.uuid;
        cache.apply(vec![older, newer]);

        assert_eq!(cache.current_ticket(None).unwrap().uuid, newer_uuid);
        assert_eq!(
            cache.current_ticket(Some(older_uuid)).unwrap().uuid,
            older_uuid
        );
    }

    #[test]
    fn pinned_closed_ticket_does_not_win() {
        let mut cache = TicketCache::new();
        let closed = ticket(TicketStatus::Closed, 300);
        let open = ticket(TicketStatus::Open, 100);
        let closed_uuid = closed.uuid;
        let open_uuid = open.uuid;
        cache.apply(vec![closed, open]);

        assert_eq!(
            cache.current_ticket(Some(closed_uuid)).unwrap().uuid,
            open_uuid
        );
    }

    #[test]
    fn failed_refresh_keeps_previous_data() {
        let mut cache = TicketCache::new();
        cache.apply(vec![ticket(TicketStatus::Open, 100)]);
        cache.begin_refresh();
        cache.refresh_failed();

        assert_eq!(cache.state(), CacheState::Populated);
        assert_eq!(cache.tickets().count(), 1);
    }
}
