// In-memory implementations for examples and testing
//
// These implementations keep all data in memory, making them perfect for:
// - Driving the engine against fixture histories in tests
// - Quick prototyping without a server

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::engine::TimelineSink;
use crate::error::{Result, TimelineError};
use crate::event::{Event, EventPage};
use crate::fetch::{PageFetcher, PageQuery, TicketApi};
use crate::scroll::{PrependSnapshot, ScrollCommand};
use crate::sticky::StickyTransition;
use crate::ticket::{Ticket, TicketStatus};

// ============================================================================
// FixturePageFetcher - Serves pages from a seeded event history
// ============================================================================

/// In-memory page fetcher
///
/// Holds a chronological event history and answers cursor queries the way
/// the server does: newest-first pages, `next_before` echoing the request
/// cursor when the backward window is exhausted.
#[derive(Debug, Clone)]
pub struct FixturePageFetcher {
    events: Arc<RwLock<Vec<Event>>>,
    page_size: usize,
    fail_next: Arc<AtomicBool>,
    overlap_polls: Arc<AtomicBool>,
    fetches: Arc<AtomicUsize>,
}

impl FixturePageFetcher {
    pub fn new(page_size: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            page_size,
            fail_next: Arc::new(AtomicBool::new(false)),
            overlap_polls: Arc::new(AtomicBool::new(false)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Pre-populate the history (chronological order)
    pub async fn seed(&self, events: Vec<Event>) {
        let mut guard = self.events.write().await;
        *guard = events;
        guard.sort_by_key(Event::created_on_us);
    }

    /// Append a newly arrived event, as if it happened after seeding
    pub async fn push(&self, event: Event) {
        let mut guard = self.events.write().await;
        guard.push(event);
        guard.sort_by_key(Event::created_on_us);
    }

    /// Make the next fetch fail with a transient error
    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Make forward polls ignore their `after` cursor and re-return the
    /// newest page, simulating an overlapping server fetch window
    pub fn overlap_polls(&self) {
        self.overlap_polls.store(true, Ordering::SeqCst);
    }

    /// Number of fetches served (including the failed one)
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FixturePageFetcher {
    async fn fetch_page(&self, query: &PageQuery) -> Result<EventPage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TimelineError::transient("fixture failure"));
        }

        let overlap = self.overlap_polls.load(Ordering::SeqCst);
        let events = self.events.read().await;
        let candidates: Vec<&Event> = events
            .iter()
            .filter(|e| match (query.before, query.after) {
                (Some(before), _) => e.created_on_us() < before,
                (_, Some(after)) if !overlap => e.created_on_us() > after,
                _ => true,
            })
            .collect();

        let start = candidates.len().saturating_sub(self.page_size);
        let taken = &candidates[start..];

        let next_before = if taken.is_empty() || start == 0 {
            // Window exhausted: echo the cursor so the caller sees completion
            query
                .before
                .or_else(|| taken.first().map(|e| e.created_on_us()))
        } else {
            taken.first().map(|e| e.created_on_us())
        };
        let next_after = taken
            .last()
            .map(|e| e.created_on_us())
            .or(query.after);

        let mut page_events: Vec<Event> = taken.iter().map(|e| (*e).clone()).collect();
        page_events.reverse();

        Ok(EventPage {
            events: page_events,
            next_before,
            next_after,
        })
    }
}

// ============================================================================
// FixtureTicketApi - Tickets backed by a shared vector
// ============================================================================

/// In-memory ticket API
#[derive(Debug, Default, Clone)]
pub struct FixtureTicketApi {
    tickets: Arc<RwLock<Vec<Ticket>>>,
    fail_close: Arc<AtomicBool>,
}

impl FixtureTicketApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, tickets: Vec<Ticket>) {
        *self.tickets.write().await = tickets;
    }

    /// Mutate a ticket's status directly, as if closed server-side
    pub async fn set_status(&self, uuid: Uuid, status: TicketStatus) {
        let mut guard = self.tickets.write().await;
        if let Some(ticket) = guard.iter_mut().find(|t| t.uuid == uuid) {
            ticket.status = status;
            if status == TicketStatus::Closed {
                ticket.closed_on = Some(Utc::now());
            }
        }
    }

    /// Make the next close action fail
    pub fn fail_next_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TicketApi for FixtureTicketApi {
    async fn list_tickets(&self, _contact: Uuid, ticket: Option<Uuid>) -> Result<Vec<Ticket>> {
        let guard = self.tickets.read().await;
        Ok(guard
            .iter()
            .filter(|t| ticket.map(|u| t.uuid == u).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn close_ticket(&self, uuid: Uuid) -> Result<()> {
        if self.fail_close.swap(false, Ordering::SeqCst) {
            return Err(TimelineError::action(500, "fixture close failure"));
        }
        self.set_status(uuid, TicketStatus::Closed).await;
        Ok(())
    }
}

// ============================================================================
// RecordingSink - Collects notifications for assertions
// ============================================================================

/// One recorded sink notification
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    MostRecentChanged(String),
    CurrentTicketChanged(Option<Uuid>),
    ScrollThresholdCrossed,
    ContentChanged,
    Prepended(PrependSnapshot),
    Scroll(ScrollCommand),
    Sticky(Vec<StickyTransition>),
}

/// Sink that records every notification in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything recorded so far
    pub fn take(&self) -> Vec<SinkEvent> {
        std::mem::take(&mut self.events.lock().unwrap())
    }

    pub fn recorded(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, wanted: &SinkEvent) -> bool {
        self.events.lock().unwrap().iter().any(|e| e == wanted)
    }

    fn record(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl TimelineSink for RecordingSink {
    fn most_recent_changed(&self, event: &Event) {
        self.record(SinkEvent::MostRecentChanged(event.event_type.clone()));
    }

    fn current_ticket_changed(&self, ticket: Option<&Ticket>) {
        self.record(SinkEvent::CurrentTicketChanged(ticket.map(|t| t.uuid)));
    }

    fn scroll_threshold_crossed(&self) {
        self.record(SinkEvent::ScrollThresholdCrossed);
    }

    fn content_changed(&self) {
        self.record(SinkEvent::ContentChanged);
    }

    fn prepended(&self, snapshot: PrependSnapshot) {
        self.record(SinkEvent::Prepended(snapshot));
    }

    fn scroll(&self, command: ScrollCommand) {
        self.record(SinkEvent::Scroll(command));
    }

    fn sticky_changed(&self, transitions: &[StickyTransition]) {
        self.record(SinkEvent::Sticky(transitions.to_vec()));
    }
}
