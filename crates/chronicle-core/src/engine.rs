// Timeline engine orchestration
//
// Owns the timeline, cursor pair, fetch session, ticket cache, sticky
// tracker, and poll scheduler for one subject. Backward fetches and
// forward polls run as spawned tasks whose network phases may overlap;
// their results are applied one at a time by the drive loop, so no
// partial-merge state is ever observable by the rendering layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::TimelineConfig;
use crate::dedup::filter_new;
use crate::error::Result;
use crate::event::{Event, EventPage};
use crate::fetch::{FetchSession, PageFetcher, PageQuery, Subject, TicketApi};
use crate::group::{ClassifyContext, EventGroup, Timeline};
use crate::refresh::RefreshScheduler;
use crate::scroll::{PrependSnapshot, ScrollAnchor, ScrollCommand, Viewport};
use crate::sticky::{MarkerGeometry, StickyTracker, StickyTransition};
use crate::ticket::{Ticket, TicketCache};

/// Notifications emitted to the rendering layer
///
/// All methods have no-op defaults so consumers implement only what they
/// render. Implementations must be cheap; they are called from the
/// engine's drive step.
pub trait TimelineSink: Send + Sync {
    /// The most recent event in the timeline changed
    fn most_recent_changed(&self, _event: &Event) {}

    /// The derived "current ticket" changed
    fn current_ticket_changed(&self, _ticket: Option<&Ticket>) {}

    /// The viewport crossed the backward-fetch threshold; an older page
    /// has been requested
    fn scroll_threshold_crossed(&self) {}

    /// Local content mutated (ticket action, collapse completion)
    fn content_changed(&self) {}

    /// Older content was prepended; apply the mutation, then resolve the
    /// scroll compensation with `ScrollAnchor::after_prepend`
    fn prepended(&self, _snapshot: PrependSnapshot) {}

    /// Apply a scroll adjustment after an append
    fn scroll(&self, _command: ScrollCommand) {}

    /// Sticky markers were promoted, demoted, or removed
    fn sticky_changed(&self, _transitions: &[StickyTransition]) {}
}

/// No-op sink
pub struct NullSink;

impl TimelineSink for NullSink {}

/// Await a fetch task slot; parks forever when the slot is empty. Always
/// paired with a select branch precondition, so the empty case is never
/// polled to completion.
async fn join_fetch(
    task: &mut Option<JoinHandle<Option<FetchOutcome>>>,
) -> Option<FetchOutcome> {
    match task {
        Some(handle) => handle.await.ok().flatten(),
        None => std::future::pending().await,
    }
}

/// Result of one fetch task: None means the fetch was aborted or failed
/// transiently and contributes no data this cycle.
struct FetchOutcome {
    page: EventPage,
    used_before: Option<i64>,
    token: CancellationToken,
}

/// The timeline engine for one subject at a time
pub struct TimelineEngine {
    fetcher: Arc<dyn PageFetcher>,
    tickets_api: Arc<dyn TicketApi>,
    sink: Arc<dyn TimelineSink>,
    config: TimelineConfig,

    subject: Option<Subject>,
    session: FetchSession,
    timeline: Timeline,

    next_before: Option<i64>,
    next_after: Option<i64>,
    complete: bool,
    loaded_once: bool,

    older_task: Option<JoinHandle<Option<FetchOutcome>>>,
    poll_task: Option<JoinHandle<Option<FetchOutcome>>>,

    tickets: TicketCache,
    sticky: StickyTracker,
    scheduler: RefreshScheduler,
    anchor: ScrollAnchor,

    viewport: Option<Viewport>,
    last_event_at: Option<DateTime<Utc>>,
    notified_current: Option<Uuid>,
}

impl TimelineEngine {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        tickets_api: Arc<dyn TicketApi>,
        sink: Arc<dyn TimelineSink>,
        config: TimelineConfig,
    ) -> Self {
        let scheduler = RefreshScheduler::new(config.min_refresh(), config.max_refresh());
        let anchor = ScrollAnchor::new(config.bottom_threshold_px);
        let sticky = StickyTracker::new(config.sticky_offset_px);
        Self {
            fetcher,
            tickets_api,
            sink,
            config,
            subject: None,
            session: FetchSession::new(),
            timeline: Timeline::new(),
            next_before: None,
            next_after: None,
            complete: false,
            loaded_once: false,
            older_task: None,
            poll_task: None,
            tickets: TicketCache::new(),
            sticky,
            scheduler,
            anchor,
            viewport: None,
            last_event_at: None,
            notified_current: None,
        }
    }

    pub fn groups(&self) -> &[EventGroup] {
        self.timeline.groups()
    }

    pub fn event_count(&self) -> usize {
        self.timeline.event_count()
    }

    /// Whether backward pagination has reached the oldest page
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn subject(&self) -> Option<Subject> {
        self.subject
    }

    /// Server-issued cursor pair (next_before, next_after)
    pub fn cursors(&self) -> (Option<i64>, Option<i64>) {
        (self.next_before, self.next_after)
    }

    pub fn tickets(&self) -> &TicketCache {
        &self.tickets
    }

    /// The derived current ticket: pinned wins, else most recently opened
    pub fn current_ticket(&self) -> Option<&Ticket> {
        self.tickets.current_ticket(self.sticky.current())
    }

    pub fn is_pinned(&self, ticket: Uuid) -> bool {
        self.sticky.is_pinned(ticket)
    }

    /// Whether a fetch task or timer is outstanding
    pub fn has_pending_work(&self) -> bool {
        self.older_task.is_some() || self.poll_task.is_some() || self.next_deadline().is_some()
    }

    fn classify_context(&self) -> ClassifyContext {
        ClassifyContext {
            ticket_filter: self.subject.and_then(|s| s.ticket),
        }
    }

    /// Switch to a new subject: abort everything in flight, rebuild all
    /// state, refresh tickets, and kick off the initial page load.
    pub async fn set_subject(&mut self, subject: Subject) {
        tracing::debug!(contact = %subject.contact, ticket = ?subject.ticket, "subject changed");
        self.session.reset();
        if let Some(task) = self.older_task.take() {
            task.abort();
        }
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        self.timeline.clear();
        self.next_before = None;
        self.next_after = None;
        self.complete = false;
        self.loaded_once = false;
        self.viewport = None;
        self.last_event_at = None;
        self.notified_current = None;
        self.tickets.reset();
        self.sticky.clear();
        self.scheduler.cancel();
        self.subject = Some(subject);

        self.refresh_tickets().await;
        self.poll_task = Some(self.spawn_fetch(PageQuery::initial(subject)));
    }

    /// Request a backward page. Ignored while a backward fetch is already
    /// pending, before the first load, or once pagination is complete.
    pub fn request_older(&mut self) -> bool {
        let Some(subject) = self.subject else {
            return false;
        };
        if self.complete || !self.loaded_once || self.older_task.is_some() {
            return false;
        }
        self.older_task = Some(self.spawn_fetch(PageQuery::older(subject, self.next_before)));
        true
    }

    /// Request a prompt poll (e.g. after a user action), bypassing the
    /// adaptive formula once.
    pub fn request_refresh(&mut self) {
        self.scheduler
            .schedule(Some(self.config.manual_refresh()), self.last_event_at);
    }

    /// Report viewport geometry and marker positions after a scroll or
    /// re-render. Re-evaluates sticky state and the backward-fetch
    /// threshold.
    pub fn update_viewport(&mut self, viewport: Viewport, markers: &[MarkerGeometry]) {
        self.viewport = Some(viewport);

        let open = self.tickets.open_tickets();
        let transitions = self.sticky.on_scroll(markers, &open);
        if !transitions.is_empty() {
            self.sink.sticky_changed(&transitions);
            self.notify_current_ticket();
        }

        if self.loaded_once
            && !self.complete
            && viewport.scroll_top <= self.config.fetch_threshold_px
            && self.request_older()
        {
            self.sink.scroll_threshold_crossed();
        }
    }

    /// Expand a group, canceling any staged collapse on it
    pub fn expand_group(&mut self, index: usize) {
        self.timeline.expand(index);
    }

    /// Stage a collapse; it completes after the configured delay unless an
    /// expand cancels it first
    pub fn collapse_group(&mut self, index: usize) {
        let deadline = Instant::now() + self.config.collapse_delay();
        self.timeline.begin_collapse(index, deadline);
    }

    /// Close a ticket. On success the ticket list is refreshed and a
    /// prompt poll is armed; failures propagate for user-visible
    /// reporting and leave local state untouched.
    pub async fn close_ticket(&mut self, uuid: Uuid) -> Result<()> {
        self.tickets_api.close_ticket(uuid).await?;
        self.sink.content_changed();
        self.refresh_tickets().await;
        self.request_refresh();
        Ok(())
    }

    /// Refresh the ticket list for the current subject. Transient
    /// failures keep the previous cache contents.
    pub async fn refresh_tickets(&mut self) {
        let Some(subject) = self.subject else {
            return;
        };
        self.tickets.begin_refresh();
        let token = self.session.token();
        let result = tokio::select! {
            _ = token.cancelled() => return,
            res = self.tickets_api.list_tickets(subject.contact, subject.ticket) => res,
        };
        match result {
            Ok(list) => {
                let newly_closed = self.tickets.apply(list);
                if !newly_closed.is_empty() {
                    let transitions = self.sticky.remove_closed(&newly_closed);
                    if !transitions.is_empty() {
                        self.sink.sticky_changed(&transitions);
                    }
                }
                self.notify_current_ticket();
            }
            Err(err) => {
                tracing::warn!(error = %err, "ticket refresh failed, keeping cached list");
                self.tickets.refresh_failed();
            }
        }
    }

    /// Wait for the next engine activity (fetch completion or timer) and
    /// apply it. Returns immediately when the engine is idle.
    pub async fn drive(&mut self) {
        let mut older = self.older_task.take();
        let mut poll = self.poll_task.take();
        let deadline = self.next_deadline();

        if older.is_none() && poll.is_none() && deadline.is_none() {
            return;
        }

        tokio::select! {
            outcome = join_fetch(&mut older), if older.is_some() => {
                older = None;
                self.apply_older(outcome);
            }
            outcome = join_fetch(&mut poll), if poll.is_some() => {
                poll = None;
                self.apply_newer(outcome).await;
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                if deadline.is_some() =>
            {
                self.on_deadline(poll.is_some()).await;
            }
        }

        // Restore whichever tasks are still in flight; on_deadline may
        // have spawned a replacement poll, which takes precedence.
        if self.older_task.is_none() {
            self.older_task = older;
        }
        if self.poll_task.is_none() {
            self.poll_task = poll;
        }
    }

    /// Drive until no fetch task remains in flight. Timers stay armed;
    /// intended for tests and batch drivers.
    pub async fn drain(&mut self) {
        while self.older_task.is_some() || self.poll_task.is_some() {
            self.drive().await;
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (
            self.scheduler.deadline(),
            self.timeline.next_collapse_deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    async fn on_deadline(&mut self, poll_in_flight: bool) {
        let now = Instant::now();

        if self.timeline.finish_due_collapses(now) > 0 {
            self.sink.content_changed();
        }

        if self.scheduler.fire_due(now) {
            if poll_in_flight {
                // Coalesce: never issue a second concurrent poll
                self.scheduler.defer();
            } else if let Some(subject) = self.subject {
                self.poll_task =
                    Some(self.spawn_fetch(PageQuery::newer(subject, self.next_after)));
            }
        }
    }

    fn spawn_fetch(&self, query: PageQuery) -> JoinHandle<Option<FetchOutcome>> {
        let fetcher = Arc::clone(&self.fetcher);
        let token = self.session.token();
        tokio::spawn(async move {
            let page = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("fetch aborted by subject change");
                    return None;
                }
                res = fetcher.fetch_page(&query) => match res {
                    Ok(page) => page,
                    Err(err) => {
                        tracing::warn!(error = %err, "page fetch failed, treating as no new data");
                        return None;
                    }
                },
            };
            Some(FetchOutcome {
                page,
                used_before: query.before,
                token,
            })
        })
    }

    fn apply_older(&mut self, outcome: Option<FetchOutcome>) {
        let Some(outcome) = outcome else {
            // Transient failure: next_before is unchanged, a retry stays possible
            return;
        };
        if outcome.token.is_cancelled() {
            tracing::debug!("discarding older page fetched for a replaced subject");
            return;
        }

        // An unchanged next_before signals backward exhaustion
        if outcome.page.next_before == outcome.used_before {
            tracing::debug!("backward pagination complete");
            self.complete = true;
        } else if outcome.page.next_before.is_some() {
            self.next_before = outcome.page.next_before;
        }

        let ctx = self.classify_context();
        let fresh = filter_new(outcome.page.into_chronological(), self.timeline.groups());
        if fresh.is_empty() {
            return;
        }

        let snapshot = self
            .viewport
            .map(|v| self.anchor.before_prepend(&v))
            .unwrap_or(PrependSnapshot {
                scroll_top: 0.0,
                content_height: 0.0,
            });
        self.timeline.merge_older(fresh, &ctx);
        self.sink.prepended(snapshot);
    }

    async fn apply_newer(&mut self, outcome: Option<FetchOutcome>) {
        let Some(outcome) = outcome else {
            // Poll failure never stalls the cycle
            self.scheduler.schedule(None, self.last_event_at);
            return;
        };
        if outcome.token.is_cancelled() {
            tracing::debug!("discarding poll page fetched for a replaced subject");
            return;
        }

        if outcome.page.next_after.is_some() {
            self.next_after = outcome.page.next_after;
        }
        // The first page also seeds the backward cursor
        if self.next_before.is_none() {
            self.next_before = outcome.page.next_before;
        }

        let first_load = !self.loaded_once;
        let ctx = self.classify_context();
        let fresh = filter_new(outcome.page.into_chronological(), self.timeline.groups());

        if !fresh.is_empty() {
            let viewport_before = self.viewport;
            let has_ticket_event = fresh.iter().any(Event::is_ticket_event);

            self.timeline.merge_newer(fresh, &ctx);
            self.last_event_at = self.timeline.newest_event_time();

            if let Some(newest) = self
                .timeline
                .groups()
                .last()
                .and_then(|g| g.events.last())
            {
                self.sink.most_recent_changed(newest);
            }

            let before = if first_load {
                None
            } else {
                viewport_before
            };
            if let Some(command) = self.anchor.after_append(before.as_ref()) {
                self.sink.scroll(command);
            }

            if has_ticket_event {
                self.refresh_tickets().await;
            }
        }

        self.loaded_once = true;
        self.scheduler.schedule(None, self.last_event_at);
    }

    fn notify_current_ticket(&mut self) {
        let current = self.tickets.current_ticket(self.sticky.current());
        let uuid = current.map(|t| t.uuid);
        if uuid != self.notified_current {
            self.notified_current = uuid;
            self.sink.current_ticket_changed(current);
        }
    }
}
