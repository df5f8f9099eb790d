// Event grouping and the timeline structure
//
// Consecutive events that classify to the same kind fold into one
// collapsible group. When a new page is spliced in at either end, the
// boundary-adjacent group is dissolved, its events concatenated with the
// fetched ones, and the slice regrouped, so a run of messages broken
// across two server pages still renders as a single group.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::event::Event;

/// Classification of an event for grouping purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Messages exchanged with the contact
    Conversation,
    /// Flow entry and exit transitions
    Flow,
    /// Ticket lifecycle markers, standing alone when a ticket filter is active
    Ticket,
    /// System notices and everything else, collapsed by default
    Verbose,
}

/// Subject-dependent inputs to classification
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyContext {
    /// Ticket the subject is filtered to, if any
    pub ticket_filter: Option<Uuid>,
}

/// Classify an event into its group kind. Deterministic and pure.
pub fn classify(event: &Event, ctx: &ClassifyContext) -> GroupKind {
    match event.event_type.as_str() {
        "msg_created" | "msg_received" | "broadcast_created" | "ivr_created" => {
            GroupKind::Conversation
        }
        "flow_entered" | "flow_exited" => GroupKind::Flow,
        "ticket_opened" | "ticket_closed" if ctx.ticket_filter.is_some() => GroupKind::Ticket,
        _ => GroupKind::Verbose,
    }
}

/// A maximal run of consecutive same-classified events
#[derive(Debug, Clone)]
pub struct EventGroup {
    pub kind: GroupKind,
    pub events: Vec<Event>,
    /// Whether the group is expanded in the UI
    pub open: bool,
    /// Whether a collapse has been staged but not yet completed
    pub closing: bool,
    collapse_deadline: Option<Instant>,
}

impl EventGroup {
    fn new(kind: GroupKind, first: Event) -> Self {
        Self {
            kind,
            events: vec![first],
            open: false,
            closing: false,
            collapse_deadline: None,
        }
    }

    /// Timestamp of the oldest event in the group
    pub fn oldest(&self) -> DateTime<Utc> {
        self.events[0].created_on
    }

    /// Timestamp of the newest event in the group
    pub fn newest(&self) -> DateTime<Utc> {
        self.events[self.events.len() - 1].created_on
    }
}

/// Fold an ordered event list into groups, starting a new group whenever
/// classification changes from the running group's kind.
pub fn group(events: Vec<Event>, ctx: &ClassifyContext) -> Vec<EventGroup> {
    let mut groups: Vec<EventGroup> = Vec::new();
    for event in events {
        let kind = classify(&event, ctx);
        match groups.last_mut() {
            Some(last) if last.kind == kind => last.events.push(event),
            _ => groups.push(EventGroup::new(kind, event)),
        }
    }
    groups
}

/// The ordered sequence of event groups, chronological ascending
///
/// Owned exclusively by the engine and mutated only through the merge
/// operations here, so no partial-merge state is ever observable.
#[derive(Debug, Default)]
pub struct Timeline {
    groups: Vec<EventGroup>,
}

impl Timeline {
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    pub fn groups(&self) -> &[EventGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total event count across all groups
    pub fn event_count(&self) -> usize {
        self.groups.iter().map(|g| g.events.len()).sum()
    }

    /// Timestamp of the most recent event, if any
    pub fn newest_event_time(&self) -> Option<DateTime<Utc>> {
        self.groups.last().map(|g| g.newest())
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Merge newer events (chronological order) at the tail
    pub fn merge_newer(&mut self, events: Vec<Event>, ctx: &ClassifyContext) {
        if events.is_empty() {
            return;
        }
        let Some(boundary) = self.groups.pop() else {
            self.groups = group(events, ctx);
            return;
        };

        let was_open = boundary.open;
        let mut slice = boundary.events;
        slice.extend(events);

        let mut regrouped = group(slice, ctx);
        // The first regrouped group holds the events that were in the
        // dissolved boundary group; a user-expanded region must not
        // silently collapse when new data arrives next to it.
        if was_open {
            if let Some(first) = regrouped.first_mut() {
                first.open = true;
            }
        }
        self.groups.append(&mut regrouped);
    }

    /// Merge older events (chronological order) at the head
    pub fn merge_older(&mut self, events: Vec<Event>, ctx: &ClassifyContext) {
        if events.is_empty() {
            return;
        }
        if self.groups.is_empty() {
            self.groups = group(events, ctx);
            return;
        }
        let boundary = self.groups.remove(0);

        let was_open = boundary.open;
        let mut slice = events;
        slice.extend(boundary.events);

        let mut regrouped = group(slice, ctx);
        if was_open {
            if let Some(last) = regrouped.last_mut() {
                last.open = true;
            }
        }
        regrouped.append(&mut self.groups);
        self.groups = regrouped;
    }

    /// Expand a group, canceling any pending staged collapse
    pub fn expand(&mut self, index: usize) {
        if let Some(group) = self.groups.get_mut(index) {
            group.open = true;
            group.closing = false;
            group.collapse_deadline = None;
        }
    }

    /// Stage a collapse: mark the group closing and arm its completion
    /// deadline so the collapse animation can run before the expanded
    /// content is removed from the model.
    pub fn begin_collapse(&mut self, index: usize, deadline: Instant) {
        if let Some(group) = self.groups.get_mut(index) {
            if group.open {
                group.closing = true;
                group.collapse_deadline = Some(deadline);
            }
        }
    }

    /// Complete any staged collapses whose deadline has passed.
    /// Returns the number of groups that finished collapsing.
    pub fn finish_due_collapses(&mut self, now: Instant) -> usize {
        let mut finished = 0;
        for group in &mut self.groups {
            if let Some(deadline) = group.collapse_deadline {
                if deadline <= now {
                    group.open = false;
                    group.closing = false;
                    group.collapse_deadline = None;
                    finished += 1;
                }
            }
        }
        finished
    }

    /// Earliest pending collapse deadline, for the drive loop to sleep on
    pub fn next_collapse_deadline(&self) -> Option<Instant> {
        self.groups
            .iter()
            .filter_map(|g| g.collapse_deadline)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::time::Duration;

    fn ev(event_type: &str, us: i64) -> Event {
        Event::new(event_type, DateTime::from_timestamp_micros(us).unwrap())
    }

    fn kinds(groups: &[EventGroup]) -> Vec<GroupKind> {
        groups.iter().map(|g| g.kind).collect()
    }

    fn sizes(groups: &[EventGroup]) -> Vec<usize> {
        groups.iter().map(|g| g.events.len()).collect()
    }

    #[test]
    fn grouping_folds_consecutive_kinds() {
        let ctx = ClassifyContext::default();
        let events = vec![
            ev("msg_created", 1),
            ev("msg_received", 2),
            ev("ticket_opened", 3),
            ev("msg_created", 4),
            ev("msg_received", 5),
        ];
        let groups = group(events, &ctx);

        assert_eq!(
            kinds(&groups),
            vec![GroupKind::Conversation, GroupKind::Verbose, GroupKind::Conversation]
        );
        assert_eq!(sizes(&groups), vec![2, 1, 2]);
    }

    #[test]
    fn grouping_has_no_adjacent_equal_kinds_and_preserves_order() {
        let ctx = ClassifyContext::default();
        let events: Vec<Event> = (0..20)
            .map(|i| {
                let ty = match i % 4 {
                    0 | 1 => "msg_created",
                    2 => "flow_entered",
                    _ => "channel_event",
                };
                ev(ty, i)
            })
            .collect();
        let original: Vec<i64> = events.iter().map(|e| e.created_on_us()).collect();

        let groups = group(events, &ctx);

        for pair in groups.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind);
        }
        let flattened: Vec<i64> = groups
            .iter()
            .flat_map(|g| g.events.iter().map(|e| e.created_on_us()))
            .collect();
        assert_eq!(flattened, original);
    }

    #[test]
    fn ticket_events_stand_alone_under_a_ticket_filter() {
        let plain = ClassifyContext::default();
        let filtered = ClassifyContext {
            ticket_filter: Some(Uuid::new_v4()),
        };
        let opened = ev("ticket_opened", 1);

        assert_eq!(classify(&opened, &plain), GroupKind::Verbose);
        assert_eq!(classify(&opened, &filtered), GroupKind::Ticket);
    }

    #[test]
    fn merge_older_absorbs_into_boundary_group() {
        let ctx = ClassifyContext::default();
        let mut timeline = Timeline::new();
        timeline.merge_newer(
            vec![
                ev("msg_created", 10),
                ev("msg_received", 11),
                ev("ticket_opened", 12),
                ev("msg_created", 13),
                ev("msg_received", 14),
            ],
            &ctx,
        );
        assert_eq!(sizes(timeline.groups()), vec![2, 1, 2]);

        timeline.merge_older(vec![ev("msg_created", 1), ev("msg_received", 2)], &ctx);

        assert_eq!(sizes(timeline.groups()), vec![4, 1, 2]);
        assert_eq!(timeline.groups().len(), 3);
        assert_eq!(timeline.event_count(), 7);
    }

    #[test]
    fn merge_newer_reflow_preserves_open() {
        let ctx = ClassifyContext::default();
        let mut timeline = Timeline::new();
        timeline.merge_newer(vec![ev("msg_created", 1), ev("msg_received", 2)], &ctx);
        timeline.expand(0);

        timeline.merge_newer(vec![ev("msg_created", 3)], &ctx);

        assert_eq!(timeline.groups().len(), 1);
        assert_eq!(timeline.groups()[0].events.len(), 3);
        assert!(timeline.groups()[0].open);
    }

    #[test]
    fn merge_older_reflow_preserves_open_on_head_group() {
        let ctx = ClassifyContext::default();
        let mut timeline = Timeline::new();
        timeline.merge_newer(vec![ev("msg_created", 10)], &ctx);
        timeline.expand(0);

        timeline.merge_older(vec![ev("msg_created", 1)], &ctx);

        assert_eq!(timeline.groups().len(), 1);
        assert!(timeline.groups()[0].open);
    }

    #[test]
    fn merge_with_distinct_boundary_kind_keeps_groups_separate() {
        let ctx = ClassifyContext::default();
        let mut timeline = Timeline::new();
        timeline.merge_newer(vec![ev("msg_created", 10)], &ctx);

        timeline.merge_older(vec![ev("flow_entered", 1)], &ctx);

        assert_eq!(
            kinds(timeline.groups()),
            vec![GroupKind::Flow, GroupKind::Conversation]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn staged_collapse_completes_after_delay() {
        let ctx = ClassifyContext::default();
        let mut timeline = Timeline::new();
        timeline.merge_newer(vec![ev("channel_event", 1)], &ctx);
        timeline.expand(0);

        let deadline = Instant::now() + Duration::from_millis(300);
        timeline.begin_collapse(0, deadline);
        assert!(timeline.groups()[0].open);
        assert!(timeline.groups()[0].closing);

        // Not yet due
        assert_eq!(timeline.finish_due_collapses(Instant::now()), 0);

        tokio::time::advance(Duration::from_millis(301)).await;
        assert_eq!(timeline.finish_due_collapses(Instant::now()), 1);
        assert!(!timeline.groups()[0].open);
        assert!(!timeline.groups()[0].closing);
    }

    #[tokio::test(start_paused = true)]
    async fn expand_cancels_a_pending_collapse() {
        let ctx = ClassifyContext::default();
        let mut timeline = Timeline::new();
        timeline.merge_newer(vec![ev("channel_event", 1)], &ctx);
        timeline.expand(0);
        timeline.begin_collapse(0, Instant::now() + Duration::from_millis(300));

        timeline.expand(0);
        assert!(timeline.next_collapse_deadline().is_none());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(timeline.finish_due_collapses(Instant::now()), 0);
        assert!(timeline.groups()[0].open);
    }

    #[test]
    fn collapse_on_a_closed_group_is_a_no_op() {
        let ctx = ClassifyContext::default();
        let mut timeline = Timeline::new();
        timeline.merge_newer(vec![ev("channel_event", 1)], &ctx);

        timeline.begin_collapse(0, Instant::now());
        assert!(!timeline.groups()[0].closing);
    }
}
