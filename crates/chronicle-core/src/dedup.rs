// Event deduplication across overlapping fetch windows
//
// A poll can re-return an event that arrived in the previous page, and a
// backward fetch can overlap the oldest loaded page. Candidates already
// present anywhere in the timeline are dropped before merging.

use std::collections::HashSet;

use crate::event::{Event, EventKey};
use crate::group::EventGroup;

/// Filter out candidate events already present in the existing groups.
///
/// Pure function: identity is the (created_on microseconds, type) pair.
/// Relative order of the surviving candidates is preserved.
pub fn filter_new(candidates: Vec<Event>, existing: &[EventGroup]) -> Vec<Event> {
    if candidates.is_empty() {
        return candidates;
    }
    let seen: HashSet<EventKey> = existing
        .iter()
        .flat_map(|g| g.events.iter().map(Event::key))
        .collect();

    candidates
        .into_iter()
        .filter(|e| !seen.contains(&e.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{group, ClassifyContext};
    use chrono::DateTime;

    fn ev(event_type: &str, us: i64) -> Event {
        Event::new(event_type, DateTime::from_timestamp_micros(us).unwrap())
    }

    #[test]
    fn drops_events_already_in_any_group() {
        let ctx = ClassifyContext::default();
        let existing = group(
            vec![ev("msg_created", 1), ev("ticket_opened", 2), ev("msg_created", 3)],
            &ctx,
        );

        let fresh = filter_new(
            vec![ev("msg_created", 3), ev("msg_created", 4)],
            &existing,
        );

        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].created_on_us(), 4);
    }

    #[test]
    fn same_timestamp_different_type_survives() {
        let ctx = ClassifyContext::default();
        let existing = group(vec![ev("msg_created", 5)], &ctx);

        let fresh = filter_new(vec![ev("msg_received", 5)], &existing);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn merging_a_duplicate_page_never_grows_the_timeline() {
        let ctx = ClassifyContext::default();
        let events = vec![ev("msg_created", 1), ev("msg_received", 2)];
        let existing = group(events.clone(), &ctx);
        let before: usize = existing.iter().map(|g| g.events.len()).sum();

        let fresh = filter_new(events, &existing);

        assert!(fresh.is_empty());
        let after: usize = existing.iter().map(|g| g.events.len()).sum();
        assert_eq!(before, after);
    }
}
