// Sticky tracking for open-ticket banners
//
// Modeled as an explicit state machine per ticket-open marker: Inline or
// Pinned. The rendering layer supplies marker geometry on scroll and
// performs the actual element moves; the tracker only decides when a
// transition occurs and which ticket is current.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geometry of an inline ticket-open marker (or its placeholder anchor,
/// for a pinned one), relative to the viewport top
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarkerGeometry {
    pub ticket: Uuid,
    /// Top edge of the marker's anchor point, viewport-relative px
    pub top: f64,
    /// Rendered height, preserved across promotion so layout does not shift
    pub height: f64,
}

/// How a marker's sticky state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickyChange {
    /// Promoted into the fixed overlay region
    Promoted,
    /// Reattached to its original inline position
    Demoted,
    /// Forcibly removed from the overlay because the ticket closed
    Removed,
}

/// A single promotion/demotion decision for the rendering layer to apply
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickyTransition {
    pub ticket: Uuid,
    pub height: f64,
    pub change: StickyChange,
}

#[derive(Debug, Clone, Copy)]
struct PinnedMarker {
    ticket: Uuid,
    height: f64,
}

/// Tracks which ticket-open markers are pinned to the overlay region
#[derive(Debug, Default)]
pub struct StickyTracker {
    offset_px: f64,
    /// Pin order: earlier entries sit higher in the overlay stack
    pinned: Vec<PinnedMarker>,
}

impl StickyTracker {
    pub fn new(offset_px: f64) -> Self {
        Self {
            offset_px,
            pinned: Vec::new(),
        }
    }

    /// Ticket currently pinned closest to the reading position, if any
    pub fn current(&self) -> Option<Uuid> {
        self.pinned.last().map(|p| p.ticket)
    }

    pub fn is_pinned(&self, ticket: Uuid) -> bool {
        self.pinned.iter().any(|p| p.ticket == ticket)
    }

    /// Summed heights of the pinned stack
    pub fn stack_height(&self) -> f64 {
        self.pinned.iter().map(|p| p.height).sum()
    }

    pub fn clear(&mut self) {
        self.pinned.clear();
    }

    /// Re-evaluate every rendered marker against the sticky boundary.
    ///
    /// `markers` come in document order (top to bottom); `open_tickets` is
    /// the eligibility set: a marker whose ticket is not open has no
    /// sticky id and is never promoted.
    pub fn on_scroll(
        &mut self,
        markers: &[MarkerGeometry],
        open_tickets: &HashSet<Uuid>,
    ) -> Vec<StickyTransition> {
        let mut transitions = Vec::new();

        for marker in markers {
            match self.pinned.iter().position(|p| p.ticket == marker.ticket) {
                Some(index) => {
                    // Demotion boundary sits below the stickies pinned above this one
                    let boundary: f64 = self.offset_px
                        + self.pinned[..index].iter().map(|p| p.height).sum::<f64>();
                    if marker.top >= boundary {
                        let pinned = self.pinned.remove(index);
                        tracing::debug!(ticket = %pinned.ticket, "sticky demoted");
                        transitions.push(StickyTransition {
                            ticket: pinned.ticket,
                            height: pinned.height,
                            change: StickyChange::Demoted,
                        });
                    }
                }
                None => {
                    if !open_tickets.contains(&marker.ticket) {
                        continue;
                    }
                    let boundary = self.offset_px + self.stack_height();
                    if marker.top < boundary {
                        tracing::debug!(ticket = %marker.ticket, "sticky promoted");
                        self.pinned.push(PinnedMarker {
                            ticket: marker.ticket,
                            height: marker.height,
                        });
                        transitions.push(StickyTransition {
                            ticket: marker.ticket,
                            height: marker.height,
                            change: StickyChange::Promoted,
                        });
                    }
                }
            }
        }

        transitions
    }

    /// Forcibly unpin markers whose tickets have closed, regardless of
    /// scroll position.
    pub fn remove_closed(&mut self, closed: &[Uuid]) -> Vec<StickyTransition> {
        let mut transitions = Vec::new();
        self.pinned.retain(|p| {
            if closed.contains(&p.ticket) {
                tracing::debug!(ticket = %p.ticket, "sticky removed, ticket closed");
                transitions.push(StickyTransition {
                    ticket: p.ticket,
                    height: p.height,
                    change: StickyChange::Removed,
                });
                false
            } else {
                true
            }
        });
        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_set(tickets: &[Uuid]) -> HashSet<Uuid> {
        tickets.iter().copied().collect()
    }

    #[test]
    fn promotion_and_demotion_round_trip() {
        let mut tracker = StickyTracker::new(10.0);
        let ticket = Uuid::new_v4();
        let open = open_set(&[ticket]);

        // Marker well below the boundary: stays inline
        let inline = [MarkerGeometry {
            ticket,
            top: 300.0,
            height: 48.0,
        }];
        assert!(tracker.on_scroll(&inline, &open).is_empty());
        assert_eq!(tracker.current(), None);

        // Scrolled up past the boundary: promoted, height preserved
        let above = [MarkerGeometry {
            ticket,
            top: -5.0,
            height: 48.0,
        }];
        let transitions = tracker.on_scroll(&above, &open);
        assert_eq!(
            transitions,
            vec![StickyTransition {
                ticket,
                height: 48.0,
                change: StickyChange::Promoted
            }]
        );
        assert_eq!(tracker.current(), Some(ticket));
        assert_eq!(tracker.stack_height(), 48.0);

        // Scrolled back down: demoted with the identical height, current reverts
        let below = [MarkerGeometry {
            ticket,
            top: 120.0,
            height: 48.0,
        }];
        let transitions = tracker.on_scroll(&below, &open);
        assert_eq!(transitions[0].change, StickyChange::Demoted);
        assert_eq!(transitions[0].height, 48.0);
        assert_eq!(tracker.current(), None);
        assert!(!tracker.is_pinned(ticket));
    }

    #[test]
    fn closed_tickets_are_never_promoted() {
        let mut tracker = StickyTracker::new(10.0);
        let ticket = Uuid::new_v4();

        let above = [MarkerGeometry {
            ticket,
            top: -5.0,
            height: 48.0,
        }];
        assert!(tracker.on_scroll(&above, &HashSet::new()).is_empty());
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn second_sticky_stacks_below_the_first() {
        let mut tracker = StickyTracker::new(10.0);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let open = open_set(&[first, second]);

        tracker.on_scroll(
            &[MarkerGeometry {
                ticket: first,
                top: -50.0,
                height: 40.0,
            }],
            &open,
        );

        // Boundary for the second marker is offset + first's height = 50
        let not_yet = [MarkerGeometry {
            ticket: second,
            top: 55.0,
            height: 40.0,
        }];
        assert!(tracker.on_scroll(&not_yet, &open).is_empty());

        let crossing = [MarkerGeometry {
            ticket: second,
            top: 45.0,
            height: 40.0,
        }];
        let transitions = tracker.on_scroll(&crossing, &open);
        assert_eq!(transitions[0].change, StickyChange::Promoted);
        assert_eq!(tracker.current(), Some(second));

        // Demoting the deepest sticky makes the one above it current again
        let back_down = [MarkerGeometry {
            ticket: second,
            top: 120.0,
            height: 40.0,
        }];
        tracker.on_scroll(&back_down, &open);
        assert_eq!(tracker.current(), Some(first));
    }

    #[test]
    fn ticket_closure_forcibly_unpins() {
        let mut tracker = StickyTracker::new(10.0);
        let ticket = Uuid::new_v4();
        let open = open_set(&[ticket]);

        tracker.on_scroll(
            &[MarkerGeometry {
                ticket,
                top: 0.0,
                height: 48.0,
            }],
            &open,
        );
        assert!(tracker.is_pinned(ticket));

        let transitions = tracker.remove_closed(&[ticket]);
        assert_eq!(transitions[0].change, StickyChange::Removed);
        assert!(!tracker.is_pinned(ticket));
        assert_eq!(tracker.stack_height(), 0.0);
    }
}
