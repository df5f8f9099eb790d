// Chronicle Timeline Engine
//
// This crate provides a transport-agnostic engine for an incrementally
// loaded, bidirectionally paginated timeline of contact interaction
// events, with live polling and sticky open-ticket tracking.
//
// Key design decisions:
// - Uses traits (PageFetcher, TicketApi, TimelineSink) for pluggable transports
// - Cursor management, dedup, and grouping are pure and separately testable
// - Scroll and sticky geometry are modeled as state machines; the rendering
//   layer owns the actual pixels and element moves
// - A FetchSession cancellation scope guards merges, not just network calls,
//   so a page fetched for a replaced subject can never land in the new one
// - All timers are deadlines owned by the engine; scheduling replaces them,
//   never stacks them

pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod event;
pub mod fetch;
pub mod group;
pub mod refresh;
pub mod scroll;
pub mod sticky;
pub mod ticket;

// In-memory implementations for examples and testing
pub mod memory;

// Re-exports for convenience
pub use config::TimelineConfig;
pub use engine::{NullSink, TimelineEngine, TimelineSink};
pub use error::{Result, TimelineError};
pub use event::{Event, EventKey, EventPage};
pub use fetch::{FetchSession, PageFetcher, PageQuery, Subject, TicketApi};
pub use group::{classify, group, ClassifyContext, EventGroup, GroupKind, Timeline};
pub use refresh::{compute_wait, RefreshScheduler};
pub use scroll::{PrependSnapshot, ScrollAnchor, ScrollCommand, Viewport};
pub use sticky::{MarkerGeometry, StickyChange, StickyTracker, StickyTransition};
pub use ticket::{CacheState, Ticket, TicketCache, TicketStatus};
