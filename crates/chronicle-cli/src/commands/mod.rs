pub mod history;
pub mod tail;
pub mod tickets;

use std::sync::Arc;

use chronicle_client::HttpTimelineApi;
use chronicle_core::{NullSink, Subject, TimelineConfig, TimelineEngine};
use uuid::Uuid;

/// Build an engine wired to the HTTP API with default tuning
pub fn engine_for(api: &HttpTimelineApi) -> TimelineEngine {
    TimelineEngine::new(
        Arc::new(api.clone()),
        Arc::new(api.clone()),
        Arc::new(NullSink),
        TimelineConfig::default(),
    )
}

pub fn subject_for(contact: Uuid, ticket: Option<Uuid>) -> Subject {
    match ticket {
        Some(ticket) => Subject::contact(contact).with_ticket(ticket),
        None => Subject::contact(contact),
    }
}
