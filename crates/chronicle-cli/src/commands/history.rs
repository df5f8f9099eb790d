// History command - page backward until the oldest event, then print

use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use chronicle_client::HttpTimelineApi;

pub async fn run(
    api: &HttpTimelineApi,
    output: OutputFormat,
    contact: Uuid,
    ticket: Option<Uuid>,
) -> Result<()> {
    let mut engine = super::engine_for(api);
    engine.set_subject(super::subject_for(contact, ticket)).await;
    engine.drain().await;

    // Walk backward page by page; request_older refuses once complete
    while engine.request_older() {
        engine.drain().await;
    }

    if output.is_text() {
        for group in engine.groups() {
            let marker = if group.open { "*" } else { " " };
            println!(
                "--- {}{} ({} events)",
                output::kind_label(group.kind),
                marker,
                group.events.len()
            );
            for event in &group.events {
                output::print_event(event);
            }
        }
    } else {
        let groups: Vec<_> = engine
            .groups()
            .iter()
            .map(|g| {
                json!({
                    "kind": g.kind,
                    "open": g.open,
                    "events": g.events,
                })
            })
            .collect();
        output.print_value(&groups);
    }

    Ok(())
}
