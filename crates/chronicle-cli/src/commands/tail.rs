// Tail command - follow a contact's timeline live
//
// Drives the engine's poll cycle and prints events as they append. The
// adaptive schedule means a quiet timeline polls rarely and an active
// one keeps up.

use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use chronicle_client::HttpTimelineApi;
use chronicle_core::TimelineEngine;

pub async fn run(
    api: &HttpTimelineApi,
    output: OutputFormat,
    quiet: bool,
    contact: Uuid,
    ticket: Option<Uuid>,
    duration: Option<u64>,
) -> Result<()> {
    let mut engine = super::engine_for(api);
    engine.set_subject(super::subject_for(contact, ticket)).await;
    engine.drain().await;

    let mut printed = print_new(&engine, output, 0);
    if !quiet && output.is_text() {
        if let Some(ticket) = engine.current_ticket() {
            eprintln!(
                "current ticket: {} ({})",
                ticket.uuid,
                super::tickets::status_label(ticket.status)
            );
        }
        eprintln!("following... (ctrl-c to stop)");
    }

    let stop_at = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    loop {
        tokio::select! {
            _ = engine.drive() => {}
            _ = tokio::signal::ctrl_c() => break,
            _ = sleep_until_opt(stop_at) => break,
        }
        printed = print_new(&engine, output, printed);
    }

    Ok(())
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Print every event past `already_printed`, returning the new count.
/// Tailing never paginates backward, so growth is always at the end.
fn print_new(engine: &TimelineEngine, output: OutputFormat, already_printed: usize) -> usize {
    let events: Vec<_> = engine
        .groups()
        .iter()
        .flat_map(|g| g.events.iter())
        .collect();
    for event in &events[already_printed..] {
        if output.is_text() {
            output::print_event(event);
        } else {
            output.print_value(event);
        }
    }
    events.len()
}
