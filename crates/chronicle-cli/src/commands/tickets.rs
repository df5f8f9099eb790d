// Tickets commands - list and close

use anyhow::Result;
use clap::Subcommand;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use chronicle_client::HttpTimelineApi;
use chronicle_core::{TicketApi, TicketStatus, TimelineError};

#[derive(Subcommand)]
pub enum TicketsCommand {
    /// List a contact's tickets
    List {
        /// Contact ID
        contact: Uuid,
    },

    /// Close an open ticket
    Close {
        /// Ticket ID
        uuid: Uuid,
    },
}

pub fn status_label(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Open => "open",
        TicketStatus::Closed => "closed",
    }
}

pub async fn run(
    command: TicketsCommand,
    api: &HttpTimelineApi,
    output: OutputFormat,
    quiet: bool,
) -> Result<()> {
    match command {
        TicketsCommand::List { contact } => {
            let mut tickets = api.list_tickets(contact, None).await?;
            tickets.sort_by_key(|t| t.opened_on);

            if output.is_text() {
                output::print_table_header(&[
                    ("UUID", 36),
                    ("STATUS", 8),
                    ("OPENED", 20),
                    ("ASSIGNEE", 20),
                ]);
                for ticket in &tickets {
                    output::print_table_row(&[
                        (&ticket.uuid.to_string(), 36),
                        (status_label(ticket.status), 8),
                        (&ticket.opened_on.format("%Y-%m-%d %H:%M:%S").to_string(), 20),
                        (ticket.assignee.as_deref().unwrap_or("-"), 20),
                    ]);
                }
            } else {
                output.print_value(&tickets);
            }
            Ok(())
        }
        TicketsCommand::Close { uuid } => match api.close_ticket(uuid).await {
            Ok(()) => {
                if !quiet {
                    println!("closed {}", uuid);
                }
                Ok(())
            }
            Err(TimelineError::Action { status, message }) => {
                anyhow::bail!("close rejected ({}): {}", status, message)
            }
            Err(err) => Err(err.into()),
        },
    }
}
