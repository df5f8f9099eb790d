// HTTP transport for the Chronicle timeline engine
//
// HttpTimelineApi implements the engine's PageFetcher and TicketApi
// traits against the history and ticket endpoints. Error mapping follows
// the engine's taxonomy: connection and server failures are transient
// (the engine swallows them and retries), undecodable bodies are
// malformed, and ticket-action failures carry the status for
// user-visible reporting.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use chronicle_core::{
    EventPage, PageFetcher, PageQuery, Result, Ticket, TicketApi, TimelineError,
};

const DEFAULT_EVENTS_PATH: &str = "/api/events";
const DEFAULT_TICKETS_PATH: &str = "/api/tickets";

/// HTTP client wrapper for the timeline and ticket endpoints
#[derive(Debug, Clone)]
pub struct HttpTimelineApi {
    base_url: String,
    events_path: String,
    tickets_path: String,
    http: reqwest::Client,
}

impl HttpTimelineApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            events_path: DEFAULT_EVENTS_PATH.to_string(),
            tickets_path: DEFAULT_TICKETS_PATH.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Override the history endpoint path
    pub fn with_events_path(mut self, path: impl Into<String>) -> Self {
        self.events_path = path.into();
        self
    }

    /// Override the tickets endpoint path
    pub fn with_tickets_path(mut self, path: impl Into<String>) -> Self {
        self.tickets_path = path.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl PageFetcher for HttpTimelineApi {
    async fn fetch_page(&self, query: &PageQuery) -> Result<EventPage> {
        let mut params: Vec<(&str, String)> =
            vec![("contact", query.subject.contact.to_string())];
        if let Some(before) = query.before {
            params.push(("before", before.to_string()));
        }
        if let Some(after) = query.after {
            params.push(("after", after.to_string()));
        }
        if let Some(ticket) = query.subject.ticket {
            params.push(("ticket", ticket.to_string()));
        }

        let response = self
            .http
            .get(self.url(&self.events_path))
            .query(&params)
            .send()
            .await
            .map_err(|err| TimelineError::transient(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TimelineError::transient(format!(
                "history fetch returned {status}"
            )));
        }

        response
            .json::<EventPage>()
            .await
            .map_err(|err| TimelineError::malformed(err.to_string()))
    }
}

#[async_trait]
impl TicketApi for HttpTimelineApi {
    async fn list_tickets(&self, contact: Uuid, ticket: Option<Uuid>) -> Result<Vec<Ticket>> {
        let mut params: Vec<(&str, String)> = vec![("contact", contact.to_string())];
        if let Some(ticket) = ticket {
            params.push(("ticket", ticket.to_string()));
        }

        let response = self
            .http
            .get(self.url(&self.tickets_path))
            .query(&params)
            .send()
            .await
            .map_err(|err| TimelineError::transient(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TimelineError::transient(format!(
                "ticket list returned {status}"
            )));
        }

        response
            .json::<Vec<Ticket>>()
            .await
            .map_err(|err| TimelineError::malformed(err.to_string()))
    }

    async fn close_ticket(&self, uuid: Uuid) -> Result<()> {
        let response = self
            .http
            .post(self.url(&self.tickets_path))
            .query(&[("uuid", uuid.to_string())])
            .json(&json!({ "status": "closed" }))
            .send()
            .await
            .map_err(|err| TimelineError::action(0, err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("(no body)"));
        tracing::warn!(%status, "ticket close rejected");
        Err(TimelineError::action(
            status.as_u16(),
            status_message(status, &message),
        ))
    }
}

fn status_message(status: StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    }
}
