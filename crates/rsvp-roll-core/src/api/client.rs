//! API client for communicating with the Meetup.com REST API.
//!
//! This module provides the `MeetupClient` struct for fetching the
//! events of a group and the attendees of each event.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{Event, Person, Rsvp};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the Meetup REST API
const API_BASE_URL: &str = "https://api.meetup.com";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Datetime format Meetup expects for `no_earlier_than` / `no_later_than`
const MEETUP_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Event statuses requested from the events listing
const EVENT_STATUS_FILTER: &str = "past,upcoming";

/// Inclusive window of local datetimes to list events for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl DateRange {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("no_earlier_than", self.from.format(MEETUP_DATETIME_FORMAT).to_string()),
            ("no_later_than", self.to.format(MEETUP_DATETIME_FORMAT).to_string()),
            ("status", EVENT_STATUS_FILTER.to_string()),
        ]
    }
}

/// Anything that can list the confirmed attendees of an event.
///
/// `MeetupClient` is the production implementation; the aggregator only
/// depends on this trait.
#[async_trait]
pub trait RsvpSource: Send + Sync {
    async fn fetch_attendees(&self, event_id: &str) -> Result<Vec<Person>>;
}

/// API client for a single Meetup group.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct MeetupClient {
    client: Client,
    base_url: String,
    group: String,
}

impl MeetupClient {
    /// Create a new API client for `group` (the group's URL name)
    pub fn new(group: impl Into<String>) -> Result<Self> {
        Self::with_base_url(group, API_BASE_URL)
    }

    /// Create a client against a different API host (used by tests)
    pub fn with_base_url(group: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            group: group.into(),
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    // ===== Data Fetching Methods =====

    /// Fetch the group's events named exactly `event_name`.
    ///
    /// With a `range`, past and upcoming events inside it are listed;
    /// without one, Meetup's default listing (upcoming only) is used.
    pub async fn fetch_events(&self, event_name: &str, range: Option<DateRange>) -> Result<Vec<Event>> {
        let url = format!("{}/{}/events", self.base_url, self.group);
        let query = range.map(|r| r.query()).unwrap_or_default();

        debug!(group = %self.group, ?range, "Fetching events");

        let events: Vec<Event> = self.get(&url, &query).await?;
        let total = events.len();
        let matching: Vec<Event> = events.into_iter().filter(|e| e.name == event_name).collect();

        debug!(total, matching = matching.len(), "Events response received");
        Ok(matching)
    }

    /// Fetch the members who answered "yes" to an event
    pub async fn fetch_rsvps(&self, event_id: &str) -> Result<Vec<Person>> {
        let url = format!("{}/{}/events/{}/rsvps", self.base_url, self.group, event_id);

        let rsvps: Vec<Rsvp> = self.get(&url, &[]).await?;
        let total = rsvps.len();
        let attendees: Vec<Person> = rsvps
            .into_iter()
            .filter(Rsvp::is_yes)
            .map(Rsvp::into_person)
            .collect();

        debug!(event_id, total, yes = attendees.len(), "RSVPs response received");
        Ok(attendees)
    }
}

#[async_trait]
impl RsvpSource for MeetupClient {
    async fn fetch_attendees(&self, event_id: &str) -> Result<Vec<Person>> {
        self.fetch_rsvps(event_id).await
    }
}
