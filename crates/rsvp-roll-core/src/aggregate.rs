//! Attendance aggregation.
//!
//! Fans out one RSVP fetch per event, waits for all of them, and folds
//! the results into an `Attendance`: the attendee set of every event (in
//! fetch order) plus the sessions attended by every person.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::api::RsvpSource;
use crate::models::{Event, MemberId, Person};

/// Result of fetching the RSVPs of one event.
///
/// Kept distinct from an empty attendee list so a failed fetch is never
/// mistaken for an event nobody signed up to.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(Vec<Person>),
    Failed(String),
}

impl FetchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    /// Attendees, or an empty slice for a failed fetch
    pub fn attendees(&self) -> &[Person] {
        match self {
            FetchOutcome::Fetched(people) => people,
            FetchOutcome::Failed(_) => &[],
        }
    }
}

/// One event and what its RSVP fetch produced.
#[derive(Debug, Clone)]
pub struct EventAttendance {
    pub event: Event,
    pub outcome: FetchOutcome,
    attendee_ids: HashSet<MemberId>,
}

impl EventAttendance {
    pub fn new(event: Event, outcome: FetchOutcome) -> Self {
        let attendee_ids = outcome.attendees().iter().map(|p| p.id).collect();
        Self {
            event,
            outcome,
            attendee_ids,
        }
    }

    pub fn attendees(&self) -> &[Person] {
        self.outcome.attendees()
    }

    pub fn is_attending(&self, id: MemberId) -> bool {
        self.attendee_ids.contains(&id)
    }

    pub fn attendee_count(&self) -> usize {
        self.attendees().len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonSessions {
    pub person: Person,
    pub dates: Vec<NaiveDate>,
}

impl PersonSessions {
    pub fn count(&self) -> usize {
        self.dates.len()
    }
}

/// Sessions attended per member, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SessionsByPerson {
    order: Vec<MemberId>,
    by_id: HashMap<MemberId, PersonSessions>,
}

impl SessionsByPerson {
    fn record(&mut self, person: &Person, date: NaiveDate) {
        match self.by_id.get_mut(&person.id) {
            Some(entry) => {
                // Latest name wins; members rename themselves.
                entry.person.name.clone_from(&person.name);
                entry.dates.push(date);
            }
            None => {
                self.order.push(person.id);
                self.by_id.insert(
                    person.id,
                    PersonSessions {
                        person: person.clone(),
                        dates: vec![date],
                    },
                );
            }
        }
    }

    pub fn get(&self, id: MemberId) -> Option<&PersonSessions> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Everyone, in the order they were first seen
    pub fn iter(&self) -> impl Iterator<Item = &PersonSessions> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    /// Most sessions first; equal counts ordered by member id
    pub fn ranked(&self) -> Vec<&PersonSessions> {
        let mut ranked: Vec<&PersonSessions> = self.iter().collect();
        ranked.sort_by(|a, b| {
            b.count()
                .cmp(&a.count())
                .then_with(|| a.person.id.cmp(&b.person.id))
        });
        ranked
    }
}

/// Everything fetched in one run.
#[derive(Debug, Clone, Default)]
pub struct Attendance {
    pub events: Vec<EventAttendance>,
    pub sessions: SessionsByPerson,
}

impl Attendance {
    /// Build the per-event record and per-person sessions from fetch results.
    /// Order of `results` is preserved.
    pub fn from_outcomes(results: Vec<(Event, FetchOutcome)>) -> Self {
        let mut sessions = SessionsByPerson::default();
        let mut events = Vec::with_capacity(results.len());

        for (event, outcome) in results {
            for person in outcome.attendees() {
                sessions.record(person, event.local_date);
            }
            events.push(EventAttendance::new(event, outcome));
        }

        Self { events, sessions }
    }

    pub fn failed_count(&self) -> usize {
        self.events.iter().filter(|e| e.outcome.is_failed()).count()
    }

    /// Display name of a member as last seen in live data
    pub fn latest_name(&self, id: MemberId) -> Option<&str> {
        self.sessions.get(id).map(|s| s.person.name.as_str())
    }
}

/// Fetch the attendees of every event and aggregate them.
///
/// All fetches are issued before any result is used. `max_concurrent`
/// caps how many are in flight at once; `None` issues them all together.
/// A failed fetch is logged and recorded as `FetchOutcome::Failed`; it
/// never aborts the other fetches.
pub async fn collect_attendance<S>(
    source: &S,
    events: Vec<Event>,
    max_concurrent: Option<usize>,
) -> Attendance
where
    S: RsvpSource + ?Sized,
{
    let limit = max_concurrent.unwrap_or(events.len()).max(1);
    debug!(events = events.len(), limit, "Fetching RSVPs");

    let results: Vec<(Event, FetchOutcome)> = stream::iter(events)
        .map(|event| async move {
            let outcome = match source.fetch_attendees(&event.id).await {
                Ok(people) => {
                    debug!(
                        event_id = %event.id,
                        date = %event.local_date,
                        yes = people.len(),
                        "RSVPs fetched"
                    );
                    FetchOutcome::Fetched(people)
                }
                Err(e) => {
                    let reason = format!("{:#}", e);
                    warn!(
                        event_id = %event.id,
                        date = %event.local_date,
                        error = %reason,
                        "RSVP fetch failed"
                    );
                    FetchOutcome::Failed(reason)
                }
            };
            (event, outcome)
        })
        .buffered(limit)
        .collect()
        .await;

    let attendance = Attendance::from_outcomes(results);
    info!(
        events = attendance.events.len(),
        people = attendance.sessions.len(),
        failed = attendance.failed_count(),
        "Attendance aggregated"
    );
    attendance
}
