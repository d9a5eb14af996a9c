use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::person::{MemberId, Person};

/// Default date key format (`dd/mm/yy`), used for sheet column headers.
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Past,
    /// Anything else Meetup reports (cancelled, draft, ...)
    #[serde(other)]
    Other,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Upcoming => write!(f, "upcoming"),
            EventStatus::Past => write!(f, "past"),
            EventStatus::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub local_date: NaiveDate,
    #[serde(default)]
    pub local_time: Option<String>,
    #[serde(default)]
    pub link: String,
    pub status: EventStatus,
}

impl Event {
    /// Canonical column key for this event. Keyed by date rather than id
    /// because Meetup rotates event ids and links.
    pub fn date_key(&self, format: &str) -> String {
        self.local_date.format(format).to_string()
    }

    pub fn is_upcoming(&self) -> bool {
        self.status == EventStatus::Upcoming
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsvpMember {
    pub id: MemberId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rsvp {
    pub response: String,
    pub member: RsvpMember,
}

impl Rsvp {
    pub fn is_yes(&self) -> bool {
        self.response == "yes"
    }

    pub fn into_person(self) -> Person {
        Person {
            id: self.member.id,
            name: self.member.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_JSON: &str = r#"{
        "id": "280934512",
        "name": "Indoor Ultimate Frisbee",
        "local_date": "2021-09-02",
        "local_time": "19:00",
        "link": "https://www.meetup.com/Silicon-Throwabout/events/280934512/",
        "status": "past",
        "yes_rsvp_count": 17
    }"#;

    #[test]
    fn test_parse_event() {
        let event: Event = serde_json::from_str(EVENT_JSON).expect("event should parse");
        assert_eq!(event.id, "280934512");
        assert_eq!(event.local_date, NaiveDate::from_ymd_opt(2021, 9, 2).unwrap());
        assert_eq!(event.local_time.as_deref(), Some("19:00"));
        assert_eq!(event.status, EventStatus::Past);
        assert!(!event.is_upcoming());
    }

    #[test]
    fn test_unknown_status_is_other() {
        let json = EVENT_JSON.replace("\"past\"", "\"cancelled\"");
        let event: Event = serde_json::from_str(&json).expect("event should parse");
        assert_eq!(event.status, EventStatus::Other);
    }

    #[test]
    fn test_date_key() {
        let event: Event = serde_json::from_str(EVENT_JSON).unwrap();
        assert_eq!(event.date_key(DEFAULT_DATE_FORMAT), "02/09/21");
        assert_eq!(event.date_key("%-d %b"), "2 Sep");
    }

    #[test]
    fn test_rsvp_yes_filter() {
        let json = r#"[
            {"response": "yes", "member": {"id": 1, "name": "Bob"}},
            {"response": "no", "member": {"id": 2, "name": "Cara"}},
            {"response": "waitlist", "member": {"id": 3, "name": "Dev"}}
        ]"#;
        let rsvps: Vec<Rsvp> = serde_json::from_str(json).unwrap();
        let people: Vec<Person> = rsvps
            .into_iter()
            .filter(Rsvp::is_yes)
            .map(Rsvp::into_person)
            .collect();
        assert_eq!(people, vec![Person::new(1, "Bob")]);
    }
}
