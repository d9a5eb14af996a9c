//! Data models for Meetup entities.
//!
//! This module contains the data structures used to represent
//! Meetup data including:
//!
//! - `Event`, `EventStatus`: occurrences of the recurring session
//! - `Rsvp`, `RsvpMember`: raw RSVP entries as returned by the API
//! - `Person`, `MemberId`: attendees, keyed by their stable member id

pub mod event;
pub mod person;

pub use event::{Event, EventStatus, Rsvp, RsvpMember};
pub use person::{MemberId, Person};
