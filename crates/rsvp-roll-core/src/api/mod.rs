//! REST API client module for Meetup.com.
//!
//! This module provides the `MeetupClient` for fetching a group's events
//! and the "yes" RSVPs of each event, and the `RsvpSource` trait the
//! attendance aggregator consumes.
//!
//! The public Meetup endpoints used here need no authentication.

pub mod client;
pub mod error;

pub use client::{DateRange, MeetupClient, RsvpSource};
pub use error::ApiError;
