//! rsvp-roll core: attendance tracking for a recurring Meetup session.
//!
//! - `api`: Meetup REST client and the `RsvpSource` seam
//! - `aggregate`: concurrent RSVP fetching and per-event/per-person totals
//! - `sheet`: the tab-separated sheet format and attendance marks
//! - `reconcile`: merging live attendance into a previously exported sheet
//! - `report`: plain-text report rendering
//! - `config`: user configuration

pub mod aggregate;
pub mod api;
pub mod config;
pub mod models;
pub mod reconcile;
pub mod report;
pub mod sheet;

pub use aggregate::{collect_attendance, Attendance, EventAttendance, FetchOutcome};
pub use api::{ApiError, DateRange, MeetupClient, RsvpSource};
pub use config::Config;
pub use reconcile::{reconcile, Reconciliation, RefreshFilter, SheetLayout};
pub use report::ReportOptions;
pub use sheet::{AttendanceMark, Delimiter, Matrix, PriorSheet, SheetError};
