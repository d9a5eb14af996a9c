//! Plain-text report rendering.
//!
//! Every section starts with a dashed rule and a title so the output can
//! be skimmed in a terminal, and ends with the attendance table ready to
//! paste into a spreadsheet.

use crate::aggregate::{Attendance, EventAttendance, FetchOutcome};
use crate::sheet::{Delimiter, Matrix};

/// Width of the dashed rule between sections
const RULE_WIDTH: usize = 78;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Places per session
    pub capacity: u32,
    /// Price of one session, in whole currency units
    pub unit_price: u32,
    pub currency: String,
    pub date_format: String,
    pub delimiter: Delimiter,
}

fn section(out: &mut Vec<String>, title: &str) {
    out.push(String::new());
    out.push("-".repeat(RULE_WIDTH));
    out.push(title.to_string());
}

/// `<date>: <n> spaces left - (<names>)`, one line per event
pub fn spaces_left_lines(attendance: &Attendance, options: &ReportOptions) -> Vec<String> {
    attendance
        .events
        .iter()
        .map(|e| {
            let date = e.event.date_key(&options.date_format);
            match &e.outcome {
                FetchOutcome::Fetched(people) => {
                    let left = i64::from(options.capacity) - people.len() as i64;
                    let names: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
                    format!("{}: {} spaces left - ({})", date, left, names.join(", "))
                }
                FetchOutcome::Failed(reason) => format!("{}: RSVPs unavailable ({})", date, reason),
            }
        })
        .collect()
}

/// `- <date>: <link>`, one line per event
pub fn link_lines(attendance: &Attendance, options: &ReportOptions) -> Vec<String> {
    attendance
        .events
        .iter()
        .map(|e| format!("- {}: {}", e.event.date_key(&options.date_format), e.event.link))
        .collect()
}

/// `<name> (<id>): <sessions> (<cost>)`, most sessions first
pub fn session_count_lines(attendance: &Attendance, options: &ReportOptions) -> Vec<String> {
    attendance
        .sessions
        .ranked()
        .into_iter()
        .map(|s| {
            let count = s.count();
            let cost = count as u64 * u64::from(options.unit_price);
            format!("{} ({}): {} ({}{})", s.person.name, s.person.id, count, options.currency, cost)
        })
        .collect()
}

/// Compact one-line summary: `<yyyy-mm-dd>: <count> (<names>)`
pub fn summary_line(event: &EventAttendance) -> String {
    let names: Vec<&str> = event.attendees().iter().map(|p| p.name.as_str()).collect();
    match &event.outcome {
        FetchOutcome::Fetched(_) => format!(
            "{}: {} ({})",
            event.event.local_date.format("%Y-%m-%d"),
            event.attendee_count(),
            names.join(",")
        ),
        FetchOutcome::Failed(reason) => format!(
            "{}: unavailable ({})",
            event.event.local_date.format("%Y-%m-%d"),
            reason
        ),
    }
}

/// Full report: capacity, links, per-person counts and the table.
pub fn render(attendance: &Attendance, matrix: &Matrix, options: &ReportOptions) -> String {
    let mut out = Vec::new();

    section(&mut out, "Session info by event");
    out.extend(spaces_left_lines(attendance, options));

    section(&mut out, "Session links by event");
    out.extend(link_lines(attendance, options));

    section(&mut out, "Session count by person");
    out.extend(session_count_lines(attendance, options));

    section(&mut out, "Table for google sheet");
    out.push(matrix.to_delimited(options.delimiter));

    out.join("\n")
}
