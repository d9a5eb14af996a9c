//! Application configuration management.
//!
//! Holds which Meetup group and session series to report on, plus the
//! presentation settings of the report and sheet.
//!
//! Configuration is stored at `~/.config/rsvp-roll/config.json`. Every
//! field is optional in the file; missing fields take the defaults below.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::DateRange;
use crate::models::event::DEFAULT_DATE_FORMAT;
use crate::reconcile::SheetLayout;
use crate::report::ReportOptions;
use crate::sheet::Delimiter;

/// Application name used for the config directory path
const APP_NAME: &str = "rsvp-roll";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Meetup group URL name
    pub group: String,
    /// Exact name of the recurring event
    pub event_name: String,
    /// Events window; `None` lists only what Meetup shows by default
    pub events_window: Option<DateRange>,
    pub capacity: u32,
    pub unit_price: u32,
    pub currency: String,
    pub title_link: String,
    pub link_suffix: String,
    pub date_format: String,
    pub delimiter: Delimiter,
    /// Cap on concurrent RSVP fetches; `None` fetches all at once
    pub max_concurrent_fetches: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        let midnight = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(0, 0, 0));
        let events_window = match (midnight(2021, 9, 1), midnight(2022, 5, 1)) {
            (Some(from), Some(to)) => Some(DateRange { from, to }),
            _ => None,
        };

        Self {
            group: "Silicon-Throwabout".to_string(),
            event_name: "Indoor Ultimate Frisbee in *Hackney Community College* on Thursday evenings"
                .to_string(),
            events_window,
            capacity: 18,
            unit_price: 5,
            currency: "£".to_string(),
            title_link: "https://tinyurl.com/SiThrowabout".to_string(),
            link_suffix: "attendees".to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            delimiter: Delimiter::Tab,
            max_concurrent_fetches: None,
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            debug!(path = %path.display(), "Loaded config");
            Ok(config)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn sheet_layout(&self) -> SheetLayout {
        SheetLayout {
            title_link: self.title_link.clone(),
            link_suffix: self.link_suffix.clone(),
            date_format: self.date_format.clone(),
        }
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            capacity: self.capacity,
            unit_price: self.unit_price,
            currency: self.currency.clone(),
            date_format: self.date_format.clone(),
            delimiter: self.delimiter,
        }
    }
}
