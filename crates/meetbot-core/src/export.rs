//! Export links.
//!
//! The bot does not render exports itself; it hands the user a link to the
//! reporting service, which serves the file. The link has the shape
//! `{base}/api/export/{user}/{format}/?from=YYYY-MM-DD&to=YYYY-MM-DD&type=...`
//! with every query parameter optional.

use std::fmt;

use chrono::NaiveDate;
use meetbot_models::{format_date, UserId};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Which records go into the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportScope {
    #[default]
    All,
    Calendar,
    Meetings,
}

impl ExportScope {
    /// Value of the `type` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            ExportScope::All => "all",
            ExportScope::Calendar => "calendar",
            ExportScope::Meetings => "meetings",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportScope::All => "all events and meetings",
            ExportScope::Calendar => "calendar events",
            ExportScope::Meetings => "meetings",
        }
    }

    /// Menu choice `1..=3`.
    pub fn from_choice(choice: u8) -> Option<Self> {
        match choice {
            1 => Some(ExportScope::All),
            2 => Some(ExportScope::Calendar),
            3 => Some(ExportScope::Meetings),
            _ => None,
        }
    }
}

/// File format of the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Structured data.
    #[default]
    Json,
    /// Tabular.
    Csv,
    /// Calendar interchange.
    Ical,
}

impl ExportFormat {
    /// Path segment of the export URL.
    pub fn as_path(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Ical => "ical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Json => "JSON (structured data)",
            ExportFormat::Csv => "CSV (spreadsheet)",
            ExportFormat::Ical => "iCalendar (calendar apps)",
        }
    }

    /// Menu choice `1..=3`.
    pub fn from_choice(choice: u8) -> Option<Self> {
        match choice {
            1 => Some(ExportFormat::Json),
            2 => Some(ExportFormat::Csv),
            3 => Some(ExportFormat::Ical),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Filters chosen for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportRequest {
    pub scope: ExportScope,
    pub format: ExportFormat,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ExportRequest {
    /// Everything as JSON.
    pub fn quick() -> Self {
        Self::default()
    }
}

/// A downloadable export the user can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDescriptor {
    pub url: Url,
    pub request: ExportRequest,
}

impl ExportDescriptor {
    /// Human description of what the link contains.
    pub fn describe(&self) -> String {
        let range = match (self.request.from, self.request.to) {
            (Some(from), Some(to)) => format!("{} - {}", format_date(from), format_date(to)),
            (Some(from), None) => format!("from {}", format_date(from)),
            (None, Some(to)) => format!("until {}", format_date(to)),
            (None, None) => "all dates".to_string(),
        };
        format!(
            "Export of {} as {}, {}.\nDownload: {}",
            self.request.scope.label(),
            self.request.format,
            range,
            self.url
        )
    }
}

/// Build the export link for `user`.
pub fn build_descriptor(base: &Url, user: UserId, request: ExportRequest) -> Result<ExportDescriptor> {
    let mut url = base.join(&format!("api/export/{}/{}/", user, request.format.as_path()))?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(from) = request.from {
            query.append_pair("from", &from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = request.to {
            query.append_pair("to", &to.format("%Y-%m-%d").to_string());
        }
        if request.scope != ExportScope::All {
            query.append_pair("type", request.scope.as_param());
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(ExportDescriptor { url, request })
}
