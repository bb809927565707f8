//! Weekly timetable (`emploidutemps`).
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::{Europe::Paris, Tz};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use crate::{
    client::Transport,
    util::portal_datetime,
    week::{DateWindow, DATE_FMT},
    Client, Resource, Result, Session,
};

/// One slot of the timetable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Subject name, e.g. `FRANCAIS`.
    #[serde(rename = "matiere", default)]
    pub subject: String,

    /// Local start time.
    #[serde(rename = "start_date", with = "portal_datetime")]
    pub start: NaiveDateTime,

    /// Local end time.
    #[serde(rename = "end_date", with = "portal_datetime")]
    pub end: NaiveDateTime,

    /// Everything else the portal sends (`prof`, `salle`, `isAnnule`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScheduleEntry {
    const TZ: Tz = Paris;

    /// Sort key within a day.
    #[must_use]
    pub fn minutes_since_midnight(&self) -> u32 {
        self.start.hour() * 60 + self.start.minute()
    }

    /// Calendar day of the entry.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.start.date()
    }

    /// Start as UTC, `None` if the local time does not exist.
    #[must_use]
    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        to_utc(&self.start)
    }

    /// End as UTC, `None` if the local time does not exist.
    #[must_use]
    pub fn end_utc(&self) -> Option<DateTime<Utc>> {
        to_utc(&self.end)
    }
}

fn to_utc(local: &NaiveDateTime) -> Option<DateTime<Utc>> {
    ScheduleEntry::TZ
        .from_local_datetime(local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A week of entries keyed by day. All seven days are always present.
#[derive(Debug, Clone, Serialize)]
pub struct WeekSchedule {
    days: BTreeMap<NaiveDate, Vec<ScheduleEntry>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    outside: Vec<ScheduleEntry>,
}

impl WeekSchedule {
    /// Days in order with their entries.
    pub fn days(&self) -> impl Iterator<Item = (&NaiveDate, &Vec<ScheduleEntry>)> {
        self.days.iter()
    }

    /// Entries of `day`, `None` if the day is outside the week.
    #[must_use]
    pub fn get(&self, day: NaiveDate) -> Option<&[ScheduleEntry]> {
        self.days.get(&day).map(Vec::as_slice)
    }

    /// Entries of a `YYYY-MM-DD` day.
    #[must_use]
    pub fn get_str(&self, day: &str) -> Option<&[ScheduleEntry]> {
        NaiveDate::parse_from_str(day, DATE_FMT)
            .ok()
            .and_then(|d| self.get(d))
    }

    /// Entries the portal returned for days outside the week, in response order.
    #[must_use]
    pub fn outside(&self) -> &[ScheduleEntry] {
        &self.outside
    }

    /// Number of entries within the week.
    #[must_use]
    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    /// Whether the week has no entries within its days.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition `entries` into the days of `window`, each day ordered by start
/// time. Equal start times keep the response order. Entries of other days are
/// kept apart in [`WeekSchedule::outside`].
#[must_use]
pub fn group_by_day(window: &DateWindow, entries: Vec<ScheduleEntry>) -> WeekSchedule {
    let mut days: BTreeMap<_, Vec<ScheduleEntry>> =
        window.days().into_iter().map(|d| (d, Vec::new())).collect();

    let mut outside = Vec::new();

    for entry in entries {
        match days.get_mut(&entry.day()) {
            Some(day) => day.push(entry),
            None => {
                warn!(subject = %entry.subject, start = %entry.start, "entry outside of week");
                outside.push(entry);
            }
        }
    }

    for day in days.values_mut() {
        day.sort_by_key(ScheduleEntry::minutes_since_midnight);
    }

    WeekSchedule { days, outside }
}

/// Fetch the timetable of `window`.
///
/// # Errors
///
/// Any [`crate::Error`] raised by the request.
#[instrument(skip(client, session))]
pub fn fetch<T: Transport>(
    client: &Client<T>,
    session: &mut Session,
    window: &DateWindow,
) -> Result<WeekSchedule> {
    let payload = json!({
        "dateDebut": window.start.format(DATE_FMT).to_string(),
        "dateFin": window.end.format(DATE_FMT).to_string(),
        "avecTrous": false,
    });

    let entries: Vec<ScheduleEntry> = client.call(
        session,
        Resource::Schedule {
            start: window.start,
            end: window.end,
        },
        "emploidutemps.awp",
        &payload,
    )?;

    debug!("got {} entries", entries.len());

    Ok(group_by_day(window, entries))
}
