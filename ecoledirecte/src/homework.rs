//! Homework (`cahierdetexte`).
//!
//! Fetching issues one request for the index of due dates, then one request
//! per due date, strictly in order: each response may rotate the token the
//! next request has to use.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use crate::{
    client::Transport, util::decode_description, week::DATE_FMT, Client, DecodeError, Error,
    Resource, Result, Session,
};

/// How much of each entry to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Detail {
    /// Only subject, done flag, date and description.
    #[default]
    Reduced,
    /// Also keep the full portal entry.
    Raw,
}

/// What to do when a description cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Keep going and report the failure in [`HomeworkBatch::failures`].
    #[default]
    Collect,
    /// Stop at the first failure with [`Error::Decode`].
    Abort,
}

/// Options for [`fetch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Output detail.
    pub detail: Detail,
    /// Decode failure handling.
    pub on_decode_error: DecodePolicy,
}

/// A homework assignment.
#[derive(Debug, Clone, Serialize)]
pub struct HomeworkItem {
    /// Subject name.
    pub subject: String,
    /// Whether the student marked it as done.
    pub done: bool,
    /// Due date.
    pub date: NaiveDate,
    /// Plain text description.
    pub description: String,
    /// The portal entry with `description` added, only with [`Detail::Raw`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// A homework entry whose description could not be decoded.
#[derive(Debug)]
pub struct DecodeFailure {
    /// Due date.
    pub date: NaiveDate,
    /// Subject name.
    pub subject: String,
    /// Why decoding failed.
    pub error: DecodeError,
}

/// Result of [`fetch`].
#[derive(Debug, Default)]
pub struct HomeworkBatch {
    /// Decoded items in due date order, then response order.
    pub items: Vec<HomeworkItem>,
    /// Entries skipped under [`DecodePolicy::Collect`].
    pub failures: Vec<DecodeFailure>,
}

#[derive(Debug, Deserialize)]
struct Day {
    #[serde(rename = "matieres", default)]
    subjects: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "matiere", default)]
    subject: String,
    #[serde(rename = "aFaire")]
    todo: Option<Todo>,
}

#[derive(Debug, Deserialize)]
struct Todo {
    #[serde(rename = "contenu", default)]
    content: String,
    #[serde(rename = "effectue", default)]
    done: bool,
}

/// Turn the subject entries of one due date into homework items. Entries
/// without an `aFaire` block are not homework and are dropped.
///
/// # Errors
///
/// [`Error::Decode`] under [`DecodePolicy::Abort`], [`Error::UnexpectedResponse`]
/// if an entry does not have the expected shape.
pub fn normalize_day(
    date: NaiveDate,
    subjects: Vec<Value>,
    options: Options,
    batch: &mut HomeworkBatch,
) -> Result<()> {
    let resource = Resource::HomeworkDay(date);

    for value in subjects {
        let entry: Entry = serde_json::from_value(value.clone())
            .map_err(|e| Error::unexpected(&resource, e.to_string()))?;

        let Some(todo) = entry.todo else {
            continue;
        };

        let description = match decode_description(&todo.content) {
            Ok(description) => description,
            Err(error) if options.on_decode_error == DecodePolicy::Collect => {
                warn!(%date, subject = %entry.subject, %error, "undecodable homework");
                batch.failures.push(DecodeFailure {
                    date,
                    subject: entry.subject,
                    error,
                });
                continue;
            }
            Err(error) => return Err(error.into()),
        };

        let raw = match options.detail {
            Detail::Reduced => None,
            Detail::Raw => Some(with_description(value, &description)),
        };

        batch.items.push(HomeworkItem {
            subject: entry.subject,
            done: todo.done,
            date,
            description,
            raw,
        });
    }

    Ok(())
}

fn with_description(mut value: Value, description: &str) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert("description".to_owned(), description.into());
    }
    value
}

/// Fetch all homework still listed by the portal.
///
/// # Errors
///
/// Any [`crate::Error`] raised by a request, or [`Error::Decode`] under
/// [`DecodePolicy::Abort`].
#[instrument(skip(client, session))]
pub fn fetch<T: Transport>(
    client: &Client<T>,
    session: &mut Session,
    options: Options,
) -> Result<HomeworkBatch> {
    let index: Value = client.call(
        session,
        Resource::HomeworkIndex,
        "cahierdetexte.awp",
        &json!({}),
    )?;

    // no homework at all comes back as an empty array
    let index = match index {
        Value::Object(map) => map,
        Value::Array(a) if a.is_empty() => Map::new(),
        other => {
            return Err(Error::unexpected(
                &Resource::HomeworkIndex,
                format!("expected an object of due dates, got {other}"),
            ))
        }
    };

    debug!("{} due dates", index.len());

    let mut batch = HomeworkBatch::default();

    for key in index.keys() {
        let date = NaiveDate::parse_from_str(key, DATE_FMT).map_err(|_| {
            Error::unexpected(&Resource::HomeworkIndex, format!("invalid date {key:?}"))
        })?;

        let day: Day = client.call(
            session,
            Resource::HomeworkDay(date),
            &format!("cahierdetexte/{key}.awp"),
            &json!({}),
        )?;

        normalize_day(date, day.subjects, options, &mut batch)?;
    }

    debug!(
        items = batch.items.len(),
        failures = batch.failures.len(),
        "homework fetched"
    );

    Ok(batch)
}
