#![doc = include_str!("../README.md")]
#![warn(
    unreachable_pub,
    missing_debug_implementations,
    missing_docs,
    clippy::pedantic
)]

mod client;
pub mod grades;
pub mod homework;
pub mod schedule;
mod session;
mod util;
pub mod week;

use std::fmt;

use chrono::NaiveDate;

pub use client::*;
pub use session::*;
pub use util::{decode_description, parse_mark, strip_markup, DecodeError};

/// The portal resource a request was made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// `login.awp`.
    Login,

    /// `emploidutemps.awp` for a date window.
    Schedule {
        /// First day (Monday).
        start: NaiveDate,
        /// Last day (Sunday).
        end: NaiveDate,
    },

    /// `cahierdetexte.awp`, the index of due dates.
    HomeworkIndex,

    /// `cahierdetexte/{date}.awp`.
    HomeworkDay(NaiveDate),

    /// `notes.awp`.
    Grades,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Schedule { start, end } => write!(f, "schedule {start}..{end}"),
            Self::HomeworkIndex => write!(f, "homework index"),
            Self::HomeworkDay(date) => write!(f, "homework for {date}"),
            Self::Grades => write!(f, "grades"),
        }
    }
}

/// An error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport failed before any response was received.
    #[error("network error ({resource}): {source}")]
    Network {
        /// Requested resource.
        resource: Resource,
        /// Underlying transport error.
        source: TransportError,
    },

    /// Credentials rejected, token missing or token no longer accepted.
    #[error("authentication failed: {details}")]
    Authentication {
        /// Detailed error information (human readable).
        details: String,
    },

    /// The portal answered with something we could not make sense of.
    #[error("unexpected response ({resource}): {details}")]
    UnexpectedResponse {
        /// Requested resource.
        resource: Resource,
        /// Detailed error information (human readable).
        details: String,
    },

    /// A homework description could not be decoded.
    #[error("decoding failed: {0}")]
    Decode(#[from] DecodeError),
}

impl Error {
    pub(crate) fn unexpected(resource: &Resource, details: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            resource: resource.clone(),
            details: details.into(),
        }
    }
}

/// EcoleDirecte result.
pub type Result<T, E = Error> = core::result::Result<T, E>;
