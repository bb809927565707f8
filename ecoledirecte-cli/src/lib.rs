use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ecoledirecte::{homework, Config};
use secrecy::SecretString;

#[derive(Debug, Parser)]
#[clap(version, about = "Fetch your EcoleDirecte schedule, homework and grades")]
pub struct Cli {
    #[clap(long, env = "ECOLEDIRECTE_USERNAME")]
    pub username: String,

    #[clap(long, env = "ECOLEDIRECTE_PASSWORD", hide_env_values = true)]
    pub password: SecretString,

    #[clap(
        long,
        env = "ECOLEDIRECTE_BASE_URL",
        default_value = "https://api.ecoledirecte.com/v3"
    )]
    pub base_url: String,

    /// Write the raw login response to this file.
    #[clap(long)]
    pub snapshot: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Timetable of the current week.
    Schedule {
        /// Any day of the week to show instead of today (YYYY-MM-DD).
        #[clap(long)]
        date: Option<NaiveDate>,
    },

    /// Homework still listed by the portal.
    Homework {
        /// Keep the full portal entries.
        #[clap(long)]
        raw: bool,

        /// Fail on the first description that cannot be decoded.
        #[clap(long)]
        abort_on_decode_error: bool,
    },

    /// Grades by period and subject.
    Grades {
        /// Keep the full portal grades.
        #[clap(long)]
        raw: bool,
    },
}

impl Cli {
    pub fn client_config(&self) -> Config {
        Config {
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            ..Config::default()
        }
    }
}

pub fn detail(raw: bool) -> homework::Detail {
    if raw {
        homework::Detail::Raw
    } else {
        homework::Detail::Reduced
    }
}

pub fn homework_options(raw: bool, abort_on_decode_error: bool) -> homework::Options {
    homework::Options {
        detail: detail(raw),
        on_decode_error: if abort_on_decode_error {
            homework::DecodePolicy::Abort
        } else {
            homework::DecodePolicy::Collect
        },
    }
}
