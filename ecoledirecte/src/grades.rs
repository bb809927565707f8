//! Grades (`notes`), grouped by period, subject code and subject name.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

pub use crate::homework::Detail;
use crate::{client::Transport, util::string_or_number, Client, Error, Resource, Result, Session};

/// A single grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeEntry {
    /// Name of the assessment.
    pub label: String,
    /// Mark as sent by the portal, e.g. `"12,5"` or `"Abs"`.
    pub value: String,
    /// Weight.
    pub coefficient: String,
    /// Class average for this assessment.
    pub class_average: String,
    /// Lowest mark in the class.
    pub class_min: String,
    /// Highest mark in the class.
    pub class_max: String,
    /// The portal grade, only with [`Detail::Raw`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// Subject code → subject name → grades.
pub type BySubject = BTreeMap<String, BTreeMap<String, Vec<GradeEntry>>>;

/// Grades of one period, with the period averages.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodGrades {
    /// Period code, e.g. `A001`.
    pub code: String,
    /// Period name, e.g. `1er Trimestre`.
    pub name: String,
    /// Student's overall average.
    pub average: Option<String>,
    /// Class overall average.
    pub class_average: Option<String>,
    /// Best overall average in the class.
    pub class_max: Option<String>,
    /// Worst overall average in the class.
    pub class_min: Option<String>,
    /// Every known (code, name) pair, possibly with no grades.
    pub subjects: BySubject,
}

/// All periods, in portal order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Grades {
    periods: Vec<PeriodGrades>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    unassigned: BySubject,
}

impl Grades {
    /// Periods in portal order.
    #[must_use]
    pub fn periods(&self) -> &[PeriodGrades] {
        &self.periods
    }

    /// Look a period up by name.
    #[must_use]
    pub fn period(&self, name: &str) -> Option<&PeriodGrades> {
        self.periods.iter().find(|p| p.name == name)
    }

    /// Grades whose period is not among [`Grades::periods`].
    #[must_use]
    pub fn unassigned(&self) -> &BySubject {
        &self.unassigned
    }

    /// Every grade, period by period, then the unassigned ones.
    pub fn entries(&self) -> impl Iterator<Item = &GradeEntry> {
        self.periods
            .iter()
            .map(|p| &p.subjects)
            .chain(std::iter::once(&self.unassigned))
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .flatten()
    }
}

#[derive(Debug, Deserialize)]
struct Data {
    #[serde(rename = "periodes", default)]
    periods: Vec<Period>,
    #[serde(default)]
    notes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(rename = "codePeriode")]
    code: String,
    #[serde(rename = "periode")]
    name: String,
    #[serde(rename = "ensembleMatieres", default)]
    summary: Summary,
}

#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(rename = "moyenneGenerale", default, deserialize_with = "string_or_number")]
    average: String,
    #[serde(rename = "moyenneClasse", default, deserialize_with = "string_or_number")]
    class_average: String,
    #[serde(rename = "moyenneMax", default, deserialize_with = "string_or_number")]
    class_max: String,
    #[serde(rename = "moyenneMin", default, deserialize_with = "string_or_number")]
    class_min: String,
}

#[derive(Debug, Deserialize)]
struct Note {
    #[serde(rename = "codePeriode")]
    period: String,
    #[serde(rename = "codeMatiere")]
    subject_code: String,
    #[serde(rename = "libelleMatiere", default)]
    subject_name: String,
    #[serde(rename = "devoir", default)]
    label: String,
    #[serde(rename = "valeur", default, deserialize_with = "string_or_number")]
    value: String,
    #[serde(rename = "coef", default, deserialize_with = "string_or_number")]
    coefficient: String,
    #[serde(rename = "moyenneClasse", default, deserialize_with = "string_or_number")]
    class_average: String,
    #[serde(rename = "minClasse", default, deserialize_with = "string_or_number")]
    class_min: String,
    #[serde(rename = "maxClasse", default, deserialize_with = "string_or_number")]
    class_max: String,
}

impl Note {
    fn into_entry(self, raw: Option<Value>) -> GradeEntry {
        GradeEntry {
            label: self.label,
            value: self.value,
            coefficient: self.coefficient,
            class_average: self.class_average,
            class_min: self.class_min,
            class_max: self.class_max,
            raw,
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    Some(s).filter(|s| !s.is_empty())
}

fn group(data: Data, detail: Detail) -> Result<Grades> {
    let notes = data
        .notes
        .into_iter()
        .map(|value| {
            let note: Note = serde_json::from_value(value.clone())
                .map_err(|e| Error::unexpected(&Resource::Grades, e.to_string()))?;
            Ok((note, value))
        })
        .collect::<Result<Vec<_>>>()?;

    // a code may appear under several names, keep both levels
    let mut names_by_code: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (note, _) in &notes {
        names_by_code
            .entry(&note.subject_code)
            .or_default()
            .insert(&note.subject_name);
    }

    let skeleton: BySubject = names_by_code
        .into_iter()
        .map(|(code, names)| {
            let names = names
                .into_iter()
                .map(|name| (name.to_owned(), Vec::new()))
                .collect();
            (code.to_owned(), names)
        })
        .collect();

    let mut periods: Vec<PeriodGrades> = data
        .periods
        .into_iter()
        .map(|p| PeriodGrades {
            code: p.code,
            name: p.name,
            average: non_empty(p.summary.average),
            class_average: non_empty(p.summary.class_average),
            class_max: non_empty(p.summary.class_max),
            class_min: non_empty(p.summary.class_min),
            subjects: skeleton.clone(),
        })
        .collect();

    let mut unassigned = BySubject::new();
    let mut orphans = 0_usize;

    for (note, value) in notes {
        let subjects = match periods.iter_mut().find(|p| p.code == note.period) {
            Some(period) => &mut period.subjects,
            None => {
                orphans += 1;
                &mut unassigned
            }
        };

        let raw = match detail {
            Detail::Reduced => None,
            Detail::Raw => Some(value),
        };

        subjects
            .entry(note.subject_code.clone())
            .or_default()
            .entry(note.subject_name.clone())
            .or_default()
            .push(note.into_entry(raw));
    }

    if orphans > 0 {
        warn!(orphans, "grades with an unknown period");
    }

    Ok(Grades {
        periods,
        unassigned,
    })
}

/// Fetch every grade of the current school year.
///
/// # Errors
///
/// Any [`crate::Error`] raised by the request.
#[instrument(skip(client, session))]
pub fn fetch<T: Transport>(
    client: &Client<T>,
    session: &mut Session,
    detail: Detail,
) -> Result<Grades> {
    let data: Data = client.call(
        session,
        Resource::Grades,
        "notes.awp",
        &json!({ "anneeScolaire": "" }),
    )?;

    debug!(
        periods = data.periods.len(),
        notes = data.notes.len(),
        "got grades"
    );

    group(data, detail)
}
