use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub id: i64,
    pub title: String,
    pub due_date: Option<NaiveDateTime>,
    pub course_id: i64,
}

/// A student's submission. `grade` holds whatever numeric value the
/// backend stored; `Some(NaN)` marks a value that failed conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: Option<i64>,
    pub student_id: i64,
    pub student_name: Option<String>,
    pub assignment_id: i64,
    pub submitted_at: Option<NaiveDateTime>,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub student_id: i64,
    pub student_name: Option<String>,
    pub course_id: i64,
    pub enrolled_at: Option<NaiveDateTime>,
}

/// The (course, student) pair an aggregation is narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    course_id: Option<i64>,
    student_id: Option<i64>,
}

impl Scope {
    pub fn new(course_id: Option<i64>, student_id: Option<i64>) -> Result<Self> {
        if course_id.is_none() && student_id.is_none() {
            return Err(Error::Scope(
                "a scope needs a course id, a student id, or both".to_string(),
            ));
        }
        Ok(Self {
            course_id,
            student_id,
        })
    }

    pub fn student(student_id: i64) -> Self {
        Self {
            course_id: None,
            student_id: Some(student_id),
        }
    }

    pub fn course(course_id: i64) -> Self {
        Self {
            course_id: Some(course_id),
            student_id: None,
        }
    }

    pub fn student_in_course(student_id: i64, course_id: i64) -> Self {
        Self {
            course_id: Some(course_id),
            student_id: Some(student_id),
        }
    }

    pub fn course_id(&self) -> Option<i64> {
        self.course_id
    }

    pub fn student_id(&self) -> Option<i64> {
        self.student_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Assignments,
    Submissions,
    Enrollments,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Assignments => "assignments",
            Collection::Submissions => "submissions",
            Collection::Enrollments => "enrollments",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal problems met while gathering data. They travel with the
/// emitted record so the presentation layer can surface them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    #[serde(rename_all = "camelCase")]
    FetchFailed {
        collection: Collection,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    MalformedRecords {
        collection: Collection,
        count: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::FetchFailed { collection, reason } => {
                write!(f, "could not load {collection}: {reason}")
            }
            Warning::MalformedRecords { collection, count } => {
                write!(f, "skipped {count} malformed {collection} record(s)")
            }
        }
    }
}
