//! Wire shapes returned by the LMS API and their normalization into the
//! strict entity types in [`crate::models`].
//!
//! The backend embeds foreign keys in nested objects
//! (`{ student: { userId }, assignment: { assignmentId, course: { courseId } } }`)
//! and is loose about types: identifiers may arrive as numbers or numeric
//! strings, grades as numbers, strings or null. Everything is decoded here
//! so the joiner and aggregator only ever see `i64` keys and `f64` grades.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{Assignment, Collection, Enrollment, Submission};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseRef {
    #[serde(default)]
    course_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRef {
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl UserRef {
    fn display_name(self) -> Option<String> {
        self.name
            .or(self.username)
            .filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentWire {
    #[serde(default)]
    assignment_id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    due_date: Option<Value>,
    #[serde(default)]
    course: Option<CourseRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionWire {
    #[serde(default)]
    submission_id: Option<Value>,
    #[serde(default)]
    student: Option<UserRef>,
    #[serde(default)]
    assignment: Option<AssignmentWire>,
    #[serde(default, alias = "submissionDate")]
    submitted_at: Option<Value>,
    #[serde(default)]
    grade: Option<Value>,
    #[serde(default)]
    feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollmentWire {
    #[serde(default)]
    student: Option<UserRef>,
    #[serde(default)]
    course: Option<CourseRef>,
    #[serde(default, alias = "enrolledAt")]
    enrollment_date: Option<Value>,
}

/// Records that survived normalization, plus how many were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

pub fn normalize_assignments(values: Vec<Value>) -> Normalized<Assignment> {
    normalize(values, Collection::Assignments, |wire: AssignmentWire| {
        Some(Assignment {
            id: coerce_id(wire.assignment_id.as_ref()?)?,
            title: wire.title.unwrap_or_default(),
            due_date: wire.due_date.as_ref().and_then(parse_timestamp),
            course_id: coerce_id(wire.course?.course_id.as_ref()?)?,
        })
    })
}

pub fn normalize_submissions(values: Vec<Value>) -> Normalized<Submission> {
    normalize(values, Collection::Submissions, |wire: SubmissionWire| {
        let student = wire.student?;
        let student_id = coerce_id(student.user_id.as_ref()?)?;
        let assignment_id = coerce_id(wire.assignment?.assignment_id.as_ref()?)?;
        Some(Submission {
            id: wire.submission_id.as_ref().and_then(coerce_id),
            student_id,
            student_name: student.display_name(),
            assignment_id,
            submitted_at: wire.submitted_at.as_ref().and_then(parse_timestamp),
            grade: coerce_grade(wire.grade.as_ref()),
            feedback: wire.feedback,
        })
    })
}

pub fn normalize_enrollments(values: Vec<Value>) -> Normalized<Enrollment> {
    normalize(values, Collection::Enrollments, |wire: EnrollmentWire| {
        let student = wire.student?;
        let student_id = coerce_id(student.user_id.as_ref()?)?;
        Some(Enrollment {
            student_id,
            student_name: student.display_name(),
            course_id: coerce_id(wire.course?.course_id.as_ref()?)?,
            enrolled_at: wire.enrollment_date.as_ref().and_then(parse_timestamp),
        })
    })
}

fn normalize<W, T, F>(values: Vec<Value>, collection: Collection, convert: F) -> Normalized<T>
where
    W: DeserializeOwned,
    F: Fn(W) -> Option<T>,
{
    let mut records = Vec::with_capacity(values.len());
    let mut skipped = 0usize;

    for (index, value) in values.into_iter().enumerate() {
        let record = serde_json::from_value::<W>(value)
            .ok()
            .and_then(&convert);
        match record {
            Some(record) => records.push(record),
            None => {
                debug!(%collection, index, "skipping record without required identifiers");
                skipped += 1;
            }
        }
    }

    Normalized { records, skipped }
}

/// Numeric identifiers only: `12` and `"12"` both become `12`.
pub fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f))
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// `None` means ungraded. Anything present that is not a number becomes
/// `NaN` so the aggregator can exclude it without guessing.
pub fn coerce_grade(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Null => None,
        Value::Number(number) => Some(number.as_f64().unwrap_or(f64::NAN)),
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.trim().parse().unwrap_or(f64::NAN)),
        _ => Some(f64::NAN),
    }
}

/// Accepts RFC 3339 (converted to local time), naive date-times and plain
/// dates. A plain date means midnight of that day.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Local).naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}
