//! Entry points used by presentation code: fetch, join, aggregate and emit
//! in one call.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::aggregate;
use crate::error::{Error, Result};
use crate::fetch::{fetch_collections, CollectionSource, Collections, FetchPlan};
use crate::join;
use crate::models::Scope;
use crate::view::{self, CourseRecord, PerformanceRecord};

/// Performance of one student, optionally narrowed to one course.
///
/// Fetch failures and malformed records never fail the call; they are
/// reported in [`PerformanceRecord::warnings`]. The only error is a scope
/// without a student.
pub async fn compute_performance<S: CollectionSource>(
    source: &S,
    scope: &Scope,
    today: NaiveDate,
) -> Result<PerformanceRecord> {
    let student_id = scope.student_id().ok_or_else(|| {
        Error::Scope("student performance needs a student id".to_string())
    })?;
    let course_id = scope.course_id();
    let run_id = Uuid::new_v4();

    async move {
        let plan = FetchPlan::for_student(student_id, course_id);
        let collections = fetch_collections(source, &plan).await;
        let record = student_performance(student_id, course_id, &collections, today);
        info!(
            graded = record.graded_items.len(),
            pending = record.pending_items.len(),
            average = record.average_grade,
            warnings = record.warnings.len(),
            "student performance computed"
        );
        Ok(record)
    }
    .instrument(info_span!("aggregation", %run_id, student_id, course_id = ?course_id))
    .await
}

/// Per-student averages for a course and how many fall strictly below
/// `threshold`.
pub async fn compute_course_performance<S: CollectionSource>(
    source: &S,
    course_id: i64,
    threshold: f64,
) -> Result<CourseRecord> {
    if !threshold.is_finite() {
        return Err(Error::Scope(format!(
            "threshold must be a finite number, got {threshold}"
        )));
    }
    let run_id = Uuid::new_v4();

    async move {
        let plan = FetchPlan::for_course(course_id);
        let collections = fetch_collections(source, &plan).await;
        let record = course_performance(course_id, threshold, &collections);
        info!(
            students = record.students.len(),
            below_threshold = record.below_threshold,
            course_average = record.course_average,
            warnings = record.warnings.len(),
            "course performance computed"
        );
        Ok(record)
    }
    .instrument(info_span!("aggregation", %run_id, course_id, threshold))
    .await
}

/// The synchronous half of [`compute_performance`], over already fetched
/// collections.
///
/// Without a course, the student's courses are those they are enrolled in
/// plus any course they have submitted work for.
pub fn student_performance(
    student_id: i64,
    course_id: Option<i64>,
    collections: &Collections,
    today: NaiveDate,
) -> PerformanceRecord {
    let assignments = match course_id {
        Some(course_id) => join::assignments_in_course(&collections.assignments, course_id),
        None => {
            let mut courses = join::enrolled_courses(&collections.enrollments, student_id);
            courses.extend(submitted_courses(collections, student_id));
            join::assignments_in_courses(&collections.assignments, &courses)
        }
    };
    let submissions = join::submissions_for_student(&collections.submissions, student_id);
    let aggregate = aggregate::aggregate_student(&assignments, &submissions, today);
    view::student_record(student_id, course_id, &aggregate, collections.warnings.clone())
}

fn submitted_courses(collections: &Collections, student_id: i64) -> HashSet<i64> {
    let index = join::index_assignments(&collections.assignments);
    collections
        .submissions
        .iter()
        .filter(|submission| submission.student_id == student_id)
        .filter_map(|submission| index.get(&submission.assignment_id))
        .map(|assignment| assignment.course_id)
        .collect()
}

/// The synchronous half of [`compute_course_performance`].
///
/// The roster comes from enrollments; when none are available it falls
/// back to the students who submitted work for the course.
pub fn course_performance(course_id: i64, threshold: f64, collections: &Collections) -> CourseRecord {
    let assignments = join::assignments_in_course(&collections.assignments, course_id);
    let in_course = join::index_assignments(assignments.iter().copied());

    let mut roster = join::enrolled_students(&collections.enrollments, course_id);
    if roster.is_empty() {
        roster = join::submitting_students(&collections.submissions, &in_course);
    }

    let by_student = join::submissions_by_student(&collections.submissions, &in_course);
    let aggregate = aggregate::aggregate_course(&assignments, &roster, &by_student, threshold);
    view::course_record(course_id, threshold, &aggregate, collections.warnings.clone())
}
