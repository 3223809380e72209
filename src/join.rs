//! Lookup indices over the normalized collections.
//!
//! Keys are the numeric identifiers produced by [`crate::schema`]; matching
//! is plain `i64` equality. Wherever two records share a key, the one seen
//! last in fetch order wins.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Assignment, Enrollment, Submission};

pub fn index_assignments<'a, I>(assignments: I) -> HashMap<i64, &'a Assignment>
where
    I: IntoIterator<Item = &'a Assignment>,
{
    assignments
        .into_iter()
        .map(|assignment| (assignment.id, assignment))
        .collect()
}

pub fn assignments_in_course(assignments: &[Assignment], course_id: i64) -> Vec<&Assignment> {
    select_assignments(assignments, |assignment| assignment.course_id == course_id)
}

pub fn assignments_in_courses<'a>(
    assignments: &'a [Assignment],
    course_ids: &HashSet<i64>,
) -> Vec<&'a Assignment> {
    select_assignments(assignments, |assignment| {
        course_ids.contains(&assignment.course_id)
    })
}

/// Keeps fetch order by first appearance of each id while taking the
/// last record seen for that id.
fn select_assignments<F>(assignments: &[Assignment], keep: F) -> Vec<&Assignment>
where
    F: Fn(&Assignment) -> bool,
{
    let mut order = Vec::new();
    let mut latest: HashMap<i64, &Assignment> = HashMap::new();

    for assignment in assignments.iter().filter(|assignment| keep(assignment)) {
        if latest.insert(assignment.id, assignment).is_none() {
            order.push(assignment.id);
        }
    }

    order
        .into_iter()
        .filter_map(|id| latest.get(&id).copied())
        .collect()
}

pub fn enrolled_courses(enrollments: &[Enrollment], student_id: i64) -> HashSet<i64> {
    enrollments
        .iter()
        .filter(|enrollment| enrollment.student_id == student_id)
        .map(|enrollment| enrollment.course_id)
        .collect()
}

/// Students enrolled in a course, keyed by id, with whatever display name
/// the backend embedded.
pub fn enrolled_students(enrollments: &[Enrollment], course_id: i64) -> BTreeMap<i64, Option<String>> {
    let mut students = BTreeMap::new();
    for enrollment in enrollments
        .iter()
        .filter(|enrollment| enrollment.course_id == course_id)
    {
        let name = students.entry(enrollment.student_id).or_insert(None);
        if enrollment.student_name.is_some() {
            *name = enrollment.student_name.clone();
        }
    }
    students
}

/// Assignment id → the student's submission for it.
pub fn submissions_for_student(
    submissions: &[Submission],
    student_id: i64,
) -> HashMap<i64, &Submission> {
    submissions
        .iter()
        .filter(|submission| submission.student_id == student_id)
        .map(|submission| (submission.assignment_id, submission))
        .collect()
}

/// Student id → (assignment id → submission), restricted to the given
/// assignments.
pub fn submissions_by_student<'a>(
    submissions: &'a [Submission],
    assignments: &HashMap<i64, &Assignment>,
) -> HashMap<i64, HashMap<i64, &'a Submission>> {
    let mut grouped: HashMap<i64, HashMap<i64, &Submission>> = HashMap::new();
    for submission in submissions
        .iter()
        .filter(|submission| assignments.contains_key(&submission.assignment_id))
    {
        grouped
            .entry(submission.student_id)
            .or_default()
            .insert(submission.assignment_id, submission);
    }
    grouped
}

/// Students who submitted anything for the given assignments. Used as the
/// roster when enrollments could not be loaded.
pub fn submitting_students(
    submissions: &[Submission],
    assignments: &HashMap<i64, &Assignment>,
) -> BTreeMap<i64, Option<String>> {
    let mut students = BTreeMap::new();
    for submission in submissions
        .iter()
        .filter(|submission| assignments.contains_key(&submission.assignment_id))
    {
        let name = students.entry(submission.student_id).or_insert(None);
        if submission.student_name.is_some() {
            *name = submission.student_name.clone();
        }
    }
    students
}
