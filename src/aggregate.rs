use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;

use crate::models::{Assignment, Submission};

pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 100.0;

/// A stored grade counts only if it is a real number inside 0..=100.
pub fn valid_grade(grade: f64) -> Option<f64> {
    (grade.is_finite() && (MIN_GRADE..=MAX_GRADE).contains(&grade)).then_some(grade)
}

/// Rounded mean of the valid grades; 0 when there are none.
pub fn average_grade<I>(grades: I) -> u32
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = grades
        .into_iter()
        .filter_map(valid_grade)
        .fold((0.0, 0usize), |(sum, count), grade| (sum + grade, count + 1));

    if count == 0 {
        0
    } else {
        (sum / count as f64).round() as u32
    }
}

/// Strictly below: a student sitting exactly on the threshold is not
/// counted.
pub fn count_below_threshold<I>(averages: I, threshold: f64) -> usize
where
    I: IntoIterator<Item = u32>,
{
    averages
        .into_iter()
        .filter(|average| f64::from(*average) < threshold)
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignmentStatus {
    Graded(f64),
    /// Submitted but without a usable grade yet.
    Submitted,
    /// Not submitted, due today or later, or with no due date.
    Pending,
    /// Not submitted and past due.
    Overdue,
}

/// Due dates at or after local midnight today are still open.
pub fn is_open(due_date: Option<NaiveDateTime>, today: NaiveDate) -> bool {
    due_date.map_or(true, |due| due >= today.and_time(NaiveTime::MIN))
}

pub fn classify(
    assignment: &Assignment,
    submission: Option<&Submission>,
    today: NaiveDate,
) -> AssignmentStatus {
    match submission {
        Some(submission) => match submission.grade {
            Some(grade) => match valid_grade(grade) {
                Some(grade) => AssignmentStatus::Graded(grade),
                None => {
                    warn!(
                        assignment_id = assignment.id,
                        student_id = submission.student_id,
                        grade,
                        "ignoring stored grade outside 0..=100"
                    );
                    AssignmentStatus::Submitted
                }
            },
            None => AssignmentStatus::Submitted,
        },
        None if is_open(assignment.due_date, today) => AssignmentStatus::Pending,
        None => AssignmentStatus::Overdue,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentAggregate<'a> {
    pub graded: Vec<(&'a Assignment, &'a Submission, f64)>,
    pub submitted: Vec<(&'a Assignment, &'a Submission)>,
    pub pending: Vec<&'a Assignment>,
    pub overdue: Vec<&'a Assignment>,
    pub average_grade: u32,
}

/// Partitions the in-scope assignments for one student. Every assignment
/// lands in exactly one of the four lists.
pub fn aggregate_student<'a>(
    assignments: &[&'a Assignment],
    submissions: &HashMap<i64, &'a Submission>,
    today: NaiveDate,
) -> StudentAggregate<'a> {
    let mut graded = Vec::new();
    let mut submitted = Vec::new();
    let mut pending = Vec::new();
    let mut overdue = Vec::new();

    for &assignment in assignments {
        let submission = submissions.get(&assignment.id).copied();
        match (classify(assignment, submission, today), submission) {
            (AssignmentStatus::Graded(grade), Some(submission)) => {
                graded.push((assignment, submission, grade))
            }
            (AssignmentStatus::Submitted, Some(submission)) => {
                submitted.push((assignment, submission))
            }
            (AssignmentStatus::Pending, _) => pending.push(assignment),
            (AssignmentStatus::Overdue, _) => overdue.push(assignment),
            // classify only reports these when a submission exists
            (AssignmentStatus::Graded(_) | AssignmentStatus::Submitted, None) => {}
        }
    }

    let average_grade = average_grade(graded.iter().map(|(_, _, grade)| *grade));

    StudentAggregate {
        graded,
        submitted,
        pending,
        overdue,
        average_grade,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentStanding {
    pub student_id: i64,
    pub name: Option<String>,
    pub average_grade: u32,
    pub graded_count: usize,
    pub below_threshold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStats<'a> {
    pub assignment: &'a Assignment,
    pub submitted: usize,
    pub graded: usize,
    pub missing: usize,
    pub average_grade: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseAggregate<'a> {
    pub students: Vec<StudentStanding>,
    pub assignments: Vec<AssignmentStats<'a>>,
    pub course_average: u32,
    pub below_threshold: usize,
    pub ungraded_students: usize,
}

pub fn aggregate_course<'a>(
    assignments: &[&'a Assignment],
    roster: &BTreeMap<i64, Option<String>>,
    by_student: &HashMap<i64, HashMap<i64, &'a Submission>>,
    threshold: f64,
) -> CourseAggregate<'a> {
    let empty = HashMap::new();
    let mut students = Vec::with_capacity(roster.len());
    let mut course_grades = Vec::new();

    for (&student_id, name) in roster {
        let submissions = by_student.get(&student_id).unwrap_or(&empty);
        let grades: Vec<f64> = assignments
            .iter()
            .filter_map(|assignment| submissions.get(&assignment.id))
            .filter_map(|submission| submission.grade.and_then(valid_grade))
            .collect();
        let average = average_grade(grades.iter().copied());
        let name = name.clone().or_else(|| {
            submissions
                .values()
                .find_map(|submission| submission.student_name.clone())
        });

        students.push(StudentStanding {
            student_id,
            name,
            average_grade: average,
            graded_count: grades.len(),
            below_threshold: f64::from(average) < threshold,
        });
        course_grades.extend(grades);
    }

    // an empty average is 0 and counts against the threshold like any other
    let below_threshold = count_below_threshold(
        students.iter().map(|standing| standing.average_grade),
        threshold,
    );
    let ungraded_students = students
        .iter()
        .filter(|standing| standing.graded_count == 0)
        .count();

    students.sort_by(|a, b| {
        (a.graded_count == 0)
            .cmp(&(b.graded_count == 0))
            .then(a.average_grade.cmp(&b.average_grade))
            .then(a.student_id.cmp(&b.student_id))
    });

    let assignments = assignments
        .iter()
        .map(|&assignment| assignment_stats(assignment, roster, by_student))
        .collect();

    CourseAggregate {
        students,
        assignments,
        course_average: average_grade(course_grades),
        below_threshold,
        ungraded_students,
    }
}

fn assignment_stats<'a>(
    assignment: &'a Assignment,
    roster: &BTreeMap<i64, Option<String>>,
    by_student: &HashMap<i64, HashMap<i64, &Submission>>,
) -> AssignmentStats<'a> {
    let submissions: Vec<&Submission> = roster
        .keys()
        .filter_map(|student_id| by_student.get(student_id)?.get(&assignment.id).copied())
        .collect();
    let grades: Vec<f64> = submissions
        .iter()
        .filter_map(|submission| submission.grade.and_then(valid_grade))
        .collect();

    AssignmentStats {
        assignment,
        submitted: submissions.len(),
        graded: grades.len(),
        missing: roster.len() - submissions.len(),
        average_grade: average_grade(grades),
    }
}
