//! Presentation-ready records. Building them is pure shaping of the
//! aggregator output; no further decisions are made here.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::aggregate::{CourseAggregate, StudentAggregate};
use crate::models::{Assignment, Warning};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub student_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i64>,
    pub average_grade: u32,
    pub graded_items: Vec<GradedItem>,
    pub pending_items: Vec<PendingItem>,
    pub submitted_items: Vec<SubmittedItem>,
    pub overdue_items: Vec<PendingItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedItem {
    pub id: i64,
    pub title: String,
    pub grade: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    pub id: i64,
    pub title: String,
    pub due_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedItem {
    pub id: i64,
    pub title: String,
    pub submitted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    pub course_id: i64,
    pub threshold: f64,
    pub course_average: u32,
    pub below_threshold: usize,
    pub ungraded_students: usize,
    pub students: Vec<StudentRow>,
    pub assignments: Vec<AssignmentRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub student_id: i64,
    pub name: Option<String>,
    pub average_grade: u32,
    pub graded_count: usize,
    pub below_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRow {
    pub id: i64,
    pub title: String,
    pub due_date: Option<NaiveDateTime>,
    pub submitted: usize,
    pub graded: usize,
    pub missing: usize,
    pub average_grade: u32,
}

pub fn student_record(
    student_id: i64,
    course_id: Option<i64>,
    aggregate: &StudentAggregate<'_>,
    warnings: Vec<Warning>,
) -> PerformanceRecord {
    PerformanceRecord {
        student_id,
        course_id,
        average_grade: aggregate.average_grade,
        graded_items: aggregate
            .graded
            .iter()
            .map(|(assignment, submission, grade)| GradedItem {
                id: assignment.id,
                title: assignment.title.clone(),
                grade: *grade,
                feedback: submission.feedback.clone(),
            })
            .collect(),
        pending_items: aggregate.pending.iter().map(|a| pending_item(a)).collect(),
        submitted_items: aggregate
            .submitted
            .iter()
            .map(|(assignment, submission)| SubmittedItem {
                id: assignment.id,
                title: assignment.title.clone(),
                submitted_at: submission.submitted_at,
            })
            .collect(),
        overdue_items: aggregate.overdue.iter().map(|a| pending_item(a)).collect(),
        warnings,
    }
}

fn pending_item(assignment: &Assignment) -> PendingItem {
    PendingItem {
        id: assignment.id,
        title: assignment.title.clone(),
        due_date: assignment.due_date,
    }
}

pub fn course_record(
    course_id: i64,
    threshold: f64,
    aggregate: &CourseAggregate<'_>,
    warnings: Vec<Warning>,
) -> CourseRecord {
    CourseRecord {
        course_id,
        threshold,
        course_average: aggregate.course_average,
        below_threshold: aggregate.below_threshold,
        ungraded_students: aggregate.ungraded_students,
        students: aggregate
            .students
            .iter()
            .map(|standing| StudentRow {
                student_id: standing.student_id,
                name: standing.name.clone(),
                average_grade: standing.average_grade,
                graded_count: standing.graded_count,
                below_threshold: standing.below_threshold,
            })
            .collect(),
        assignments: aggregate
            .assignments
            .iter()
            .map(|stats| AssignmentRow {
                id: stats.assignment.id,
                title: stats.assignment.title.clone(),
                due_date: stats.assignment.due_date,
                submitted: stats.submitted,
                graded: stats.graded,
                missing: stats.missing,
                average_grade: stats.average_grade,
            })
            .collect(),
        warnings,
    }
}
