use std::fmt::Write;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::view::{CourseRecord, PerformanceRecord};

fn due_label(due_date: Option<NaiveDateTime>) -> String {
    match due_date {
        Some(due) => format!("due {}", due.format("%Y-%m-%d %H:%M")),
        None => "no due date".to_string(),
    }
}

pub fn build_student_report(record: &PerformanceRecord) -> String {
    let mut output = String::new();
    let scope_label = match record.course_id {
        Some(course_id) => format!("course {course_id}"),
        None => "all enrolled courses".to_string(),
    };

    let _ = writeln!(output, "# Student Performance Report");
    let _ = writeln!(
        output,
        "Student {} in {} (average grade {}%)",
        record.student_id, scope_label, record.average_grade
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Graded Work");

    if record.graded_items.is_empty() {
        let _ = writeln!(output, "No graded work yet.");
    } else {
        for item in record.graded_items.iter() {
            let _ = write!(output, "- {} (#{}): {}", item.title, item.id, item.grade);
            match &item.feedback {
                Some(feedback) => {
                    let _ = writeln!(output, " ({feedback})");
                }
                None => {
                    let _ = writeln!(output);
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Awaiting Grade");

    if record.submitted_items.is_empty() {
        let _ = writeln!(output, "Nothing awaiting a grade.");
    } else {
        for item in record.submitted_items.iter() {
            let submitted = item
                .submitted_at
                .map(|at| format!("submitted {}", at.format("%Y-%m-%d")))
                .unwrap_or_else(|| "submitted".to_string());
            let _ = writeln!(output, "- {} (#{}), {}", item.title, item.id, submitted);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pending");

    if record.pending_items.is_empty() {
        let _ = writeln!(output, "Nothing pending.");
    } else {
        for item in record.pending_items.iter() {
            let _ = writeln!(
                output,
                "- {} (#{}), {}",
                item.title,
                item.id,
                due_label(item.due_date)
            );
        }
    }

    if !record.overdue_items.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Overdue");
        for item in record.overdue_items.iter() {
            let _ = writeln!(
                output,
                "- {} (#{}), {}",
                item.title,
                item.id,
                due_label(item.due_date)
            );
        }
    }

    write_warnings(&mut output, record.warnings.iter().map(ToString::to_string));
    output
}

pub fn build_course_report(record: &CourseRecord) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Course Performance Report");
    let _ = writeln!(
        output,
        "Course {}: average {}%, {} of {} students below {}%",
        record.course_id,
        record.course_average,
        record.below_threshold,
        record.students.len(),
        record.threshold
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");

    if record.students.is_empty() {
        let _ = writeln!(output, "No students found for this course.");
    } else {
        for student in record.students.iter() {
            let name = student
                .name
                .clone()
                .unwrap_or_else(|| format!("Student {}", student.student_id));
            let flag = if student.below_threshold { " (at risk)" } else { "" };
            if student.graded_count == 0 {
                let _ = writeln!(output, "- {name}: no graded work{flag}");
                continue;
            }
            let _ = writeln!(
                output,
                "- {}: {}% across {} graded item(s){}",
                name, student.average_grade, student.graded_count, flag
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Assignments");

    if record.assignments.is_empty() {
        let _ = writeln!(output, "No assignments found for this course.");
    } else {
        for assignment in record.assignments.iter() {
            let _ = writeln!(
                output,
                "- {} (#{}, {}): {} submitted, {} graded, {} missing, average {}%",
                assignment.title,
                assignment.id,
                due_label(assignment.due_date),
                assignment.submitted,
                assignment.graded,
                assignment.missing,
                assignment.average_grade
            );
        }
    }

    write_warnings(&mut output, record.warnings.iter().map(ToString::to_string));
    output
}

fn write_warnings<I>(output: &mut String, warnings: I)
where
    I: Iterator<Item = String>,
{
    let mut warnings = warnings.peekable();
    if warnings.peek().is_none() {
        return;
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Warnings");
    for warning in warnings {
        let _ = writeln!(output, "- {warning}");
    }
}

/// One row per student, in the same order as the report.
pub fn write_roster_csv(record: &CourseRecord, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for student in record.students.iter() {
        writer.serialize(student)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Collection, Warning};
    use crate::view::{AssignmentRow, GradedItem, PendingItem, StudentRow};

    fn student_record() -> PerformanceRecord {
        PerformanceRecord {
            student_id: 1,
            course_id: Some(7),
            average_grade: 85,
            graded_items: vec![GradedItem {
                id: 1,
                title: "Essay".to_string(),
                grade: 85.0,
                feedback: Some("Clear argument".to_string()),
            }],
            pending_items: vec![PendingItem {
                id: 2,
                title: "Lab report".to_string(),
                due_date: None,
            }],
            submitted_items: Vec::new(),
            overdue_items: Vec::new(),
            warnings: vec![Warning::FetchFailed {
                collection: Collection::Enrollments,
                reason: "timeout".to_string(),
            }],
        }
    }

    fn course_record() -> CourseRecord {
        CourseRecord {
            course_id: 7,
            threshold: 70.0,
            course_average: 73,
            below_threshold: 2,
            ungraded_students: 1,
            students: vec![
                StudentRow {
                    student_id: 2,
                    name: Some("Jules Moreno".to_string()),
                    average_grade: 60,
                    graded_count: 1,
                    below_threshold: true,
                },
                StudentRow {
                    student_id: 1,
                    name: Some("Avery Lee".to_string()),
                    average_grade: 86,
                    graded_count: 2,
                    below_threshold: false,
                },
                StudentRow {
                    student_id: 3,
                    name: None,
                    average_grade: 0,
                    graded_count: 0,
                    below_threshold: true,
                },
            ],
            assignments: vec![AssignmentRow {
                id: 1,
                title: "Essay".to_string(),
                due_date: None,
                submitted: 2,
                graded: 2,
                missing: 1,
                average_grade: 73,
            }],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn student_report_lists_sections() {
        let report = build_student_report(&student_record());
        assert!(report.contains("Student 1 in course 7 (average grade 85%)"));
        assert!(report.contains("- Essay (#1): 85 (Clear argument)"));
        assert!(report.contains("- Lab report (#2), no due date"));
        assert!(report.contains("Nothing awaiting a grade."));
        assert!(!report.contains("## Overdue"));
        assert!(report.contains("could not load enrollments: timeout"));
    }

    #[test]
    fn course_report_flags_at_risk_students() {
        let report = build_course_report(&course_record());
        assert!(report.contains("2 of 3 students below 70%"));
        assert!(report.contains("- Jules Moreno: 60% across 1 graded item(s) (at risk)"));
        assert!(report.contains("- Avery Lee: 86% across 2 graded item(s)\n"));
        assert!(report.contains("- Student 3: no graded work (at risk)"));
        assert!(report.contains("2 submitted, 2 graded, 1 missing, average 73%"));
        assert!(!report.contains("## Data Warnings"));
    }

    #[test]
    fn roster_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");

        write_roster_csv(&course_record(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("studentId,name,averageGrade,gradedCount,belowThreshold")
        );
        assert_eq!(lines.next(), Some("2,Jules Moreno,60,1,true"));
        assert_eq!(lines.next(), Some("1,Avery Lee,86,2,false"));
        assert_eq!(lines.next(), Some("3,,0,0,true"));
        assert_eq!(contents.lines().count(), 4);
    }
}
