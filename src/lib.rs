//! Performance aggregation for an LMS client.
//!
//! Assignments, submissions and enrollments are fetched from the LMS REST
//! API, joined on their numeric identifiers and reduced into
//! [`PerformanceRecord`]s (one student) or [`CourseRecord`]s (one course)
//! ready for presentation.

pub mod aggregate;
pub mod error;
pub mod fetch;
pub mod join;
pub mod logging;
pub mod models;
pub mod performance;
pub mod report;
pub mod schema;
pub mod view;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use fetch::{ApiClient, ClientConfig, CollectionSource, SnapshotSource};
pub use models::Scope;
pub use performance::{compute_course_performance, compute_performance};
pub use view::{CourseRecord, PerformanceRecord};
