//! Retrieval of the raw collections an aggregation needs.
//!
//! Collections are fetched concurrently and every fetch is allowed to fail
//! on its own: a failed collection becomes empty and leaves a [`Warning`]
//! behind instead of aborting the aggregation.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Assignment, Collection, Enrollment, Submission, Warning};
use crate::schema::{self, Normalized};

/// The REST endpoints this crate reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AllAssignments,
    CourseAssignments(i64),
    StudentSubmissions(i64),
    CourseSubmissions(i64),
    StudentEnrollments(i64),
    CourseEnrollments(i64),
}

impl Endpoint {
    pub fn collection(&self) -> Collection {
        match self {
            Endpoint::AllAssignments | Endpoint::CourseAssignments(_) => Collection::Assignments,
            Endpoint::StudentSubmissions(_) | Endpoint::CourseSubmissions(_) => {
                Collection::Submissions
            }
            Endpoint::StudentEnrollments(_) | Endpoint::CourseEnrollments(_) => {
                Collection::Enrollments
            }
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::AllAssignments => "/assignments".to_string(),
            Endpoint::CourseAssignments(id) => format!("/assignments/course/{id}"),
            Endpoint::StudentSubmissions(id) => format!("/submissions/student/{id}"),
            Endpoint::CourseSubmissions(id) => format!("/submissions/course/{id}"),
            Endpoint::StudentEnrollments(id) => format!("/enrollments/student/{id}"),
            Endpoint::CourseEnrollments(id) => format!("/enrollments/course/{id}"),
        }
    }
}

/// Anything that can hand back the JSON records behind an [`Endpoint`].
pub trait CollectionSource {
    fn fetch(&self, endpoint: Endpoint) -> impl Future<Output = Result<Vec<Value>>>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP source backed by the LMS REST API.
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid API base URL {base_url:?}: {e}")))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token: config.token.filter(|token| !token.is_empty()),
        })
    }

    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

impl CollectionSource for ApiClient {
    async fn fetch(&self, endpoint: Endpoint) -> Result<Vec<Value>> {
        let url = self.url_for(endpoint);
        debug!(%url, "requesting collection");

        let mut request = self.client.get(&url).header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.trim().chars().take(200).collect();
            return Err(Error::HttpStatus(format!("{status} from {url}: {excerpt}")));
        }

        let body: Value = response.json().await?;
        into_records(body, endpoint.collection())
    }
}

/// Reads exported API responses (`assignments.json`, `submissions.json`,
/// `enrollments.json`) from a directory. Scoping is left to the joiner, so
/// each file may hold the full collection.
pub struct SnapshotSource {
    dir: PathBuf,
}

impl SnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl CollectionSource for SnapshotSource {
    async fn fetch(&self, endpoint: Endpoint) -> Result<Vec<Value>> {
        let collection = endpoint.collection();
        let path = self.dir.join(format!("{collection}.json"));
        debug!(path = %path.display(), "reading snapshot");
        let bytes = tokio::fs::read(&path).await?;
        let body: Value = serde_json::from_slice(&bytes)?;
        into_records(body, collection)
    }
}

/// Accepts a bare JSON array, or a page object wrapping one under
/// `content`, `data` or `items`.
pub fn into_records(body: Value, collection: Collection) -> Result<Vec<Value>> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut page) => ["content", "data", "items"]
            .iter()
            .find_map(|key| match page.remove(*key) {
                Some(Value::Array(records)) => Some(records),
                _ => None,
            })
            .ok_or_else(|| {
                Error::UnexpectedShape(format!("expected an array of {collection}"))
            }),
        _ => Err(Error::UnexpectedShape(format!(
            "expected an array of {collection}"
        ))),
    }
}

/// Which endpoint to hit for each collection. Enrollments are optional
/// because a student scoped to one course does not need them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    pub assignments: Endpoint,
    pub submissions: Endpoint,
    pub enrollments: Option<Endpoint>,
}

impl FetchPlan {
    pub fn for_student(student_id: i64, course_id: Option<i64>) -> Self {
        match course_id {
            Some(course_id) => Self {
                assignments: Endpoint::CourseAssignments(course_id),
                submissions: Endpoint::StudentSubmissions(student_id),
                enrollments: None,
            },
            None => Self {
                assignments: Endpoint::AllAssignments,
                submissions: Endpoint::StudentSubmissions(student_id),
                enrollments: Some(Endpoint::StudentEnrollments(student_id)),
            },
        }
    }

    pub fn for_course(course_id: i64) -> Self {
        Self {
            assignments: Endpoint::CourseAssignments(course_id),
            submissions: Endpoint::CourseSubmissions(course_id),
            enrollments: Some(Endpoint::CourseEnrollments(course_id)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collections {
    pub assignments: Vec<Assignment>,
    pub submissions: Vec<Submission>,
    pub enrollments: Vec<Enrollment>,
    pub warnings: Vec<Warning>,
}

pub async fn fetch_collections<S: CollectionSource>(source: &S, plan: &FetchPlan) -> Collections {
    let (assignments, submissions, enrollments) = tokio::join!(
        source.fetch(plan.assignments),
        source.fetch(plan.submissions),
        async {
            match plan.enrollments {
                Some(endpoint) => Some(source.fetch(endpoint).await),
                None => None,
            }
        }
    );

    let mut warnings = Vec::new();
    let assignments = absorb(
        assignments,
        Collection::Assignments,
        schema::normalize_assignments,
        &mut warnings,
    );
    let submissions = absorb(
        submissions,
        Collection::Submissions,
        schema::normalize_submissions,
        &mut warnings,
    );
    let enrollments = match enrollments {
        Some(outcome) => absorb(
            outcome,
            Collection::Enrollments,
            schema::normalize_enrollments,
            &mut warnings,
        ),
        None => Vec::new(),
    };

    Collections {
        assignments,
        submissions,
        enrollments,
        warnings,
    }
}

fn absorb<T>(
    outcome: Result<Vec<Value>>,
    collection: Collection,
    normalize: fn(Vec<Value>) -> Normalized<T>,
    warnings: &mut Vec<Warning>,
) -> Vec<T> {
    match outcome {
        Ok(values) => {
            let normalized = normalize(values);
            if normalized.skipped > 0 {
                warnings.push(Warning::MalformedRecords {
                    collection,
                    count: normalized.skipped,
                });
            }
            normalized.records
        }
        Err(err) => {
            warn!(%collection, error = %err, "fetch failed, continuing without it");
            warnings.push(Warning::FetchFailed {
                collection,
                reason: err.to_string(),
            });
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemorySource;
    use serde_json::json;

    #[test]
    fn endpoints_map_to_paths() {
        assert_eq!(Endpoint::AllAssignments.path(), "/assignments");
        assert_eq!(Endpoint::CourseAssignments(4).path(), "/assignments/course/4");
        assert_eq!(Endpoint::StudentSubmissions(9).path(), "/submissions/student/9");
        assert_eq!(Endpoint::CourseEnrollments(4).path(), "/enrollments/course/4");
        assert_eq!(
            Endpoint::StudentEnrollments(9).collection(),
            Collection::Enrollments
        );
    }

    #[test]
    fn student_plan_needs_enrollments_only_without_course() {
        let plan = FetchPlan::for_student(1, None);
        assert_eq!(plan.assignments, Endpoint::AllAssignments);
        assert_eq!(plan.enrollments, Some(Endpoint::StudentEnrollments(1)));

        let plan = FetchPlan::for_student(1, Some(3));
        assert_eq!(plan.assignments, Endpoint::CourseAssignments(3));
        assert_eq!(plan.enrollments, None);
    }

    #[test]
    fn page_objects_are_unwrapped() {
        let records = into_records(json!({ "content": [1, 2] }), Collection::Assignments).unwrap();
        assert_eq!(records.len(), 2);
        assert!(into_records(json!({ "total": 2 }), Collection::Assignments).is_err());
        assert!(into_records(json!("nope"), Collection::Assignments).is_err());
    }

    #[test]
    fn api_client_rejects_bad_base_url() {
        let result = ApiClient::new(ClientConfig::new("not a url"));
        assert!(matches!(result, Err(Error::Config(_))));

        let client = ApiClient::new(ClientConfig::new("http://lms.test/api/")).unwrap();
        assert_eq!(
            client.url_for(Endpoint::CourseSubmissions(2)),
            "http://lms.test/api/submissions/course/2"
        );
    }

    #[tokio::test]
    async fn failed_collection_becomes_empty_with_warning() {
        let source = MemorySource::new()
            .with(
                Collection::Assignments,
                json!([{ "assignmentId": 1, "title": "Essay", "course": { "courseId": 2 } }]),
            )
            .failing(Collection::Submissions, "503 Service Unavailable");

        let collections = fetch_collections(&source, &FetchPlan::for_student(1, Some(2))).await;

        assert_eq!(collections.assignments.len(), 1);
        assert!(collections.submissions.is_empty());
        assert!(collections.enrollments.is_empty());
        assert_eq!(collections.warnings.len(), 1);
        assert!(matches!(
            &collections.warnings[0],
            Warning::FetchFailed { collection: Collection::Submissions, .. }
        ));
        assert_eq!(
            source.requested(),
            vec![Endpoint::CourseAssignments(2), Endpoint::StudentSubmissions(1)]
        );
    }

    #[tokio::test]
    async fn malformed_records_are_counted() {
        let source = MemorySource::new()
            .with(Collection::Assignments, json!([]))
            .with(
                Collection::Submissions,
                json!([
                    { "student": { "userId": 1 }, "assignment": {}, "grade": 50 },
                    { "student": { "userId": 1 }, "assignment": { "assignmentId": 3 }, "grade": 70 }
                ]),
            );

        let collections = fetch_collections(&source, &FetchPlan::for_student(1, Some(2))).await;

        assert_eq!(collections.submissions.len(), 1);
        assert_eq!(
            collections.warnings,
            vec![Warning::MalformedRecords {
                collection: Collection::Submissions,
                count: 1,
            }]
        );
    }

    #[tokio::test]
    async fn snapshot_source_reads_collection_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("assignments.json"),
            r#"[{ "assignmentId": 1, "title": "Essay", "course": { "courseId": 2 } }]"#,
        )
        .unwrap();

        let source = SnapshotSource::new(dir.path());
        let records = source.fetch(Endpoint::CourseAssignments(2)).await.unwrap();
        assert_eq!(records.len(), 1);

        let missing = source.fetch(Endpoint::CourseSubmissions(2)).await;
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
