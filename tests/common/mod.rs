#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode};
use serde_json::{Value, json};

use lms_reports::auth::Authenticator;
use lms_reports::error::AppError;
use lms_reports::lms::dto::*;
use lms_reports::lms::{LmsApi, check_search_term};
use lms_reports::state::AppState;

pub const SECRET: &[u8] = b"test-secret";
pub const HTML_URL: &str = "https://lms.example";
pub const WEB_URL: &str = "https://reports.example";

/// In-memory upstream that records every call it receives.
#[derive(Default)]
pub struct FakeLms {
    pub accounts: HashMap<u64, Account>,
    pub courses: HashMap<u64, Course>,
    pub account_courses: HashMap<u64, Vec<Course>>,
    pub user_courses: HashMap<u64, Vec<Course>>,
    pub sections: HashMap<u64, Section>,
    pub user_enrollments: HashMap<u64, Vec<Enrollment>>,
    pub course_enrollments: HashMap<u64, Vec<Enrollment>>,
    pub section_enrollments: HashMap<u64, Vec<Enrollment>>,
    pub course_assignments: HashMap<u64, Vec<Assignment>>,
    pub assignments: HashMap<u64, Assignment>,
    pub assignment_data: HashMap<(u64, u64), Vec<AssignmentData>>,
    pub submissions: HashMap<(u64, u64), Vec<Submission>>,
    pub account_standards: HashMap<u64, Vec<GradingStandard>>,
    pub course_standards: HashMap<u64, Vec<GradingStandard>>,
    pub audit_pages: Vec<GradeChangeLogPage>,
    pub users: HashMap<u64, User>,
    pub delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeLms {
    async fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Number of recorded calls whose name starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

fn not_found(path: String) -> AppError {
    AppError::Upstream {
        status: StatusCode::NOT_FOUND,
        url: format!("{}/api/v1/{}", HTML_URL, path),
    }
}

fn found<T: Clone>(value: Option<&T>, path: String) -> Result<T, AppError> {
    value.cloned().ok_or_else(|| not_found(path))
}

#[async_trait]
impl LmsApi for FakeLms {
    async fn get_account(&self, account_id: u64) -> Result<Account, AppError> {
        self.record(format!("get_account:{}", account_id)).await;
        found(self.accounts.get(&account_id), format!("accounts/{}", account_id))
    }

    async fn get_course(&self, course_id: u64) -> Result<Course, AppError> {
        self.record(format!("get_course:{}", course_id)).await;
        found(self.courses.get(&course_id), format!("courses/{}", course_id))
    }

    async fn courses_by_account(
        &self,
        account_id: u64,
        search_term: &str,
        _types: &[CourseEnrollmentType],
    ) -> Result<Vec<Course>, AppError> {
        check_search_term(search_term, "course")?;
        self.record(format!("courses_by_account:{}", account_id)).await;
        Ok(self.account_courses.get(&account_id).cloned().unwrap_or_default())
    }

    async fn courses_by_user(&self, user_id: u64) -> Result<Vec<Course>, AppError> {
        self.record(format!("courses_by_user:{}", user_id)).await;
        Ok(self.user_courses.get(&user_id).cloned().unwrap_or_default())
    }

    async fn get_section(&self, section_id: u64) -> Result<Section, AppError> {
        self.record(format!("get_section:{}", section_id)).await;
        found(self.sections.get(&section_id), format!("sections/{}", section_id))
    }

    async fn sections_by_course(&self, course_id: u64) -> Result<Vec<Section>, AppError> {
        self.record(format!("sections_by_course:{}", course_id)).await;
        Ok(self
            .sections
            .values()
            .filter(|s| s.course_id == Some(course_id))
            .cloned()
            .collect())
    }

    async fn enrollments_by_user(
        &self,
        user_id: u64,
        _states: &[EnrollmentState],
    ) -> Result<Vec<Enrollment>, AppError> {
        self.record(format!("enrollments_by_user:{}", user_id)).await;
        Ok(self.user_enrollments.get(&user_id).cloned().unwrap_or_default())
    }

    async fn enrollments_by_course(
        &self,
        course_id: u64,
        _states: &[EnrollmentState],
        _types: &[EnrollmentType],
    ) -> Result<Vec<Enrollment>, AppError> {
        self.record(format!("enrollments_by_course:{}", course_id)).await;
        Ok(self.course_enrollments.get(&course_id).cloned().unwrap_or_default())
    }

    async fn enrollments_by_section(
        &self,
        section_id: u64,
        _states: &[EnrollmentState],
        _types: &[EnrollmentType],
    ) -> Result<Vec<Enrollment>, AppError> {
        self.record(format!("enrollments_by_section:{}", section_id)).await;
        Ok(self.section_enrollments.get(&section_id).cloned().unwrap_or_default())
    }

    async fn assignments_by_course(
        &self,
        course_id: u64,
        search_term: &str,
        _bucket: AssignmentBucket,
        _by_section: bool,
    ) -> Result<Vec<Assignment>, AppError> {
        check_search_term(search_term, "assignment")?;
        self.record(format!("assignments_by_course:{}:{}", course_id, search_term))
            .await;
        Ok(self.course_assignments.get(&course_id).cloned().unwrap_or_default())
    }

    async fn get_assignment(
        &self,
        course_id: u64,
        assignment_id: u64,
        _include_overrides: bool,
    ) -> Result<Assignment, AppError> {
        self.record(format!("get_assignment:{}", assignment_id)).await;
        found(
            self.assignments.get(&assignment_id),
            format!("courses/{}/assignments/{}", course_id, assignment_id),
        )
    }

    async fn assignment_data_for_user(
        &self,
        course_id: u64,
        user_id: u64,
    ) -> Result<Vec<AssignmentData>, AppError> {
        self.record(format!("assignment_data_for_user:{}:{}", course_id, user_id))
            .await;
        Ok(self
            .assignment_data
            .get(&(course_id, user_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn submissions_by_course(
        &self,
        course_id: u64,
        student_id: u64,
        _state: SubmissionWorkflowState,
    ) -> Result<Vec<Submission>, AppError> {
        self.record(format!("submissions_by_course:{}:{}", course_id, student_id))
            .await;
        Ok(self
            .submissions
            .get(&(course_id, student_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn grading_standards(
        &self,
        context: GradingStandardContext,
        context_id: u64,
    ) -> Result<Vec<GradingStandard>, AppError> {
        self.record(format!("grading_standards:{}:{}", context.path_segment(), context_id))
            .await;
        let standards = match context {
            GradingStandardContext::Account => self.account_standards.get(&context_id),
            GradingStandardContext::Course => self.course_standards.get(&context_id),
        };
        Ok(standards.cloned().unwrap_or_default())
    }

    async fn grade_change_logs(
        &self,
        grader_id: u64,
        _start_time: &str,
        _end_time: &str,
    ) -> Result<Vec<GradeChangeLogPage>, AppError> {
        self.record(format!("grade_change_logs:{}", grader_id)).await;
        Ok(self.audit_pages.clone())
    }

    async fn get_user(&self, user_id: u64) -> Result<User, AppError> {
        self.record(format!("get_user:{}", user_id)).await;
        found(self.users.get(&user_id), format!("users/{}", user_id))
    }

    async fn get_user_by_sis_id(&self, sis_id: &str) -> Result<User, AppError> {
        self.record(format!("get_user_by_sis_id:{}", sis_id)).await;
        found(
            self.users
                .values()
                .find(|u| u.sis_user_id.as_deref() == Some(sis_id)),
            format!("users/sis_user_id:{}", sis_id),
        )
    }
}

pub fn app_state(lms: Arc<FakeLms>, request_timeout: Duration) -> AppState {
    let lms: Arc<dyn LmsApi> = lms;
    AppState {
        lms,
        auth: Arc::new(Authenticator::new(SECRET)),
        html_url: HTML_URL.to_string(),
        web_origin: HeaderValue::from_static(WEB_URL),
        request_timeout,
    }
}

fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("fixture should deserialize")
}

pub fn course(id: u64, name: &str, workflow_state: &str) -> Course {
    from_json(json!({
        "id": id,
        "name": name,
        "account_id": 10,
        "root_account_id": 1,
        "workflow_state": workflow_state,
        "account": { "id": 10, "name": "Mathematics" }
    }))
}

pub fn user(id: u64, name: &str, sis_user_id: &str) -> User {
    User {
        id,
        name: name.to_string(),
        sis_user_id: Some(sis_user_id.to_string()),
    }
}

pub fn section(id: u64, name: &str) -> Section {
    from_json(json!({ "id": id, "name": name }))
}

pub fn student_enrollment(user: &User, course_id: u64, section_id: u64, sis_section: Option<&str>) -> Enrollment {
    from_json(json!({
        "id": user.id * 1000 + course_id,
        "user_id": user.id,
        "course_id": course_id,
        "course_section_id": section_id,
        "sis_section_id": sis_section,
        "enrollment_state": "active",
        "role": "StudentEnrollment",
        "type": "StudentEnrollment",
        "grades": {
            "html_url": format!("{}/courses/{}/grades/{}", HTML_URL, course_id, user.id),
            "current_score": 81.5,
            "current_grade": "B"
        },
        "user": { "id": user.id, "name": user.name, "sis_user_id": user.sis_user_id }
    }))
}

pub fn teacher_enrollment(teacher: &str, section_id: u64, sis_section: Option<&str>) -> Enrollment {
    from_json(json!({
        "id": section_id * 100,
        "user_id": 900,
        "course_id": 1,
        "course_section_id": section_id,
        "sis_section_id": sis_section,
        "enrollment_state": "active",
        "role": "TeacherEnrollment",
        "type": "TeacherEnrollment",
        "user": { "id": 900, "name": teacher }
    }))
}

pub fn assignment(value: Value) -> Assignment {
    from_json(value)
}

pub fn assignment_data(title: &str, points_possible: Option<f64>, score: Option<f64>, submitted_at: Option<&str>) -> AssignmentData {
    from_json(json!({
        "assignment_id": 1,
        "title": title,
        "points_possible": points_possible,
        "due_at": "2025-03-01T23:59:00Z",
        "status": "on_time",
        "submission": { "score": score, "submitted_at": submitted_at }
    }))
}

pub fn standard(id: u64, title: &str) -> GradingStandard {
    from_json(json!({ "id": id, "title": title }))
}

pub fn audit_page(value: Value) -> GradeChangeLogPage {
    from_json(value)
}
