pub mod client;
pub mod dto;

use std::env;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ConfigError;
use crate::error::AppError;
use client::{PagedClient, endpoint, endpoint_with_segment};
use dto::*;

const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug)]
pub struct LmsConfig {
    pub base_url: String,
    pub access_token: String,
    pub page_size: u32,
    pub timeout: Duration,
}

impl LmsConfig {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("LMS_BASE_URL").map_err(|_| ConfigError::Missing("LMS_BASE_URL"))?;
        let access_token =
            env::var("LMS_ACCESS_TOKEN").map_err(|_| ConfigError::Missing("LMS_ACCESS_TOKEN"))?;

        let page_size = match env::var("LMS_PAGE_SIZE") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid("LMS_PAGE_SIZE", value))?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        let timeout_secs = match env::var("LMS_TIMEOUT_SECS") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid("LMS_TIMEOUT_SECS", value))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            access_token,
            page_size,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Browser-facing root of the LMS, i.e. the API base without `/api/v1`.
    pub fn html_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        base.strip_suffix("/api/v1").unwrap_or(base).to_string()
    }
}

/// Read-only access to the upstream LMS resources the reports are built from.
#[async_trait]
pub trait LmsApi: Send + Sync {
    async fn get_account(&self, account_id: u64) -> Result<Account, AppError>;

    async fn get_course(&self, course_id: u64) -> Result<Course, AppError>;
    async fn courses_by_account(
        &self,
        account_id: u64,
        search_term: &str,
        types: &[CourseEnrollmentType],
    ) -> Result<Vec<Course>, AppError>;
    async fn courses_by_user(&self, user_id: u64) -> Result<Vec<Course>, AppError>;

    async fn get_section(&self, section_id: u64) -> Result<Section, AppError>;
    async fn sections_by_course(&self, course_id: u64) -> Result<Vec<Section>, AppError>;

    async fn enrollments_by_user(
        &self,
        user_id: u64,
        states: &[EnrollmentState],
    ) -> Result<Vec<Enrollment>, AppError>;
    async fn enrollments_by_course(
        &self,
        course_id: u64,
        states: &[EnrollmentState],
        types: &[EnrollmentType],
    ) -> Result<Vec<Enrollment>, AppError>;
    async fn enrollments_by_section(
        &self,
        section_id: u64,
        states: &[EnrollmentState],
        types: &[EnrollmentType],
    ) -> Result<Vec<Enrollment>, AppError>;

    async fn assignments_by_course(
        &self,
        course_id: u64,
        search_term: &str,
        bucket: AssignmentBucket,
        by_section: bool,
    ) -> Result<Vec<Assignment>, AppError>;
    async fn get_assignment(
        &self,
        course_id: u64,
        assignment_id: u64,
        include_overrides: bool,
    ) -> Result<Assignment, AppError>;
    async fn assignment_data_for_user(
        &self,
        course_id: u64,
        user_id: u64,
    ) -> Result<Vec<AssignmentData>, AppError>;

    async fn submissions_by_course(
        &self,
        course_id: u64,
        student_id: u64,
        state: SubmissionWorkflowState,
    ) -> Result<Vec<Submission>, AppError>;

    async fn grading_standards(
        &self,
        context: GradingStandardContext,
        context_id: u64,
    ) -> Result<Vec<GradingStandard>, AppError>;

    async fn grade_change_logs(
        &self,
        grader_id: u64,
        start_time: &str,
        end_time: &str,
    ) -> Result<Vec<GradeChangeLogPage>, AppError>;

    async fn get_user(&self, user_id: u64) -> Result<User, AppError>;
    async fn get_user_by_sis_id(&self, sis_id: &str) -> Result<User, AppError>;
}

/// Upstream search endpoints reject one-character terms, so do the same locally.
pub fn check_search_term(search_term: &str, resource: &str) -> Result<(), AppError> {
    if search_term.chars().count() == 1 {
        return Err(AppError::BadRequest(format!(
            "{} search term is less than 2 characters",
            resource
        )));
    }
    Ok(())
}

pub struct LmsHttpClient {
    http: PagedClient,
    config: LmsConfig,
}

impl LmsHttpClient {
    pub fn new(config: LmsConfig) -> Result<Self, AppError> {
        let http = PagedClient::new(config.access_token.clone(), config.timeout)?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<String, AppError> {
        endpoint(&self.config.base_url, path, params)
    }

    fn per_page(&self) -> (&'static str, String) {
        ("per_page", self.config.page_size.to_string())
    }

    fn enrollment_filters(
        &self,
        states: &[EnrollmentState],
        types: &[EnrollmentType],
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![self.per_page()];
        params.extend(states.iter().map(|s| ("state[]", s.as_str().to_string())));
        params.extend(types.iter().map(|t| ("type[]", t.as_str().to_string())));
        params
    }
}

#[async_trait]
impl LmsApi for LmsHttpClient {
    async fn get_account(&self, account_id: u64) -> Result<Account, AppError> {
        let url = self.url(&format!("accounts/{}", account_id), &[])?;
        self.http.get_one(&url).await
    }

    async fn get_course(&self, course_id: u64) -> Result<Course, AppError> {
        let url = self.url(
            &format!("courses/{}", course_id),
            &[("include[]", "account".to_string())],
        )?;
        self.http.get_one(&url).await
    }

    async fn courses_by_account(
        &self,
        account_id: u64,
        search_term: &str,
        types: &[CourseEnrollmentType],
    ) -> Result<Vec<Course>, AppError> {
        check_search_term(search_term, "course")?;

        let mut params = vec![self.per_page(), ("include[]", "account".to_string())];
        if !search_term.is_empty() {
            params.push(("search_term", search_term.to_string()));
        }
        params.extend(
            types
                .iter()
                .map(|t| ("enrollment_type[]", t.as_str().to_string())),
        );

        let url = self.url(&format!("accounts/{}/courses", account_id), &params)?;
        self.http.get_all(url).await
    }

    async fn courses_by_user(&self, user_id: u64) -> Result<Vec<Course>, AppError> {
        let url = self.url(
            &format!("users/{}/courses", user_id),
            &[
                self.per_page(),
                ("include[]", "account".to_string()),
            ],
        )?;
        self.http.get_all(url).await
    }

    async fn get_section(&self, section_id: u64) -> Result<Section, AppError> {
        let url = self.url(&format!("sections/{}", section_id), &[])?;
        self.http.get_one(&url).await
    }

    async fn sections_by_course(&self, course_id: u64) -> Result<Vec<Section>, AppError> {
        let url = self.url(
            &format!("courses/{}/sections", course_id),
            &[self.per_page(), ("include[]", "total_students".to_string())],
        )?;
        self.http.get_all(url).await
    }

    async fn enrollments_by_user(
        &self,
        user_id: u64,
        states: &[EnrollmentState],
    ) -> Result<Vec<Enrollment>, AppError> {
        let params = self.enrollment_filters(states, &[]);
        let url = self.url(&format!("users/{}/enrollments", user_id), &params)?;
        self.http.get_all(url).await
    }

    async fn enrollments_by_course(
        &self,
        course_id: u64,
        states: &[EnrollmentState],
        types: &[EnrollmentType],
    ) -> Result<Vec<Enrollment>, AppError> {
        let params = self.enrollment_filters(states, types);
        let url = self.url(&format!("courses/{}/enrollments", course_id), &params)?;
        self.http.get_all(url).await
    }

    async fn enrollments_by_section(
        &self,
        section_id: u64,
        states: &[EnrollmentState],
        types: &[EnrollmentType],
    ) -> Result<Vec<Enrollment>, AppError> {
        let params = self.enrollment_filters(states, types);
        let url = self.url(&format!("sections/{}/enrollments", section_id), &params)?;
        self.http.get_all(url).await
    }

    async fn assignments_by_course(
        &self,
        course_id: u64,
        search_term: &str,
        bucket: AssignmentBucket,
        by_section: bool,
    ) -> Result<Vec<Assignment>, AppError> {
        check_search_term(search_term, "assignment")?;

        let mut params = vec![self.per_page()];
        if !search_term.is_empty() {
            params.push(("search_term", search_term.to_string()));
        }
        if let Some(bucket) = bucket.as_query() {
            params.push(("bucket", bucket.to_string()));
        }
        if by_section {
            params.push(("needs_grading_count_by_section", "true".to_string()));
            params.push(("include[]", "all_dates".to_string()));
        }

        let url = self.url(&format!("courses/{}/assignments", course_id), &params)?;
        self.http.get_all(url).await
    }

    async fn get_assignment(
        &self,
        course_id: u64,
        assignment_id: u64,
        include_overrides: bool,
    ) -> Result<Assignment, AppError> {
        let mut params = Vec::new();
        if include_overrides {
            params.push(("include[]", "overrides".to_string()));
        }
        let url = self.url(
            &format!("courses/{}/assignments/{}", course_id, assignment_id),
            &params,
        )?;
        self.http.get_one(&url).await
    }

    async fn assignment_data_for_user(
        &self,
        course_id: u64,
        user_id: u64,
    ) -> Result<Vec<AssignmentData>, AppError> {
        let url = self.url(
            &format!("courses/{}/analytics/users/{}/assignments", course_id, user_id),
            &[self.per_page()],
        )?;
        self.http.get_all(url).await
    }

    async fn submissions_by_course(
        &self,
        course_id: u64,
        student_id: u64,
        state: SubmissionWorkflowState,
    ) -> Result<Vec<Submission>, AppError> {
        let url = self.url(
            &format!("courses/{}/students/submissions", course_id),
            &[
                self.per_page(),
                ("student_ids[]", student_id.to_string()),
                ("include[]", "assignment".to_string()),
                ("workflow_state", state.as_str().to_string()),
            ],
        )?;
        self.http.get_all(url).await
    }

    async fn grading_standards(
        &self,
        context: GradingStandardContext,
        context_id: u64,
    ) -> Result<Vec<GradingStandard>, AppError> {
        let url = self.url(
            &format!("{}/{}/grading_standards", context.path_segment(), context_id),
            &[self.per_page()],
        )?;
        self.http.get_all(url).await
    }

    async fn grade_change_logs(
        &self,
        grader_id: u64,
        start_time: &str,
        end_time: &str,
    ) -> Result<Vec<GradeChangeLogPage>, AppError> {
        let url = self.url(
            &format!("audit/grade_change/graders/{}", grader_id),
            &[
                self.per_page(),
                ("start_time", start_time.to_string()),
                ("end_time", end_time.to_string()),
            ],
        )?;
        self.http.get_pages(url).await
    }

    async fn get_user(&self, user_id: u64) -> Result<User, AppError> {
        let url = self.url(&format!("users/{}", user_id), &[])?;
        self.http.get_one(&url).await
    }

    async fn get_user_by_sis_id(&self, sis_id: &str) -> Result<User, AppError> {
        let url = endpoint_with_segment(
            &self.config.base_url,
            "users",
            &format!("sis_user_id:{}", sis_id),
            &[],
        )?;
        self.http.get_one(&url).await
    }
}
