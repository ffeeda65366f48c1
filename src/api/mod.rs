use axum::extract::{Path, Query};
use axum::http::{Method, header};
use axum::middleware;
use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::auth::require_auth;
use crate::error::AppError;
use crate::lms::dto::{Account, Course, SubmissionWorkflowState, User};
use crate::models::*;
use crate::services::{ReportService, deadline, parse_audit_date};
use crate::state::AppState;

#[derive(Deserialize)]
struct CourseReportParams {
    course_name: Option<String>,
    account_name: Option<String>,
    course_workflow_state: Option<String>,
}

#[derive(Deserialize)]
struct CourseIdsParams {
    ids: Option<String>,
}

#[derive(Deserialize)]
struct AuditParams {
    start_time: Option<String>,
    end_time: Option<String>,
}

#[derive(Deserialize)]
struct SubmissionParams {
    workflow_state: Option<String>,
}

#[derive(Serialize)]
struct Health {
    message: String,
    time: String,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/courses/ungraded-assignments", get(ungraded_by_courses))
        .route("/courses/{course_id}/ungraded-assignments", get(ungraded_by_course))
        .route("/courses/{course_id}/enrollments-results", get(enrollment_results_by_course))
        .route(
            "/courses/{course_id}/grading-standard-assignments",
            get(grading_standard_assignments),
        )
        .route(
            "/courses/{course_id}/additional-attempt-assignments",
            get(additional_attempt_assignments),
        )
        .route(
            "/courses/{course_id}/students/{user_id}/submissions",
            get(submissions_by_student),
        )
        .route("/users/sis/{sis_id}", get(user_by_sis_id))
        .route("/users/{user_id}/enrollments-results", get(enrollment_results_by_user))
        .route("/users/{user_id}/assignments-results", get(assignment_results_by_user))
        .route("/users/{user_id}/ungraded-assignments", get(ungraded_by_user))
        .route("/users/{user_id}/grade-change-logs", get(grade_change_logs))
        .route("/accounts/{account_id}", get(account))
        .route("/accounts/{account_id}/courses", get(courses_by_account))
        .route("/accounts/{account_id}/ungraded-assignments", get(ungraded_by_account))
        .route(
            "/accounts/{account_id}/grading-standard-courses",
            get(grading_standard_courses),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(state.web_origin.clone())
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

fn reports(state: &AppState) -> ReportService {
    ReportService::new(state.lms.clone(), state.html_url.clone())
}

fn parse_id(value: &str, what: &str) -> Result<u64, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid {} id", what)))
}

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("missing {} query parameter", name)))
}

/// Parses the `ids` list of the multi-course report up front so a bad entry
/// fails before any upstream call.
fn parse_course_ids(ids: Option<&str>) -> Result<Vec<u64>, AppError> {
    let ids = ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing courses ids".to_string()))?;

    ids.split(',')
        .map(|id| {
            id.trim()
                .parse()
                .map_err(|_| AppError::BadRequest(format!("invalid course id: {}", id)))
        })
        .collect()
}

async fn fetch_user(state: &AppState, user_id: &str) -> Result<User, AppError> {
    let user_id = parse_id(user_id, "user")?;
    state.lms.get_user(user_id).await
}

async fn fetch_course(state: &AppState, course_id: &str) -> Result<Course, AppError> {
    let course_id = parse_id(course_id, "course")?;
    state.lms.get_course(course_id).await
}

async fn health() -> Json<Health> {
    Json(Health {
        message: "ok".to_string(),
        time: chrono::Utc::now().to_rfc3339(),
    })
}

async fn ungraded_by_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Query(params): Query<CourseReportParams>,
) -> Result<Json<Vec<UngradedAssignmentWithCourse>>, AppError> {
    let course_name = required(params.course_name, "course_name")?;
    let account_name = required(params.account_name, "account_name")?;
    let course_id = parse_id(&course_id, "course")?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .ungraded_assignments_by_course(&cancel, course_id, &account_name, &course_name)
        .await?;
    Ok(Json(rows))
}

async fn ungraded_by_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseIdsParams>,
) -> Result<Json<Vec<UngradedAssignment>>, AppError> {
    let course_ids = parse_course_ids(params.ids.as_deref())?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .ungraded_assignments_by_courses(&cancel, &course_ids)
        .await?;
    Ok(Json(rows))
}

async fn ungraded_by_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<Vec<UngradedAssignmentWithCourse>>, AppError> {
    let account_id = parse_id(&account_id, "account")?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .ungraded_assignments_by_account(&cancel, account_id)
        .await?;
    Ok(Json(rows))
}

async fn enrollment_results_by_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Query(params): Query<CourseReportParams>,
) -> Result<Json<Vec<EnrollmentResult>>, AppError> {
    let course_name = required(params.course_name, "course_name")?;
    let account_name = required(params.account_name, "account_name")?;
    let course_state = required(params.course_workflow_state, "course_workflow_state")?;
    let course_id = parse_id(&course_id, "course")?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .enrollment_results_by_course(&cancel, course_id, &account_name, &course_name, &course_state)
        .await?;
    Ok(Json(rows))
}

async fn enrollment_results_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<EnrollmentResult>>, AppError> {
    let user = fetch_user(&state, &user_id).await?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .enrollment_results_by_user(&cancel, &user)
        .await?;
    Ok(Json(rows))
}

async fn assignment_results_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<AssignmentResult>>, AppError> {
    let user = fetch_user(&state, &user_id).await?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .assignment_results_by_user(&cancel, &user)
        .await?;
    Ok(Json(rows))
}

async fn ungraded_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UngradedUserAssignment>>, AppError> {
    let user = fetch_user(&state, &user_id).await?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .ungraded_assignments_by_user(&cancel, &user)
        .await?;
    Ok(Json(rows))
}

// The path segment is shared with the other user routes but carries a grader id.
async fn grade_change_logs(
    State(state): State<AppState>,
    Path(grader_id): Path<String>,
    Query(params): Query<AuditParams>,
) -> Result<Json<Vec<GradeChangeLog>>, AppError> {
    let grader_id = parse_id(&grader_id, "grader")?;

    let start_time = params.start_time.unwrap_or_default();
    parse_audit_date(&start_time, "start time")?;
    let end_time = params.end_time.unwrap_or_default();
    parse_audit_date(&end_time, "end time")?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .grade_change_logs(&cancel, grader_id, &start_time, &end_time)
        .await?;
    Ok(Json(rows))
}

async fn courses_by_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<Vec<Course>>, AppError> {
    let account_id = parse_id(&account_id, "account")?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let courses = reports(&state).courses_by_account(&cancel, account_id).await?;
    Ok(Json(courses))
}

async fn grading_standard_courses(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<Vec<GradingStandardCourse>>, AppError> {
    let account_id = parse_id(&account_id, "account")?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .grading_standard_courses(&cancel, account_id)
        .await?;
    Ok(Json(rows))
}

async fn grading_standard_assignments(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<GradingStandardAssignment>>, AppError> {
    let course = fetch_course(&state, &course_id).await?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .grading_standard_assignments(&cancel, &course)
        .await?;
    Ok(Json(rows))
}

async fn additional_attempt_assignments(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<AdditionalAttemptAssignment>>, AppError> {
    let course = fetch_course(&state, &course_id).await?;

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .additional_attempt_assignments(&cancel, &course)
        .await?;
    Ok(Json(rows))
}

async fn submissions_by_student(
    State(state): State<AppState>,
    Path((course_id, user_id)): Path<(String, String)>,
    Query(params): Query<SubmissionParams>,
) -> Result<Json<Vec<SubmissionResult>>, AppError> {
    let course_id = parse_id(&course_id, "course")?;
    let student_id = parse_id(&user_id, "user")?;

    let workflow_state = match params.workflow_state.as_deref() {
        None | Some("") => SubmissionWorkflowState::Graded,
        Some(value) => SubmissionWorkflowState::parse(value).ok_or_else(|| {
            AppError::BadRequest(format!("invalid workflow_state: {}", value))
        })?,
    };

    let (cancel, _guard) = deadline(state.request_timeout);
    let rows = reports(&state)
        .submissions_by_student(&cancel, course_id, student_id, workflow_state)
        .await?;
    Ok(Json(rows))
}

async fn account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<Account>, AppError> {
    let account_id = parse_id(&account_id, "account")?;
    let account = state.lms.get_account(account_id).await?;
    Ok(Json(account))
}

async fn user_by_sis_id(
    State(state): State<AppState>,
    Path(sis_id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = state.lms.get_user_by_sis_id(&sis_id).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_ids_are_parsed_up_front() {
        assert_eq!(parse_course_ids(Some("1,22, 333")).unwrap(), vec![1, 22, 333]);

        let err = parse_course_ids(Some("1,x")).unwrap_err();
        assert_eq!(err.to_string(), "invalid course id: x");

        let err = parse_course_ids(None).unwrap_err();
        assert_eq!(err.to_string(), "missing courses ids");
        assert!(parse_course_ids(Some("")).is_err());
    }

    #[test]
    fn path_ids_must_be_unsigned() {
        assert_eq!(parse_id("42", "course").unwrap(), 42);
        assert_eq!(parse_id("-1", "account").unwrap_err().to_string(), "invalid account id");
        assert_eq!(parse_id("abc", "user").unwrap_err().to_string(), "invalid user id");
    }
}
