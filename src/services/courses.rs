use tokio_util::sync::CancellationToken;

use super::ReportService;
use crate::error::AppError;
use crate::lms::dto::{AssignmentBucket, Course, CourseEnrollmentType};
use crate::models::{AdditionalAttemptAssignment, GradingStandardAssignment, GradingStandardCourse};

const ADDITIONAL_ATTEMPT_SEARCH: &str = "Attempt";

impl ReportService {
    /// Courses of an account that have student enrollments, as the upstream returns them.
    pub async fn courses_by_account(
        &self,
        cancel: &CancellationToken,
        account_id: u64,
    ) -> Result<Vec<Course>, AppError> {
        let run = self.start_run("courses by account", cancel);

        let courses = run
            .lms
            .courses_by_account(account_id, "", &[CourseEnrollmentType::Student])
            .await?;
        run.checkpoint()?;

        self.finish_run(&run, &courses);
        Ok(courses)
    }

    pub async fn grading_standard_courses(
        &self,
        cancel: &CancellationToken,
        account_id: u64,
    ) -> Result<Vec<GradingStandardCourse>, AppError> {
        let mut run = self.start_run("grading standard courses", cancel);

        let courses = run
            .lms
            .courses_by_account(account_id, "", &[CourseEnrollmentType::Student])
            .await?;

        let mut rows = Vec::with_capacity(courses.len());
        for course in courses {
            run.checkpoint()?;

            let grading_standard = run
                .grading_standard_title(&course, course.grading_standard_id)
                .await?;

            rows.push(GradingStandardCourse {
                account: course.account_name().to_string(),
                grading_standard_id: course.grading_standard_id,
                grading_standard,
                name: course.name,
                sis_course_id: course.sis_course_id,
                workflow_state: course.workflow_state,
                start_at: course.start_at,
                end_at: course.end_at,
            });
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }

    /// Every assignment of the course with its grading standard title.
    pub async fn grading_standard_assignments(
        &self,
        cancel: &CancellationToken,
        course: &Course,
    ) -> Result<Vec<GradingStandardAssignment>, AppError> {
        let mut run = self.start_run("grading standard assignments", cancel);

        let assignments = run
            .lms
            .assignments_by_course(course.id, "", AssignmentBucket::All, false)
            .await?;

        let mut rows = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            run.checkpoint()?;

            let grading_standard = run
                .grading_standard_title(course, assignment.grading_standard_id)
                .await?;

            rows.push(GradingStandardAssignment {
                account: course.account_name().to_string(),
                course_name: course.name.clone(),
                name: assignment.name,
                course_state: course.workflow_state.clone(),
                grading_standard_id: assignment.grading_standard_id,
                grading_standard,
                grading_type: assignment.grading_type,
                omit_from_final_grade: assignment.omit_from_final_grade,
                workflow_state: assignment.workflow_state,
                due_at: assignment.due_at,
                unlock_at: assignment.unlock_at,
                lock_at: assignment.lock_at,
            });
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }

    pub async fn additional_attempt_assignments(
        &self,
        cancel: &CancellationToken,
        course: &Course,
    ) -> Result<Vec<AdditionalAttemptAssignment>, AppError> {
        let run = self.start_run("additional attempt assignments", cancel);

        let assignments = run
            .lms
            .assignments_by_course(course.id, ADDITIONAL_ATTEMPT_SEARCH, AssignmentBucket::All, false)
            .await?;

        let mut rows = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            run.checkpoint()?;
            rows.push(AdditionalAttemptAssignment {
                account: course.account_name().to_string(),
                course_name: course.name.clone(),
                name: assignment.name,
                lock_at: assignment.lock_at,
                needs_grading_count: assignment.needs_grading_count,
                html_url: assignment.html_url,
            });
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }
}
