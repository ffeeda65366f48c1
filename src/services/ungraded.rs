use tokio_util::sync::CancellationToken;

use super::{REPORTABLE_STATES, ReportRun, ReportService, is_reportable_student};
use crate::error::AppError;
use crate::lms::dto::{AssignmentBucket, CourseEnrollmentType, User};
use crate::models::{
    UngradedAssignment, UngradedAssignmentWithCourse, UngradedUserAssignment,
    assignment::is_placeholder,
};

impl ReportService {
    /// One row per (assignment, section) of the course that still needs grading.
    async fn ungraded_rows_for_course(
        &self,
        run: &mut ReportRun,
        course_id: u64,
    ) -> Result<Vec<UngradedAssignment>, AppError> {
        let assignments = run
            .lms
            .assignments_by_course(course_id, "", AssignmentBucket::Ungraded, true)
            .await?;

        let mut rows = Vec::new();

        for assignment in assignments {
            run.checkpoint()?;

            if assignment.needs_grading_count_by_section.is_empty() {
                continue;
            }

            let dates = run.section_dates(&assignment).await?.clone();

            for pending in &assignment.needs_grading_count_by_section {
                let section = run.section(pending.section_id).await?;
                let section_dates = dates.get(&pending.section_id).cloned().unwrap_or_default();

                rows.push(UngradedAssignment {
                    name: assignment.name.clone(),
                    section: section.label.clone(),
                    course_id: assignment.course_id,
                    needs_grading_section: pending.needs_grading_count,
                    teachers: section.teachers.clone(),
                    due_at: section_dates.due_at,
                    unlock_at: section_dates.unlock_at,
                    lock_at: section_dates.lock_at,
                    published: assignment.published,
                    gradebook_url: self.gradebook_url(course_id),
                });
            }
        }

        Ok(rows)
    }

    pub async fn ungraded_assignments_by_course(
        &self,
        cancel: &CancellationToken,
        course_id: u64,
        account_name: &str,
        course_name: &str,
    ) -> Result<Vec<UngradedAssignmentWithCourse>, AppError> {
        let mut run = self.start_run("ungraded assignments by course", cancel);

        let rows: Vec<_> = self
            .ungraded_rows_for_course(&mut run, course_id)
            .await?
            .into_iter()
            .map(|assignment| UngradedAssignmentWithCourse {
                account: account_name.to_string(),
                course_name: course_name.to_string(),
                assignment,
            })
            .collect();

        self.finish_run(&run, &rows);
        Ok(rows)
    }

    pub async fn ungraded_assignments_by_courses(
        &self,
        cancel: &CancellationToken,
        course_ids: &[u64],
    ) -> Result<Vec<UngradedAssignment>, AppError> {
        let mut run = self.start_run("ungraded assignments by courses", cancel);
        let mut rows = Vec::new();

        for &course_id in course_ids {
            run.checkpoint()?;
            rows.extend(self.ungraded_rows_for_course(&mut run, course_id).await?);
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }

    pub async fn ungraded_assignments_by_account(
        &self,
        cancel: &CancellationToken,
        account_id: u64,
    ) -> Result<Vec<UngradedAssignmentWithCourse>, AppError> {
        let mut run = self.start_run("ungraded assignments by account", cancel);

        let courses = run
            .lms
            .courses_by_account(account_id, "", &[CourseEnrollmentType::Student])
            .await?;

        let mut rows = Vec::new();

        for course in &courses {
            run.checkpoint()?;

            let account = course.account_name().to_string();
            for assignment in self.ungraded_rows_for_course(&mut run, course.id).await? {
                rows.push(UngradedAssignmentWithCourse {
                    account: account.clone(),
                    course_name: course.name.clone(),
                    assignment,
                });
            }
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }

    /// Assignments the student has submitted that have no score yet.
    pub async fn ungraded_assignments_by_user(
        &self,
        cancel: &CancellationToken,
        user: &User,
    ) -> Result<Vec<UngradedUserAssignment>, AppError> {
        let mut run = self.start_run("ungraded assignments by user", cancel);

        let courses = run.lms.courses_by_user(user.id).await?;
        run.seed_courses(courses);

        let enrollments = run.lms.enrollments_by_user(user.id, &REPORTABLE_STATES).await?;
        let mut rows = Vec::new();

        for enrollment in enrollments {
            run.checkpoint()?;

            if !is_reportable_student(&enrollment.role, &enrollment.enrollment_state) {
                continue;
            }

            let course = run.course(enrollment.course_id).await?.clone();
            if !course.is_available() {
                continue;
            }

            let data = run
                .lms
                .assignment_data_for_user(enrollment.course_id, user.id)
                .await?;

            for item in data {
                if is_placeholder(&item.title) {
                    continue;
                }

                let submitted = item
                    .submission
                    .submitted_at
                    .as_deref()
                    .is_some_and(|at| !at.is_empty());
                if !submitted || item.submission.score.is_some() {
                    continue;
                }

                rows.push(UngradedUserAssignment {
                    user_sis_id: user.sis_user_id.clone(),
                    name: user.name.clone(),
                    account: course.account_name().to_string(),
                    course_name: course.name.clone(),
                    section: enrollment.sis_section().map(str::to_string),
                    title: item.title,
                    points_possible: item.points_possible,
                    score: item.submission.score,
                    submitted_at: item.submission.submitted_at,
                    status: item.status,
                    due_at: item.due_at,
                    course_state: course.workflow_state.clone(),
                    enrollment_role: enrollment.role.clone(),
                    enrollment_state: enrollment.enrollment_state.clone(),
                });
            }
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }
}
