use tokio_util::sync::CancellationToken;

use super::{REPORTABLE_STATES, ReportService, is_reportable_student};
use crate::error::AppError;
use crate::lms::dto::{Enrollment, EnrollmentType, SubmissionWorkflowState, User};
use crate::models::{
    AssignmentResult, EnrollmentResult, SubmissionResult,
    assignment::{discrepancy, is_placeholder},
};

const TOTAL_ROW: &str = "Total";

/// Running sums for the per-course "Total" row.
#[derive(Debug, Default)]
struct CourseTotals {
    assignments: usize,
    points_possible: f64,
    score: Option<f64>,
}

impl CourseTotals {
    fn add(&mut self, points_possible: Option<f64>, score: Option<f64>) {
        self.assignments += 1;
        self.points_possible += points_possible.unwrap_or(0.0);
        if let Some(score) = score {
            *self.score.get_or_insert(0.0) += score;
        }
    }

    fn into_row(self) -> Option<AssignmentResult> {
        (self.assignments > 0).then(|| AssignmentResult {
            course_name: TOTAL_ROW.to_string(),
            points_possible: Some(self.points_possible),
            score: self.score,
            ..Default::default()
        })
    }
}

fn enrollment_row(enrollment: &Enrollment) -> EnrollmentResult {
    EnrollmentResult {
        sis_id: enrollment.user.sis_user_id.clone(),
        name: enrollment.user.name.clone(),
        section: enrollment.sis_section().unwrap_or_default().to_string(),
        enrollment_state: enrollment.enrollment_state.clone(),
        current_grade: enrollment.grades.current_grade.clone(),
        current_score: enrollment.grades.current_score,
        enrollment_role: enrollment.role.clone(),
        grades_url: enrollment.grades.html_url.clone(),
        ..Default::default()
    }
}

impl ReportService {
    /// Every assignment result of a student, course by course, each course
    /// closed by a "Total" row.
    pub async fn assignment_results_by_user(
        &self,
        cancel: &CancellationToken,
        user: &User,
    ) -> Result<Vec<AssignmentResult>, AppError> {
        let mut run = self.start_run("assignment results by user", cancel);

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

            let mut totals = CourseTotals::default();

            for item in data {
                if is_placeholder(&item.title) {
                    continue;
                }

                let score = item.submission.score;
                totals.add(item.points_possible, score);

                rows.push(AssignmentResult {
                    user_sis_id: user.sis_user_id.clone(),
                    name: user.name.clone(),
                    account: course.account_name().to_string(),
                    course_name: course.name.clone(),
                    section: enrollment.sis_section().map(str::to_string),
                    title: item.title,
                    points_possible: item.points_possible,
                    score,
                    discrepancy: discrepancy(score, item.points_possible),
                    submitted_at: item.submission.submitted_at,
                    status: item.status,
                    due_at: item.due_at,
                    course_state: course.workflow_state.clone(),
                    enrollment_role: enrollment.role.clone(),
                    enrollment_state: enrollment.enrollment_state.clone(),
                });
            }

            rows.extend(totals.into_row());
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }

    /// Grades of the active and completed students of one course.
    pub async fn enrollment_results_by_course(
        &self,
        cancel: &CancellationToken,
        course_id: u64,
        account_name: &str,
        course_name: &str,
        course_state: &str,
    ) -> Result<Vec<EnrollmentResult>, AppError> {
        let run = self.start_run("enrollment results by course", cancel);

        let enrollments = run
            .lms
            .enrollments_by_course(course_id, &REPORTABLE_STATES, &[EnrollmentType::Student])
            .await?;

        let mut rows = Vec::with_capacity(enrollments.len());
        for enrollment in &enrollments {
            run.checkpoint()?;
            rows.push(EnrollmentResult {
                account: account_name.to_string(),
                course_name: course_name.to_string(),
                course_state: course_state.to_string(),
                ..enrollment_row(enrollment)
            });
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }

    /// Grades of every active or completed enrollment of a user.
    pub async fn enrollment_results_by_user(
        &self,
        cancel: &CancellationToken,
        user: &User,
    ) -> Result<Vec<EnrollmentResult>, AppError> {
        let mut run = self.start_run("enrollment results by user", cancel);

        let enrollments = run.lms.enrollments_by_user(user.id, &REPORTABLE_STATES).await?;
        let courses = run.lms.courses_by_user(user.id).await?;
        run.seed_courses(courses);

        let mut rows = Vec::with_capacity(enrollments.len());

        for enrollment in &enrollments {
            run.checkpoint()?;

            let mut row = enrollment_row(enrollment);

            let course = run.course(enrollment.course_id).await?;
            row.course_name = course.name.clone();
            row.course_state = course.workflow_state.clone();
            row.account = course.account_name().to_string();

            if row.section.is_empty() {
                if let Some(section_id) = enrollment.course_section_id {
                    row.section = run.section_name(section_id).await?.to_string();
                }
            }

            rows.push(row);
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }

    /// Submissions of one student in one course, placeholders excluded.
    pub async fn submissions_by_student(
        &self,
        cancel: &CancellationToken,
        course_id: u64,
        student_id: u64,
        state: SubmissionWorkflowState,
    ) -> Result<Vec<SubmissionResult>, AppError> {
        let run = self.start_run("submissions by student", cancel);

        let submissions = run
            .lms
            .submissions_by_course(course_id, student_id, state)
            .await?;

        let mut rows = Vec::new();
        for submission in submissions {
            run.checkpoint()?;

            if is_placeholder(&submission.assignment.name) {
                continue;
            }

            let points_possible = submission.assignment.points_possible;
            rows.push(SubmissionResult {
                assignment_id: submission.assignment_id,
                title: submission.assignment.name,
                points_possible,
                score: submission.score,
                grade: submission.grade,
                discrepancy: discrepancy(submission.score, points_possible),
                workflow_state: submission.workflow_state,
                submitted_at: submission.submitted_at,
                graded_at: submission.graded_at,
                late: submission.late,
                excused: submission.excused,
            });
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_without_scores_keep_points_but_no_score() {
        let mut totals = CourseTotals::default();
        totals.add(Some(10.0), None);
        totals.add(Some(5.5), None);

        let row = totals.into_row().unwrap();
        assert_eq!(row.course_name, "Total");
        assert_eq!(row.points_possible, Some(15.5));
        assert_eq!(row.score, None);
    }

    #[test]
    fn totals_sum_only_present_scores() {
        let mut totals = CourseTotals::default();
        totals.add(Some(10.0), Some(7.0));
        totals.add(Some(10.0), None);
        totals.add(None, Some(0.0));

        let row = totals.into_row().unwrap();
        assert_eq!(row.points_possible, Some(20.0));
        assert_eq!(row.score, Some(7.0));
    }

    #[test]
    fn no_total_row_without_assignments() {
        assert!(CourseTotals::default().into_row().is_none());
    }
}
