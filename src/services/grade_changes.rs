use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ReportService;
use crate::error::AppError;
use crate::lms::LmsApi;
use crate::lms::dto::{
    GradeChangeEvent, GradeChangeLogPage, LinkedAssignment, LinkedCourse, LinkedUser,
};
use crate::models::GradeChangeLog;

/// Layout of the audit `start_time`/`end_time` parameters after the weekday, e.g. `Jan 2 2006`.
const AUDIT_DATE_FORMAT: &str = "%b %d %Y";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Validates an audit date parameter such as `Mon Jan 2 2006`; `field` names it in the 400 message.
///
/// The weekday must be a short day name but is not checked against the date.
pub fn parse_audit_date(value: &str, field: &str) -> Result<NaiveDate, AppError> {
    let invalid = || AppError::BadRequest(format!("invalid {}", field));

    let (weekday, rest) = value.trim().split_once(' ').ok_or_else(invalid)?;
    if !WEEKDAYS.iter().any(|day| day.eq_ignore_ascii_case(weekday)) {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(rest, AUDIT_DATE_FORMAT).map_err(|_| invalid())
}

async fn resolve_courses(
    lms: &dyn LmsApi,
    cache: &mut HashMap<u64, LinkedCourse>,
    page: &GradeChangeLogPage,
) -> Result<(), AppError> {
    for course in &page.linked.courses {
        cache.entry(course.id).or_insert_with(|| course.clone());
    }

    let missing: HashSet<u64> = page
        .events
        .iter()
        .filter_map(|e| e.links.course.as_ref()?.as_id())
        .filter(|id| !cache.contains_key(id))
        .collect();

    for course_id in missing {
        debug!("audit course {} not linked, fetching", course_id);
        let course = lms.get_course(course_id).await?;
        cache.insert(
            course_id,
            LinkedCourse {
                id: course.id,
                name: course.name,
                account_id: course.account_id,
            },
        );
    }

    Ok(())
}

async fn resolve_assignments(
    lms: &dyn LmsApi,
    cache: &mut HashMap<u64, LinkedAssignment>,
    page: &GradeChangeLogPage,
) -> Result<(), AppError> {
    for assignment in &page.linked.assignments {
        cache
            .entry(assignment.id)
            .or_insert_with(|| assignment.clone());
    }

    let missing: HashMap<u64, u64> = page
        .events
        .iter()
        .filter_map(|e| {
            let assignment_id = e.links.assignment.as_ref()?.as_id()?;
            let course_id = e.links.course.as_ref()?.as_id()?;
            Some((assignment_id, course_id))
        })
        .filter(|(id, _)| !cache.contains_key(id))
        .collect();

    for (assignment_id, course_id) in missing {
        debug!("audit assignment {} not linked, fetching", assignment_id);
        let assignment = lms.get_assignment(course_id, assignment_id, false).await?;
        cache.insert(
            assignment_id,
            LinkedAssignment {
                id: assignment.id,
                name: assignment.name,
                course_id: assignment.course_id,
            },
        );
    }

    Ok(())
}

async fn resolve_users(
    lms: &dyn LmsApi,
    cache: &mut HashMap<u64, LinkedUser>,
    page: &GradeChangeLogPage,
) -> Result<(), AppError> {
    for user in &page.linked.users {
        cache.entry(user.id).or_insert_with(|| user.clone());
    }

    let missing: HashSet<u64> = page
        .events
        .iter()
        .filter_map(|e| e.links.student.as_ref()?.as_id())
        .filter(|id| !cache.contains_key(id))
        .collect();

    for user_id in missing {
        debug!("audit user {} not linked, fetching", user_id);
        let user = lms.get_user(user_id).await?;
        cache.insert(
            user_id,
            LinkedUser {
                id: user.id,
                name: user.name,
            },
        );
    }

    Ok(())
}

fn student_id(event: &GradeChangeEvent) -> Result<u64, AppError> {
    event
        .links
        .student
        .as_ref()
        .and_then(|link| link.as_id())
        .ok_or_else(|| {
            let link = event
                .links
                .student
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            AppError::Internal(format!("invalid student id: {} on event: {}", link, event.id))
        })
}

impl ReportService {
    /// Grade changes made by a grader between two dates, joined with course,
    /// assignment and student names.
    pub async fn grade_change_logs(
        &self,
        cancel: &CancellationToken,
        grader_id: u64,
        start_time: &str,
        end_time: &str,
    ) -> Result<Vec<GradeChangeLog>, AppError> {
        let run = self.start_run("grade change logs", cancel);
        let lms = run.lms.clone();

        let pages = lms.grade_change_logs(grader_id, start_time, end_time).await?;

        let mut courses = HashMap::new();
        let mut assignments = HashMap::new();
        let mut users = HashMap::new();
        let mut rows = Vec::new();

        for page in &pages {
            run.checkpoint()?;

            tokio::try_join!(
                resolve_courses(lms.as_ref(), &mut courses, page),
                resolve_assignments(lms.as_ref(), &mut assignments, page),
                resolve_users(lms.as_ref(), &mut users, page),
            )?;

            for event in &page.events {
                let mut row = GradeChangeLog {
                    id: event.id.clone(),
                    created_at: event.created_at.clone(),
                    event_type: event.event_type.clone(),
                    grade_before: event.grade_before.clone(),
                    grade_after: event.grade_after.clone(),
                    ..Default::default()
                };

                let course_id = event.links.course.as_ref().and_then(|l| l.as_id());
                if let Some(course) = course_id.and_then(|id| courses.get(&id)) {
                    row.course_id = Some(course.id);
                    row.course_name = course.name.clone();
                    row.account_id = Some(course.account_id);
                }

                let assignment_id = event.links.assignment.as_ref().and_then(|l| l.as_id());
                if let Some(assignment) = assignment_id.and_then(|id| assignments.get(&id)) {
                    row.assignment_id = Some(assignment.id);
                    row.assignment_title = assignment.name.clone();
                }

                if let Some(user) = users.get(&student_id(event)?) {
                    row.user_id = Some(user.id);
                    row.user_name = user.name.clone();
                }

                rows.push(row);
            }
        }

        self.finish_run(&run, &rows);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lms::dto::{GradeChangeLinks, LinkId};

    #[test]
    fn audit_dates_use_weekday_month_day_year() {
        let date = parse_audit_date("Mon Jan 2 2006", "start time").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2006, 1, 2).unwrap());

        assert!(parse_audit_date("Sat Mar 15 2025", "start time").is_ok());
    }

    #[test]
    fn weekday_is_checked_by_name_only() {
        let date = parse_audit_date("Tue Jan 2 2006", "start time").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2006, 1, 2).unwrap());

        assert!(parse_audit_date("Foo Jan 2 2006", "start time").is_err());
        assert!(parse_audit_date("Monday Jan 2 2006", "start time").is_err());
        assert!(parse_audit_date("Jan 2 2006", "start time").is_err());
    }

    #[test]
    fn malformed_audit_dates_are_bad_requests() {
        let err = parse_audit_date("2025-03-15", "end time").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "invalid end time"));

        assert!(parse_audit_date("", "start time").is_err());
    }

    #[test]
    fn student_links_must_be_numeric() {
        let mut event = GradeChangeEvent {
            id: "evt-1".into(),
            event_type: "grade_change".into(),
            grade_before: None,
            grade_after: None,
            created_at: String::new(),
            links: GradeChangeLinks {
                student: Some(LinkId::Text("42".into())),
                ..Default::default()
            },
        };
        assert_eq!(student_id(&event).unwrap(), 42);

        event.links.student = Some(LinkId::Text("abc".into()));
        let err = student_id(&event).unwrap_err();
        assert_eq!(err.to_string(), "invalid student id: abc on event: evt-1");
    }
}
