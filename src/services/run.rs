use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::lms::LmsApi;
use crate::lms::dto::{
    Assignment, Course, EnrollmentType, GradingStandard, GradingStandardContext,
};

const SECTION_SET_TYPE: &str = "CourseSection";
const TEACHER_SEPARATOR: &str = ";";

/// Display label of a section and the teachers enrolled in it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionLabel {
    pub label: String,
    pub teachers: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionDates {
    pub due_at: Option<String>,
    pub unlock_at: Option<String>,
    pub lock_at: Option<String>,
}

/// Starts a request deadline: the returned token is cancelled once `timeout`
/// elapses or when the guard is dropped.
pub fn deadline(timeout: Duration) -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let timer = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => timer.cancel(),
            _ = timer.cancelled() => {}
        }
    });

    let guard = token.clone().drop_guard();
    (token, guard)
}

/// State owned by a single report build: lookup caches and the cancellation signal.
///
/// Nothing in here outlives the request that created it.
pub struct ReportRun {
    pub(crate) lms: Arc<dyn LmsApi>,
    cancel: CancellationToken,
    id: Uuid,
    courses: HashMap<u64, Course>,
    sections: HashMap<u64, SectionLabel>,
    section_names: HashMap<u64, String>,
    assignment_dates: HashMap<u64, HashMap<u64, SectionDates>>,
    grading_standards: HashMap<u64, GradingStandard>,
    seeded_accounts: HashSet<u64>,
    fetched_course_standards: HashSet<u64>,
}

impl ReportRun {
    pub fn new(lms: Arc<dyn LmsApi>, cancel: CancellationToken) -> Self {
        Self {
            lms,
            cancel,
            id: Uuid::new_v4(),
            courses: HashMap::new(),
            sections: HashMap::new(),
            section_names: HashMap::new(),
            assignment_dates: HashMap::new(),
            grading_standards: HashMap::new(),
            seeded_accounts: HashSet::new(),
            fetched_course_standards: HashSet::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Fails with a timeout once the request has been cancelled.
    pub fn checkpoint(&self) -> Result<(), AppError> {
        if self.cancel.is_cancelled() {
            warn!("report run {} cancelled", self.id);
            return Err(AppError::Timeout);
        }
        Ok(())
    }

    pub fn seed_courses(&mut self, courses: impl IntoIterator<Item = Course>) {
        for course in courses {
            self.courses.entry(course.id).or_insert(course);
        }
    }

    /// Returns the course, fetching it once if no earlier call has seen it.
    pub async fn course(&mut self, course_id: u64) -> Result<&Course, AppError> {
        match self.courses.entry(course_id) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                debug!("run {}: course {} not cached, fetching", self.id, course_id);
                let course = self.lms.get_course(course_id).await?;
                Ok(&*entry.insert(course))
            }
        }
    }

    /// Resolves a section's label and teachers.
    ///
    /// The label is the SIS section id carried by the section's teacher
    /// enrollments; sections without one fall back to their own name.
    pub async fn section(&mut self, section_id: u64) -> Result<&SectionLabel, AppError> {
        match self.sections.entry(section_id) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let enrollments = self
                    .lms
                    .enrollments_by_section(section_id, &[], &[EnrollmentType::Teacher])
                    .await?;

                let teachers = enrollments
                    .iter()
                    .map(|e| e.user.name.as_str())
                    .collect::<Vec<_>>()
                    .join(TEACHER_SEPARATOR);

                let label = match enrollments.iter().find_map(|e| e.sis_section()) {
                    Some(sis_section_id) => sis_section_id.to_string(),
                    None => self.lms.get_section(section_id).await?.name,
                };

                Ok(&*entry.insert(SectionLabel { label, teachers }))
            }
        }
    }

    /// Plain section name, used when an enrollment has no SIS section id.
    pub async fn section_name(&mut self, section_id: u64) -> Result<&str, AppError> {
        match self.section_names.entry(section_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut().as_str()),
            Entry::Vacant(entry) => {
                let section = self.lms.get_section(section_id).await?;
                Ok(entry.insert(section.name).as_str())
            }
        }
    }

    /// Due/unlock/lock dates of an assignment keyed by section id.
    ///
    /// The upstream drops `all_dates` for assignments with many overrides; in
    /// that case the assignment is fetched again with its overrides.
    pub async fn section_dates(
        &mut self,
        assignment: &Assignment,
    ) -> Result<&HashMap<u64, SectionDates>, AppError> {
        match self.assignment_dates.entry(assignment.id) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let dates = if assignment.all_dates.is_empty() {
                    debug!(
                        "run {}: assignment {} has no inline dates, fetching overrides",
                        self.id, assignment.id
                    );
                    let full = self
                        .lms
                        .get_assignment(assignment.course_id, assignment.id, true)
                        .await?;
                    full.overrides
                        .into_iter()
                        .filter_map(|o| {
                            let section_id = o.course_section_id?;
                            Some((
                                section_id,
                                SectionDates {
                                    due_at: o.due_at,
                                    unlock_at: o.unlock_at,
                                    lock_at: o.lock_at,
                                },
                            ))
                        })
                        .collect()
                } else {
                    assignment
                        .all_dates
                        .iter()
                        .filter(|d| d.set_type == SECTION_SET_TYPE)
                        .filter_map(|d| {
                            Some((
                                d.set_id?,
                                SectionDates {
                                    due_at: d.due_at.clone(),
                                    unlock_at: d.unlock_at.clone(),
                                    lock_at: d.lock_at.clone(),
                                },
                            ))
                        })
                        .collect()
                };

                Ok(&*entry.insert(dates))
            }
        }
    }

    /// Title of a grading standard as seen from `course`.
    ///
    /// Root account standards are loaded once; course standards are fetched
    /// on the first miss for that course and take precedence.
    pub async fn grading_standard_title(
        &mut self,
        course: &Course,
        standard_id: Option<u64>,
    ) -> Result<String, AppError> {
        let Some(standard_id) = standard_id else {
            return Ok(String::new());
        };

        let root_account = course.root_account_id.unwrap_or(course.account_id);
        if self.seeded_accounts.insert(root_account) {
            let standards = self
                .lms
                .grading_standards(GradingStandardContext::Account, root_account)
                .await?;
            for standard in standards {
                self.grading_standards.entry(standard.id).or_insert(standard);
            }
        }

        if !self.grading_standards.contains_key(&standard_id)
            && self.fetched_course_standards.insert(course.id)
        {
            let standards = self
                .lms
                .grading_standards(GradingStandardContext::Course, course.id)
                .await?;
            for standard in standards {
                self.grading_standards.insert(standard.id, standard);
            }
        }

        Ok(self
            .grading_standards
            .get(&standard_id)
            .map(|s| s.title.clone())
            .unwrap_or_default())
    }
}
