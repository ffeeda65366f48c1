mod courses;
mod grade_changes;
mod results;
pub mod run;
mod ungraded;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::lms::LmsApi;
use crate::lms::dto::{EnrollmentState, EnrollmentType};
pub use grade_changes::parse_audit_date;
pub use run::{ReportRun, SectionDates, SectionLabel, deadline};

/// Enrollment states that the per-student upstream endpoints answer for.
pub(crate) const REPORTABLE_STATES: [EnrollmentState; 2] =
    [EnrollmentState::Active, EnrollmentState::Completed];

/// Builds the flattened reports from upstream LMS data.
///
/// Every report call gets its own [`ReportRun`]; nothing is cached between calls.
#[derive(Clone)]
pub struct ReportService {
    lms: Arc<dyn LmsApi>,
    html_url: String,
}

impl ReportService {
    pub fn new(lms: Arc<dyn LmsApi>, html_url: String) -> Self {
        Self { lms, html_url }
    }

    fn start_run(&self, report: &str, cancel: &CancellationToken) -> ReportRun {
        let run = ReportRun::new(self.lms.clone(), cancel.clone());
        info!("report run {} started: {}", run.id(), report);
        run
    }

    fn finish_run<T>(&self, run: &ReportRun, rows: &[T]) {
        info!("report run {} finished with {} rows", run.id(), rows.len());
    }

    fn gradebook_url(&self, course_id: u64) -> String {
        format!("{}/courses/{}/gradebook", self.html_url, course_id)
    }
}

fn is_reportable_student(role: &str, state: &str) -> bool {
    role == EnrollmentType::Student.as_str()
        && REPORTABLE_STATES.iter().any(|s| s.as_str() == state)
}
